//! Stepbeat overlays a beat-synchronized dance-step counter and timed captions
//! onto a video, producing a new encoded file.
//!
//! # Pipeline overview
//!
//! 1. **Probe**: `ffprobe` reads the base video's dimensions, frame rate and duration
//! 2. **Layout**: [`compute_geometry`] derives margins, font sizes and band positions
//!    from the video resolution
//! 3. **Glyphs**: [`GlyphCache`] renders one asset per distinct counter symbol
//! 4. **Schedule**: [`generate_beat_events`] maps the beat grid onto video time
//! 5. **Compose**: [`compose`] binds geometry, glyph assets, the optional title and
//!    timed captions into one ordered list of positioned overlay elements
//! 6. **Encode**: decoded base frames are composited and streamed to the system
//!    `ffmpeg` binary for MP4 output
//!
//! The key design constraints:
//!
//! - **No unsafe**: `unsafe` is forbidden in this crate.
//! - **Deterministic-by-default**: scheduling, layout and composition are pure and
//!   stable for a given input; identical requests produce identical element lists.
//! - **Request isolation**: glyph assets, geometry and the beat timeline are scoped
//!   to one request and never shared across requests.
//! - **Graceful degradation**: a single failed glyph or caption render drops that
//!   element and continues; source and encode failures are fatal and never leave a
//!   partial file at the output path.
#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![allow(missing_docs_in_private_items)]

mod assets;
mod encode;
mod foundation;
mod glyphs;
mod layout;
mod overlay;
mod render;
mod schedule;
mod text;

pub use assets::media::{VideoSourceInfo, decode_video_frames_rgba8, probe_video};
pub use encode::ffmpeg::{EncodeConfig, FfmpegEncoder, ensure_parent_dir, is_ffmpeg_on_path};
pub use foundation::core::{BeatSpec, CaptionPosition, OverlayStyle, Rgba8, TimedText, VideoMeta};
pub use foundation::error::{StepbeatError, StepbeatResult};
pub use glyphs::cache::{GlyphAsset, GlyphCache};
pub use layout::geometry::{LayoutGeometry, compute_geometry};
pub use overlay::composer::{OverlayElement, XPlacement, compose};
pub use render::composite::{PremulRgba8, blit_over, composite_frame, over, resolve_x};
pub use render::pipeline::{CompositeOpts, OverlayRequest, composite_and_encode, process};
pub use schedule::beat::{
    BEAT_VISIBLE_FRACTION, BeatEvent, StepCycle, StepSymbol, generate_beat_events,
};
pub use text::render::{CpuTextRenderer, RenderedText, TextRenderer, TextRequest, TextStroke};
