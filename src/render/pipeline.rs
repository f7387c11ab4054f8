use std::path::Path;

use rayon::prelude::*;

use crate::assets::media::{VideoSourceInfo, decode_video_frames_rgba8, probe_video};
use crate::encode::ffmpeg::{EncodeConfig, FfmpegEncoder};
use crate::foundation::core::{BeatSpec, OverlayStyle, TimedText};
use crate::foundation::error::{StepbeatError, StepbeatResult};
use crate::glyphs::cache::GlyphCache;
use crate::layout::geometry::compute_geometry;
use crate::overlay::composer::{OverlayElement, compose};
use crate::render::composite::composite_frame;
use crate::schedule::beat::StepCycle;
use crate::text::render::TextRenderer;

/// One processing request against a base video.
#[derive(Clone, Debug, PartialEq)]
pub struct OverlayRequest {
    /// Beat grid tempo and phase.
    pub beat: BeatSpec,
    /// Persistent title shown for the whole video, if any.
    pub title: Option<String>,
    /// Timed captions.
    pub captions: Vec<TimedText>,
}

impl OverlayRequest {
    /// Reject malformed parameters before any rendering or decoding work.
    pub fn validate(&self) -> StepbeatResult<()> {
        // BeatSpec values are validated at construction; re-check here so a
        // hand-built request cannot smuggle bad values past the boundary.
        BeatSpec::new(self.beat.bpm, self.beat.offset_sec)?;
        for caption in &self.captions {
            caption.validate()?;
        }
        Ok(())
    }
}

/// Chunking/threading configuration for the composite-and-encode stage.
#[derive(Clone, Debug)]
pub struct CompositeOpts {
    /// Composite frames within a chunk in parallel.
    pub parallel: bool,
    /// Frames decoded and composited per chunk.
    pub chunk_size: usize,
    /// Override rayon worker threads (parallel mode only).
    pub threads: Option<usize>,
    /// Overwrite the output file if it already exists.
    pub overwrite: bool,
}

impl Default for CompositeOpts {
    fn default() -> Self {
        Self {
            parallel: false,
            chunk_size: 64,
            threads: None,
            overwrite: true,
        }
    }
}

/// Composite `elements` onto every frame of `info` and encode the result.
///
/// Frames are decoded in chunks, composited (optionally in parallel; output
/// order is restored before encoding, so the result is identical either way)
/// and streamed to the encoder. The encoder finalizes atomically: `out_path`
/// receives either a complete file or nothing.
#[tracing::instrument(skip(info, elements))]
pub fn composite_and_encode(
    info: &VideoSourceInfo,
    elements: &[OverlayElement],
    out_path: &Path,
    opts: &CompositeOpts,
) -> StepbeatResult<()> {
    let fps = info.source_fps();
    if fps <= 0.0 {
        return Err(StepbeatError::source("source frame rate is zero"));
    }

    let cfg = EncodeConfig {
        width: info.width,
        height: info.height,
        fps_num: info.fps_num,
        fps_den: info.fps_den,
        out_path: out_path.to_path_buf(),
        overwrite: opts.overwrite,
        audio_source: info.has_audio.then(|| info.source_path.clone()),
    };
    let mut encoder = FfmpegEncoder::new(cfg)?;

    let pool = if opts.parallel {
        Some(build_thread_pool(opts.threads)?)
    } else {
        None
    };

    let total_frames = info.frame_count();
    let chunk_size = opts.chunk_size.max(1) as u64;
    let mut frame_idx: u64 = 0;
    while frame_idx < total_frames {
        let want = chunk_size.min(total_frames - frame_idx) as u32;
        let start_time = info.frame_time_sec(frame_idx);
        let mut frames = decode_video_frames_rgba8(info, start_time, want)?;
        if frames.is_empty() {
            // Container duration overestimated the stream; encode what we have.
            break;
        }

        match pool.as_ref() {
            Some(pool) => pool.install(|| {
                frames.par_iter_mut().enumerate().for_each(|(i, frame)| {
                    let t = info.frame_time_sec(frame_idx + i as u64);
                    composite_frame(frame, info.width, info.height, elements, t);
                });
            }),
            None => {
                for (i, frame) in frames.iter_mut().enumerate() {
                    let t = info.frame_time_sec(frame_idx + i as u64);
                    composite_frame(frame, info.width, info.height, elements, t);
                }
            }
        }

        for frame in &frames {
            encoder.push_frame(frame)?;
        }

        let short_read = (frames.len() as u64) < u64::from(want);
        frame_idx += frames.len() as u64;
        if short_read {
            break;
        }
    }

    encoder.finish()
}

/// Run the full pipeline: probe, layout, glyph cache, composition, encode.
///
/// This is the hosting boundary. The caller receives a complete playable
/// output at `output_path` or a structured failure; fatal errors are never
/// retried internally.
#[tracing::instrument(skip(renderer, request, style, opts))]
pub fn process(
    input_path: &Path,
    output_path: &Path,
    request: &OverlayRequest,
    style: &OverlayStyle,
    renderer: &mut dyn TextRenderer,
    opts: &CompositeOpts,
) -> StepbeatResult<()> {
    request.validate()?;

    let info = probe_video(input_path)?;
    let meta = info.video_meta()?;
    let geometry = compute_geometry(&meta)?;
    let cycle = StepCycle::bachata();

    let glyphs = GlyphCache::build(renderer, &cycle, style, &geometry);
    if glyphs.is_empty() {
        tracing::warn!("no counter glyph rendered successfully, output will have no counter");
    }

    let elements = compose(
        renderer,
        &geometry,
        &glyphs,
        &request.beat,
        &cycle,
        request.title.as_deref(),
        &request.captions,
        meta.duration_sec,
        style,
    )?;
    tracing::info!(
        elements = elements.len(),
        width = meta.width,
        height = meta.height,
        duration_sec = meta.duration_sec,
        "overlay composition ready"
    );

    composite_and_encode(&info, &elements, output_path, opts)
}

fn build_thread_pool(threads: Option<usize>) -> StepbeatResult<rayon::ThreadPool> {
    if let Some(n) = threads
        && n == 0
    {
        return Err(StepbeatError::invalid_parameter(
            "composite 'threads' must be >= 1 when set",
        ));
    }

    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(n) = threads {
        builder = builder.num_threads(n);
    }
    builder
        .build()
        .map_err(|e| StepbeatError::encode(format!("failed to build rayon thread pool: {e}")))
}
