use crate::foundation::core::{BeatSpec, OverlayStyle, TimedText};
use crate::foundation::error::StepbeatResult;
use crate::glyphs::cache::GlyphCache;
use crate::layout::geometry::LayoutGeometry;
use crate::schedule::beat::{StepCycle, generate_beat_events};
use crate::text::render::{RenderedText, TextRenderer, TextRequest};

/// Horizontal placement policy of an overlay element.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum XPlacement {
    /// Fixed left edge in pixels.
    Fixed(i64),
    /// Centered within the frame width.
    Centered,
}

/// One positioned, timed visual unit composited onto the base video.
#[derive(Clone, Debug, PartialEq)]
pub struct OverlayElement {
    /// Rendered pixels; glyph elements share the bitmap of their cached asset.
    pub bitmap: RenderedText,
    /// Horizontal placement.
    pub x: XPlacement,
    /// Top edge in pixels; may fall outside the frame and is clipped at blit
    /// time.
    pub y: i64,
    /// Display start in seconds (inclusive).
    pub start_sec: f64,
    /// Visible duration in seconds.
    pub duration_sec: f64,
}

impl OverlayElement {
    /// Whether this element is visible at time `t_sec` (start-inclusive,
    /// end-exclusive).
    pub fn active_at(&self, t_sec: f64) -> bool {
        t_sec >= self.start_sec && t_sec < self.start_sec + self.duration_sec
    }
}

/// Merge the optional title, timed captions and beat glyphs into one ordered
/// overlay list.
///
/// The output order is a correctness invariant: title first, then captions,
/// then beat glyphs. Later elements draw on top of earlier ones at equal
/// time, so the counter is never hidden behind a caption. A failed title or
/// caption render drops that element with a warning and continues; invalid
/// caption spans (`end <= start`) are dropped the same way.
#[allow(clippy::too_many_arguments)]
pub fn compose(
    renderer: &mut dyn TextRenderer,
    geometry: &LayoutGeometry,
    glyphs: &GlyphCache,
    spec: &BeatSpec,
    cycle: &StepCycle,
    title: Option<&str>,
    captions: &[TimedText],
    duration_sec: f64,
    style: &OverlayStyle,
) -> StepbeatResult<Vec<OverlayElement>> {
    // Scheduling can only fail on invalid parameters; fail before any
    // rendering work happens.
    let events = generate_beat_events(spec, cycle, duration_sec)?;

    let mut elements = Vec::new();

    if let Some(title) = title.filter(|t| !t.is_empty()) {
        let request = TextRequest {
            content: title.to_string(),
            font_size_px: geometry.text_font_size as f32,
            color: style.text_color,
            max_width_px: Some(geometry.max_text_width as f32),
            center: true,
            stroke: None,
        };
        match renderer.render(&request) {
            Ok(bitmap) => elements.push(OverlayElement {
                bitmap,
                x: XPlacement::Centered,
                y: geometry.title_y(),
                start_sec: 0.0,
                duration_sec,
            }),
            Err(error) => {
                tracing::warn!(%error, "title render failed, title will be skipped");
            }
        }
    }

    for caption in captions {
        if !caption.is_valid() {
            tracing::warn!(
                content = %caption.content,
                start_sec = caption.start_sec,
                end_sec = caption.end_sec,
                "caption span is empty or inverted, entry dropped"
            );
            continue;
        }
        let request = TextRequest {
            content: caption.content.clone(),
            font_size_px: geometry.overlay_font_size as f32,
            color: style.text_color,
            max_width_px: Some(geometry.max_text_width as f32),
            center: true,
            stroke: None,
        };
        match renderer.render(&request) {
            Ok(bitmap) => {
                let y = geometry.caption_y(caption.position, bitmap.height);
                elements.push(OverlayElement {
                    bitmap,
                    x: XPlacement::Centered,
                    y,
                    start_sec: caption.start_sec,
                    duration_sec: caption.end_sec - caption.start_sec,
                });
            }
            Err(error) => {
                tracing::warn!(content = %caption.content, %error, "caption render failed, entry dropped");
            }
        }
    }

    for event in events {
        let Some(asset) = glyphs.get(event.symbol) else {
            continue;
        };
        elements.push(OverlayElement {
            bitmap: asset.bitmap.clone(),
            x: XPlacement::Centered,
            y: geometry.counter_y(asset.bitmap.height),
            start_sec: event.start_sec,
            duration_sec: event.duration_sec,
        });
    }

    Ok(elements)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::foundation::core::{CaptionPosition, VideoMeta};
    use crate::foundation::error::{StepbeatError, StepbeatResult};
    use crate::layout::geometry::compute_geometry;
    use crate::schedule::beat::StepSymbol;

    struct StubRenderer;

    impl TextRenderer for StubRenderer {
        fn render(&mut self, request: &TextRequest) -> StepbeatResult<RenderedText> {
            let width = (request.content.len() as u32 * 8).max(1);
            let height = request.font_size_px as u32;
            let px = [
                request.color.r,
                request.color.g,
                request.color.b,
                request.color.a,
            ];
            let mut data = Vec::with_capacity((width * height * 4) as usize);
            for _ in 0..width * height {
                data.extend_from_slice(&px);
            }
            Ok(RenderedText {
                width,
                height,
                rgba8_premul: Arc::new(data),
            })
        }
    }

    struct FailingRenderer;

    impl TextRenderer for FailingRenderer {
        fn render(&mut self, _request: &TextRequest) -> StepbeatResult<RenderedText> {
            Err(StepbeatError::asset_render("no font"))
        }
    }

    fn fixtures() -> (LayoutGeometry, BeatSpec, StepCycle) {
        let meta = VideoMeta::new(1000, 800, 4.0).unwrap();
        (
            compute_geometry(&meta).unwrap(),
            BeatSpec::new(120.0, 0.0).unwrap(),
            StepCycle::bachata(),
        )
    }

    fn caption(content: &str, start: f64, end: f64, position: CaptionPosition) -> TimedText {
        TimedText {
            content: content.to_string(),
            start_sec: start,
            end_sec: end,
            position,
        }
    }

    #[test]
    fn output_order_is_title_captions_glyphs() {
        let (geometry, spec, cycle) = fixtures();
        let mut renderer = StubRenderer;
        let glyphs = GlyphCache::build(
            &mut renderer,
            &cycle,
            &crate::OverlayStyle::default(),
            &geometry,
        );
        let captions = vec![
            caption("late", 3.0, 4.0, CaptionPosition::Top),
            caption("early", 0.0, 1.0, CaptionPosition::Bottom),
        ];
        let elements = compose(
            &mut renderer,
            &geometry,
            &glyphs,
            &spec,
            &cycle,
            Some("Basic step"),
            &captions,
            4.0,
            &crate::OverlayStyle::default(),
        )
        .unwrap();

        // 1 title + 2 captions + 8 beats
        assert_eq!(elements.len(), 11);
        // Title spans the whole video from t=0.
        assert_eq!(elements[0].start_sec, 0.0);
        assert_eq!(elements[0].duration_sec, 4.0);
        assert_eq!(elements[0].y, geometry.title_y());
        // Captions keep their input order, even when not sorted by time.
        assert_eq!(elements[1].start_sec, 3.0);
        assert_eq!(elements[2].start_sec, 0.0);
        // Glyph events follow, in schedule order.
        assert_eq!(elements[3].start_sec, 0.0);
        assert!((elements[3].duration_sec - 0.45).abs() < 1e-12);
        assert_eq!(elements[10].start_sec, 3.5);
    }

    #[test]
    fn invalid_caption_spans_produce_no_elements() {
        let (geometry, spec, cycle) = fixtures();
        let mut renderer = StubRenderer;
        let glyphs = GlyphCache::default();
        let captions = vec![
            caption("empty", 2.0, 2.0, CaptionPosition::Center),
            caption("inverted", 3.0, 1.0, CaptionPosition::Center),
        ];
        let elements = compose(
            &mut renderer,
            &geometry,
            &glyphs,
            &spec,
            &cycle,
            None,
            &captions,
            4.0,
            &crate::OverlayStyle::default(),
        )
        .unwrap();
        assert!(elements.is_empty());
    }

    #[test]
    fn missing_glyph_symbols_are_skipped() {
        let (geometry, spec, cycle) = fixtures();
        let mut stub = StubRenderer;
        let glyphs = GlyphCache::build(
            &mut stub,
            &cycle,
            &crate::OverlayStyle::default(),
            &geometry,
        );
        let elements = compose(
            &mut stub,
            &geometry,
            &glyphs,
            &spec,
            &cycle,
            None,
            &[],
            4.0,
            &crate::OverlayStyle::default(),
        )
        .unwrap();
        assert_eq!(elements.len(), 8);
        assert!(elements.iter().all(|e| matches!(e.x, XPlacement::Centered)));

        let empty = GlyphCache::default();
        let none = compose(
            &mut stub,
            &geometry,
            &empty,
            &spec,
            &cycle,
            None,
            &[],
            4.0,
            &crate::OverlayStyle::default(),
        )
        .unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn title_render_failure_degrades_not_fails() {
        let (geometry, spec, cycle) = fixtures();
        let mut renderer = FailingRenderer;
        let glyphs = GlyphCache::default();
        let elements = compose(
            &mut renderer,
            &geometry,
            &glyphs,
            &spec,
            &cycle,
            Some("Basic step"),
            &[caption("hi", 0.0, 1.0, CaptionPosition::Bottom)],
            4.0,
            &crate::OverlayStyle::default(),
        )
        .unwrap();
        assert!(elements.is_empty());
    }

    #[test]
    fn compose_is_deterministic_for_identical_inputs() {
        let (geometry, spec, cycle) = fixtures();
        let mut renderer = StubRenderer;
        let glyphs = GlyphCache::build(
            &mut renderer,
            &cycle,
            &crate::OverlayStyle::default(),
            &geometry,
        );
        let captions = vec![caption("hold", 1.0, 2.5, CaptionPosition::Top)];
        let run = |renderer: &mut StubRenderer| {
            compose(
                renderer,
                &geometry,
                &glyphs,
                &spec,
                &cycle,
                Some("Basic step"),
                &captions,
                4.0,
                &crate::OverlayStyle::default(),
            )
            .unwrap()
        };
        assert_eq!(run(&mut renderer), run(&mut renderer));
    }

    #[test]
    fn active_window_is_end_exclusive() {
        let element = OverlayElement {
            bitmap: RenderedText {
                width: 1,
                height: 1,
                rgba8_premul: Arc::new(vec![0; 4]),
            },
            x: XPlacement::Fixed(0),
            y: 0,
            start_sec: 1.0,
            duration_sec: 0.5,
        };
        assert!(!element.active_at(0.99));
        assert!(element.active_at(1.0));
        assert!(element.active_at(1.49));
        assert!(!element.active_at(1.5));
    }

    #[test]
    fn tap_events_use_the_tap_asset() {
        let (geometry, spec, cycle) = fixtures();
        let mut renderer = StubRenderer;
        let glyphs = GlyphCache::build(
            &mut renderer,
            &cycle,
            &crate::OverlayStyle::default(),
            &geometry,
        );
        let tap_bitmap = glyphs.get(StepSymbol::Tap).unwrap().bitmap.clone();
        let elements = compose(
            &mut renderer,
            &geometry,
            &glyphs,
            &spec,
            &cycle,
            None,
            &[],
            4.0,
            &crate::OverlayStyle::default(),
        )
        .unwrap();
        // Beats 4 and 8 of the cycle carry the tap color; the counts do not.
        assert_eq!(elements[3].bitmap, tap_bitmap);
        assert_eq!(elements[7].bitmap, tap_bitmap);
        assert_ne!(elements[0].bitmap, tap_bitmap);
    }
}
