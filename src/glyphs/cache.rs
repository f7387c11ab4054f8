use std::collections::HashMap;

use crate::foundation::core::OverlayStyle;
use crate::layout::geometry::LayoutGeometry;
use crate::schedule::beat::{StepCycle, StepSymbol};
use crate::text::render::{RenderedText, TextRenderer, TextRequest, TextStroke};

/// One rendered counter symbol.
#[derive(Clone, Debug, PartialEq)]
pub struct GlyphAsset {
    /// The symbol this asset renders.
    pub symbol: StepSymbol,
    /// Rendered bitmap; the premultiplied pixels are shared across every beat
    /// event that reuses this symbol.
    pub bitmap: RenderedText,
}

/// Per-request cache of rendered counter glyphs.
///
/// Built once per processing request (glyph size depends on that request's
/// video resolution) and never invalidated mid-request. A symbol whose render
/// fails is logged and absent from the cache; beats carrying it simply produce
/// no visual event.
#[derive(Clone, Debug, Default)]
pub struct GlyphCache {
    by_symbol: HashMap<StepSymbol, GlyphAsset>,
}

impl GlyphCache {
    /// Render one asset per distinct symbol in `cycle`.
    ///
    /// Individual render failures do not abort the batch.
    pub fn build(
        renderer: &mut dyn TextRenderer,
        cycle: &StepCycle,
        style: &OverlayStyle,
        geometry: &LayoutGeometry,
    ) -> Self {
        let mut by_symbol = HashMap::new();
        for symbol in cycle.distinct_symbols() {
            let color = if symbol.is_tap() {
                style.tap_color
            } else {
                style.symbol_color
            };
            let request = TextRequest {
                content: symbol.to_string(),
                font_size_px: geometry.counter_font_size as f32,
                color,
                max_width_px: None,
                center: false,
                stroke: Some(TextStroke {
                    color: style.stroke_color,
                    width_px: style.stroke_width,
                }),
            };
            match renderer.render(&request) {
                Ok(bitmap) => {
                    by_symbol.insert(symbol, GlyphAsset { symbol, bitmap });
                }
                Err(error) => {
                    tracing::warn!(symbol = %symbol, %error, "glyph render failed, symbol will be skipped");
                }
            }
        }
        Self { by_symbol }
    }

    /// Lookup the rendered asset for a symbol, if it rendered successfully.
    pub fn get(&self, symbol: StepSymbol) -> Option<&GlyphAsset> {
        self.by_symbol.get(&symbol)
    }

    /// Number of successfully rendered symbols.
    pub fn len(&self) -> usize {
        self.by_symbol.len()
    }

    /// Whether no symbol rendered successfully.
    pub fn is_empty(&self) -> bool {
        self.by_symbol.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::foundation::core::VideoMeta;
    use crate::foundation::error::{StepbeatError, StepbeatResult};
    use crate::layout::geometry::compute_geometry;

    /// Deterministic stub: bitmap size derives from content length, `T` fails
    /// when `fail_tap` is set.
    struct StubRenderer {
        fail_tap: bool,
        requests: Vec<TextRequest>,
    }

    impl TextRenderer for StubRenderer {
        fn render(&mut self, request: &TextRequest) -> StepbeatResult<RenderedText> {
            self.requests.push(request.clone());
            if self.fail_tap && request.content == "T" {
                return Err(StepbeatError::asset_render("missing glyph"));
            }
            let width = request.content.len() as u32 * 8;
            let height = request.font_size_px as u32;
            Ok(RenderedText {
                width,
                height,
                rgba8_premul: Arc::new(vec![0u8; (width * height * 4) as usize]),
            })
        }
    }

    fn geometry() -> LayoutGeometry {
        compute_geometry(&VideoMeta::new(1000, 800, 10.0).unwrap()).unwrap()
    }

    #[test]
    fn builds_one_asset_per_distinct_symbol() {
        let mut renderer = StubRenderer {
            fail_tap: false,
            requests: Vec::new(),
        };
        let cache = GlyphCache::build(
            &mut renderer,
            &StepCycle::bachata(),
            &OverlayStyle::default(),
            &geometry(),
        );
        // 1,2,3,5,6,7 + T: the tap repeats in the cycle but renders once.
        assert_eq!(cache.len(), 7);
        assert_eq!(renderer.requests.len(), 7);
        assert!(cache.get(StepSymbol::Tap).is_some());
    }

    #[test]
    fn tap_glyph_uses_tap_color_and_stroke() {
        let mut renderer = StubRenderer {
            fail_tap: false,
            requests: Vec::new(),
        };
        let style = OverlayStyle::default();
        GlyphCache::build(&mut renderer, &StepCycle::bachata(), &style, &geometry());
        let tap_request = renderer
            .requests
            .iter()
            .find(|r| r.content == "T")
            .unwrap();
        assert_eq!(tap_request.color, style.tap_color);
        assert_eq!(
            tap_request.stroke,
            Some(TextStroke {
                color: style.stroke_color,
                width_px: style.stroke_width,
            })
        );
        let count_request = renderer
            .requests
            .iter()
            .find(|r| r.content == "1")
            .unwrap();
        assert_eq!(count_request.color, style.symbol_color);
        assert_eq!(count_request.font_size_px, 125.0);
    }

    #[test]
    fn one_failed_symbol_does_not_abort_the_batch() {
        let mut renderer = StubRenderer {
            fail_tap: true,
            requests: Vec::new(),
        };
        let cache = GlyphCache::build(
            &mut renderer,
            &StepCycle::bachata(),
            &OverlayStyle::default(),
            &geometry(),
        );
        assert_eq!(cache.len(), 6);
        assert!(cache.get(StepSymbol::Tap).is_none());
        assert!(cache.get(StepSymbol::Count(1)).is_some());
    }
}
