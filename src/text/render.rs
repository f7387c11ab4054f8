use std::sync::Arc;

use crate::foundation::core::Rgba8;
use crate::foundation::error::{StepbeatError, StepbeatResult};

/// Outline drawn behind the text fill for legibility against arbitrary video
/// backgrounds.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TextStroke {
    /// Outline color.
    pub color: Rgba8,
    /// Outline width in pixels.
    pub width_px: f32,
}

/// One text rasterization request.
#[derive(Clone, Debug, PartialEq)]
pub struct TextRequest {
    /// Text content.
    pub content: String,
    /// Font size in pixels.
    pub font_size_px: f32,
    /// Fill color.
    pub color: Rgba8,
    /// Wrap boundary; `None` lays the text out on a single line.
    pub max_width_px: Option<f32>,
    /// Center lines within the wrap boundary.
    pub center: bool,
    /// Optional outline.
    pub stroke: Option<TextStroke>,
}

/// A rasterized text block in premultiplied RGBA8 form.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderedText {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Pixel bytes in row-major premultiplied RGBA8.
    pub rgba8_premul: Arc<Vec<u8>>,
}

/// Rasterizes a [`TextRequest`] into a [`RenderedText`] bitmap.
///
/// The compositor only depends on this trait, so tests can substitute a
/// deterministic stub and the CPU implementation stays swappable.
pub trait TextRenderer {
    /// Render one text block. Failures are [`StepbeatError::AssetRender`].
    fn render(&mut self, request: &TextRequest) -> StepbeatResult<RenderedText>;
}

/// CPU text rasterizer: Parley shaping/line breaking, `vello_cpu` glyph
/// rendering.
///
/// The font is injected as raw bytes at construction time; there is no
/// platform font path anywhere in the crate.
pub struct CpuTextRenderer {
    font_ctx: parley::FontContext,
    layout_ctx: parley::LayoutContext<Rgba8>,
    font: vello_cpu::peniko::FontData,
    family_name: String,
}

impl std::fmt::Debug for CpuTextRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CpuTextRenderer")
            .field("family_name", &self.family_name)
            .finish()
    }
}

impl CpuTextRenderer {
    /// Build a renderer from raw TTF/OTF font bytes.
    pub fn from_font_bytes(font_bytes: Vec<u8>) -> StepbeatResult<Self> {
        let mut font_ctx = parley::FontContext::default();
        let families = font_ctx
            .collection
            .register_fonts(parley::fontique::Blob::from(font_bytes.clone()), None);
        let family_id = families.first().map(|(id, _)| *id).ok_or_else(|| {
            StepbeatError::asset_render("no font families registered from font bytes")
        })?;
        let family_name = font_ctx
            .collection
            .family_name(family_id)
            .ok_or_else(|| StepbeatError::asset_render("registered font family has no name"))?
            .to_string();

        let font =
            vello_cpu::peniko::FontData::new(vello_cpu::peniko::Blob::from(font_bytes), 0);
        Ok(Self {
            font_ctx,
            layout_ctx: parley::LayoutContext::new(),
            font,
            family_name,
        })
    }

    /// Build a renderer from a font file on disk.
    pub fn from_font_path(path: impl AsRef<std::path::Path>) -> StepbeatResult<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| {
            StepbeatError::asset_render(format!(
                "failed to read font '{}': {e}",
                path.display()
            ))
        })?;
        Self::from_font_bytes(bytes)
    }

    /// Primary family name detected in the injected font data.
    pub fn family_name(&self) -> &str {
        &self.family_name
    }

    fn layout_for(&mut self, request: &TextRequest) -> parley::Layout<Rgba8> {
        let mut builder =
            self.layout_ctx
                .ranged_builder(&mut self.font_ctx, &request.content, 1.0, true);
        builder.push_default(parley::style::StyleProperty::FontStack(
            parley::style::FontStack::Source(std::borrow::Cow::Owned(self.family_name.clone())),
        ));
        builder.push_default(parley::style::StyleProperty::FontSize(request.font_size_px));
        builder.push_default(parley::style::StyleProperty::Brush(request.color));

        let mut layout: parley::Layout<Rgba8> = builder.build(&request.content);
        if let Some(w) = request.max_width_px {
            let alignment = if request.center {
                parley::Alignment::Center
            } else {
                parley::Alignment::Start
            };
            layout.break_all_lines(Some(w));
            layout.align(Some(w), alignment, parley::AlignmentOptions::default());
        } else {
            layout.break_all_lines(None);
        }
        layout
    }
}

impl TextRenderer for CpuTextRenderer {
    fn render(&mut self, request: &TextRequest) -> StepbeatResult<RenderedText> {
        if !request.font_size_px.is_finite() || request.font_size_px <= 0.0 {
            return Err(StepbeatError::invalid_parameter(
                "text font size must be finite and > 0",
            ));
        }
        if request.content.is_empty() {
            return Err(StepbeatError::asset_render("text content is empty"));
        }

        let layout = self.layout_for(request);

        // Measure from line metrics. A wrapped request occupies its full wrap
        // box: alignment distributes lines within the container width, so the
        // canvas must span it.
        let mut max_advance = 0.0f64;
        let mut text_height = 0.0f64;
        for line in layout.lines() {
            let m = line.metrics();
            max_advance = max_advance.max(f64::from(m.advance));
            text_height += f64::from(m.ascent + m.descent + m.leading);
        }
        let text_width = match request.max_width_px {
            Some(w) => f64::from(w),
            None => max_advance,
        };

        // Pad the canvas so an outline is not clipped at the glyph bounds.
        let pad = request
            .stroke
            .map(|s| s.width_px.max(0.0).ceil() as u32)
            .unwrap_or(0);
        let width = (text_width.ceil() as u32).max(1) + pad * 2;
        let height = (text_height.ceil() as u32).max(1) + pad * 2;

        let pm_width: u16 = width
            .try_into()
            .map_err(|_| StepbeatError::asset_render("rendered text width exceeds u16"))?;
        let pm_height: u16 = height
            .try_into()
            .map_err(|_| StepbeatError::asset_render("rendered text height exceeds u16"))?;

        let mut ctx = vello_cpu::RenderContext::new(pm_width, pm_height);
        ctx.set_transform(vello_cpu::kurbo::Affine::translate((
            f64::from(pad),
            f64::from(pad),
        )));

        for line in layout.lines() {
            for item in line.items() {
                let parley::layout::PositionedLayoutItem::GlyphRun(run) = item else {
                    continue;
                };
                let glyphs: Vec<vello_cpu::Glyph> = run
                    .glyphs()
                    .map(|g| vello_cpu::Glyph {
                        id: g.id,
                        x: g.x,
                        y: g.y,
                    })
                    .collect();

                if let Some(stroke) = request.stroke {
                    ctx.set_stroke(vello_cpu::kurbo::Stroke::new(f64::from(
                        stroke.width_px.max(0.0),
                    )));
                    ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(
                        stroke.color.r,
                        stroke.color.g,
                        stroke.color.b,
                        stroke.color.a,
                    ));
                    ctx.glyph_run(&self.font)
                        .font_size(run.run().font_size())
                        .stroke_glyphs(glyphs.iter().copied());
                }

                let brush = run.style().brush;
                ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(
                    brush.r, brush.g, brush.b, brush.a,
                ));
                ctx.glyph_run(&self.font)
                    .font_size(run.run().font_size())
                    .fill_glyphs(glyphs.into_iter());
            }
        }

        ctx.flush();
        let mut pixmap = vello_cpu::Pixmap::new(pm_width, pm_height);
        ctx.render_to_pixmap(&mut pixmap);

        Ok(RenderedText {
            width,
            height,
            rgba8_premul: Arc::new(pixmap.data_as_u8_slice().to_vec()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedSizeRenderer;

    impl TextRenderer for FixedSizeRenderer {
        fn render(&mut self, request: &TextRequest) -> StepbeatResult<RenderedText> {
            let width = request.content.len() as u32 * 10;
            let height = request.font_size_px as u32;
            Ok(RenderedText {
                width,
                height,
                rgba8_premul: Arc::new(vec![0u8; (width * height * 4) as usize]),
            })
        }
    }

    #[test]
    fn trait_object_renderers_are_usable() {
        let mut renderer: Box<dyn TextRenderer> = Box::new(FixedSizeRenderer);
        let out = renderer
            .render(&TextRequest {
                content: "123".to_string(),
                font_size_px: 40.0,
                color: Rgba8::opaque(255, 255, 255),
                max_width_px: None,
                center: false,
                stroke: None,
            })
            .unwrap();
        assert_eq!((out.width, out.height), (30, 40));
        assert_eq!(out.rgba8_premul.len(), (30 * 40 * 4) as usize);
    }
}
