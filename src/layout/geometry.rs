use crate::foundation::core::{CaptionPosition, VideoMeta};
use crate::foundation::error::{StepbeatError, StepbeatResult};

/// Pixel geometry derived from the video resolution.
///
/// All measurements use truncating conversions, so they scale linearly with
/// the frame dimensions. The geometry is provisional with respect to the
/// counter band: the final counter y position depends on the rendered glyph
/// height and is resolved through [`LayoutGeometry::counter_y`] after the
/// glyph cache has been built.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LayoutGeometry {
    /// Frame width in pixels.
    pub frame_width: u32,
    /// Frame height in pixels.
    pub frame_height: u32,
    /// Outer margin: 5% of the frame height.
    pub margin: u32,
    /// Font size for counter glyphs: 1/8th of the frame width.
    pub counter_font_size: u32,
    /// Font size for the title: 1/15th of the frame width.
    pub text_font_size: u32,
    /// Font size for timed captions: 1/20th of the frame width.
    pub overlay_font_size: u32,
    /// Wrap boundary for title and captions: 90% of the frame width.
    pub max_text_width: u32,
}

/// Derive [`LayoutGeometry`] from video metadata. Pure, no I/O.
pub fn compute_geometry(meta: &VideoMeta) -> StepbeatResult<LayoutGeometry> {
    let geometry = LayoutGeometry {
        frame_width: meta.width,
        frame_height: meta.height,
        margin: (f64::from(meta.height) * 0.05) as u32,
        counter_font_size: meta.width / 8,
        text_font_size: meta.width / 15,
        overlay_font_size: meta.width / 20,
        max_text_width: (f64::from(meta.width) * 0.9) as u32,
    };
    if geometry.counter_font_size == 0
        || geometry.text_font_size == 0
        || geometry.overlay_font_size == 0
    {
        return Err(StepbeatError::invalid_parameter(format!(
            "video dimensions {}x{} are too small for text layout",
            meta.width, meta.height
        )));
    }
    Ok(geometry)
}

impl LayoutGeometry {
    /// Top edge of the title band.
    pub fn title_y(&self) -> i64 {
        i64::from(self.margin)
    }

    /// Top edge of the counter band for a glyph of the given rendered height.
    ///
    /// This is the refinement step of the two-phase layout: the provisional
    /// geometry knows only an estimate of the counter height, the exact
    /// position is resolved per glyph asset.
    pub fn counter_y(&self, glyph_height: u32) -> i64 {
        i64::from(self.frame_height) - i64::from(self.margin) - i64::from(glyph_height)
    }

    /// Conservative counter-height estimate used by the bottom caption band.
    ///
    /// Uses `width / 8` (the counter font size) instead of the true rendered
    /// glyph height to avoid a circular dependency on the glyph cache. Exact
    /// caption/counter non-overlap is therefore not guaranteed at extreme
    /// aspect ratios.
    pub fn approx_counter_height(&self) -> u32 {
        self.frame_width / 8
    }

    /// Top edge of a caption of the given rendered height at `position`.
    pub fn caption_y(&self, position: CaptionPosition, caption_height: u32) -> i64 {
        let height = i64::from(self.frame_height);
        let caption_height = i64::from(caption_height);
        match position {
            // Pushed below the title band to reduce collision.
            CaptionPosition::Top => (f64::from(self.margin) * 2.5) as i64,
            CaptionPosition::Center => (height - caption_height) / 2,
            CaptionPosition::Bottom => {
                let reserved = i64::from(self.margin)
                    + i64::from(self.approx_counter_height())
                    + (f64::from(self.frame_height) * 0.05) as i64;
                height - reserved - caption_height
            }
        }
    }
}
