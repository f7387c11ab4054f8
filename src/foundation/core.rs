use crate::foundation::error::{StepbeatError, StepbeatResult};

/// Dimensions and duration of the base video, as reported by the decoder.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct VideoMeta {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Total duration in seconds.
    pub duration_sec: f64,
}

impl VideoMeta {
    /// Validate and build a [`VideoMeta`] value.
    pub fn new(width: u32, height: u32, duration_sec: f64) -> StepbeatResult<Self> {
        if width == 0 || height == 0 {
            return Err(StepbeatError::invalid_parameter(
                "video width/height must be > 0",
            ));
        }
        if !duration_sec.is_finite() || duration_sec <= 0.0 {
            return Err(StepbeatError::invalid_parameter(
                "video duration must be finite and > 0",
            ));
        }
        Ok(Self {
            width,
            height,
            duration_sec,
        })
    }
}

/// Tempo and phase of the beat grid.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct BeatSpec {
    /// Beats per minute.
    pub bpm: f64,
    /// Time of the first beat, in seconds from the start of the video.
    pub offset_sec: f64,
}

impl BeatSpec {
    /// Validate and build a [`BeatSpec`] value.
    pub fn new(bpm: f64, offset_sec: f64) -> StepbeatResult<Self> {
        if !bpm.is_finite() || bpm <= 0.0 {
            return Err(StepbeatError::invalid_parameter("bpm must be finite and > 0"));
        }
        if !offset_sec.is_finite() || offset_sec < 0.0 {
            return Err(StepbeatError::invalid_parameter(
                "offset must be finite and >= 0",
            ));
        }
        Ok(Self { bpm, offset_sec })
    }

    /// Seconds between consecutive beats (`60 / bpm`).
    pub fn seconds_per_beat(self) -> f64 {
        60.0 / self.bpm
    }
}

/// Vertical band a timed caption is anchored to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptionPosition {
    /// Below the title band, near the top of the frame.
    Top,
    /// Vertically centered in the frame.
    Center,
    /// Above the counter band, near the bottom of the frame.
    #[default]
    Bottom,
}

/// One timed caption supplied with a processing request.
///
/// Entries with `end_sec <= start_sec` are dropped during composition.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TimedText {
    /// Caption text.
    pub content: String,
    /// Display start in seconds (inclusive).
    pub start_sec: f64,
    /// Display end in seconds (exclusive).
    pub end_sec: f64,
    /// Vertical band; defaults to bottom.
    #[serde(default)]
    pub position: CaptionPosition,
}

impl TimedText {
    /// Whether this entry spans a positive time interval.
    pub fn is_valid(&self) -> bool {
        self.end_sec > self.start_sec
    }

    /// Reject entries with non-finite or negative times up front.
    ///
    /// `end <= start` is not an error here; those entries are dropped with a
    /// warning during composition instead.
    pub fn validate(&self) -> StepbeatResult<()> {
        if !self.start_sec.is_finite() || !self.end_sec.is_finite() || self.start_sec < 0.0 {
            return Err(StepbeatError::invalid_parameter(format!(
                "caption '{}' has malformed times (start {}, end {})",
                self.content, self.start_sec, self.end_sec
            )));
        }
        Ok(())
    }
}

/// Straight (non-premultiplied) RGBA8 color used for text brushes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Rgba8 {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
    /// Alpha channel.
    pub a: u8,
}

impl Rgba8 {
    /// Opaque color from RGB components.
    pub const fn opaque(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }
}

/// Injected overlay styling.
///
/// Colors and stroke are configuration, not constants, so hosts can restyle the
/// counter without touching layout or scheduling. The font itself is injected
/// separately as raw bytes when constructing the text renderer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OverlayStyle {
    /// Fill color for numeric count glyphs.
    pub symbol_color: Rgba8,
    /// Fill color for the tap-beat glyph.
    pub tap_color: Rgba8,
    /// Fill color for the title and timed captions.
    pub text_color: Rgba8,
    /// Outline color for counter glyphs.
    pub stroke_color: Rgba8,
    /// Outline width for counter glyphs, in pixels.
    pub stroke_width: f32,
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            symbol_color: Rgba8::opaque(255, 255, 255),
            tap_color: Rgba8::opaque(220, 30, 30),
            text_color: Rgba8::opaque(255, 255, 255),
            stroke_color: Rgba8::opaque(0, 0, 0),
            stroke_width: 2.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn video_meta_rejects_degenerate_values() {
        assert!(VideoMeta::new(0, 720, 10.0).is_err());
        assert!(VideoMeta::new(1280, 0, 10.0).is_err());
        assert!(VideoMeta::new(1280, 720, 0.0).is_err());
        assert!(VideoMeta::new(1280, 720, f64::NAN).is_err());
        assert!(VideoMeta::new(1280, 720, 10.0).is_ok());
    }

    #[test]
    fn beat_spec_rejects_non_positive_bpm() {
        assert!(BeatSpec::new(0.0, 0.0).is_err());
        assert!(BeatSpec::new(-120.0, 0.0).is_err());
        assert!(BeatSpec::new(f64::INFINITY, 0.0).is_err());
        assert!(BeatSpec::new(120.0, -1.0).is_err());
        let spec = BeatSpec::new(120.0, 0.0).unwrap();
        assert!((spec.seconds_per_beat() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn timed_text_position_defaults_to_bottom() {
        let text: TimedText =
            serde_json::from_str(r#"{"content":"hi","start_sec":1.0,"end_sec":2.0}"#).unwrap();
        assert_eq!(text.position, CaptionPosition::Bottom);
        assert!(text.is_valid());
    }

    #[test]
    fn timed_text_validate_rejects_malformed_times() {
        let bad = TimedText {
            content: "x".to_string(),
            start_sec: f64::NAN,
            end_sec: 2.0,
            position: CaptionPosition::Bottom,
        };
        assert!(bad.validate().is_err());

        let inverted = TimedText {
            content: "x".to_string(),
            start_sec: 3.0,
            end_sec: 2.0,
            position: CaptionPosition::Bottom,
        };
        // Inverted spans are dropped later, not rejected.
        assert!(inverted.validate().is_ok());
        assert!(!inverted.is_valid());
    }
}
