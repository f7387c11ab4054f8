use std::path::{Path, PathBuf};

use crate::foundation::core::VideoMeta;
use crate::foundation::error::{StepbeatError, StepbeatResult};

/// Probed metadata of a base video file.
#[derive(Clone, Debug, serde::Serialize)]
pub struct VideoSourceInfo {
    /// Path the metadata was probed from.
    pub source_path: PathBuf,
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Frame rate numerator.
    pub fps_num: u32,
    /// Frame rate denominator.
    pub fps_den: u32,
    /// Container duration in seconds.
    pub duration_sec: f64,
    /// Whether the container carries an audio stream.
    pub has_audio: bool,
}

impl VideoSourceInfo {
    /// Frame rate as a float; 0.0 when the denominator is 0.
    pub fn source_fps(&self) -> f64 {
        if self.fps_den == 0 {
            0.0
        } else {
            f64::from(self.fps_num) / f64::from(self.fps_den)
        }
    }

    /// Wall-clock time of a 0-based frame index.
    pub fn frame_time_sec(&self, frame_index: u64) -> f64 {
        (frame_index as f64) * f64::from(self.fps_den) / f64::from(self.fps_num)
    }

    /// Number of frames spanned by the container duration.
    pub fn frame_count(&self) -> u64 {
        ((self.duration_sec * self.source_fps()).round() as u64).max(1)
    }

    /// The validated subset of metadata the layout/scheduling core consumes.
    pub fn video_meta(&self) -> StepbeatResult<VideoMeta> {
        VideoMeta::new(self.width, self.height, self.duration_sec)
            .map_err(|e| StepbeatError::source(format!("unusable video metadata: {e}")))
    }
}

/// Probe a video file with the system `ffprobe` binary.
///
/// A missing or unreadable input surfaces as [`StepbeatError::Source`]; no
/// processing work happens after a probe failure.
pub fn probe_video(source_path: &Path) -> StepbeatResult<VideoSourceInfo> {
    #[derive(serde::Deserialize)]
    struct ProbeStream {
        codec_type: Option<String>,
        width: Option<u32>,
        height: Option<u32>,
        r_frame_rate: Option<String>,
    }
    #[derive(serde::Deserialize)]
    struct ProbeFormat {
        duration: Option<String>,
    }
    #[derive(serde::Deserialize)]
    struct ProbeOut {
        streams: Vec<ProbeStream>,
        format: Option<ProbeFormat>,
    }

    let out = std::process::Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-print_format",
            "json",
            "-show_streams",
            "-show_format",
        ])
        .arg(source_path)
        .output()
        .map_err(|e| StepbeatError::source(format!("failed to run ffprobe: {e}")))?;
    if !out.status.success() {
        return Err(StepbeatError::source(format!(
            "ffprobe failed for '{}': {}",
            source_path.display(),
            String::from_utf8_lossy(&out.stderr).trim()
        )));
    }

    let parsed: ProbeOut = serde_json::from_slice(&out.stdout)
        .map_err(|e| StepbeatError::source(format!("ffprobe json parse failed: {e}")))?;
    let video_stream = parsed
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .ok_or_else(|| StepbeatError::source("no video stream found"))?;
    let width = video_stream
        .width
        .ok_or_else(|| StepbeatError::source("missing video width from ffprobe"))?;
    let height = video_stream
        .height
        .ok_or_else(|| StepbeatError::source("missing video height from ffprobe"))?;

    let (fps_num, fps_den) = parse_ff_ratio(video_stream.r_frame_rate.as_deref().unwrap_or("0/1"))
        .ok_or_else(|| StepbeatError::source("invalid video r_frame_rate"))?;
    let duration_sec = parsed
        .format
        .as_ref()
        .and_then(|f| f.duration.as_ref())
        .and_then(|s| s.parse::<f64>().ok())
        .unwrap_or(0.0);
    let has_audio = parsed
        .streams
        .iter()
        .any(|s| s.codec_type.as_deref() == Some("audio"));

    Ok(VideoSourceInfo {
        source_path: source_path.to_path_buf(),
        width,
        height,
        fps_num,
        fps_den,
        duration_sec,
        has_audio,
    })
}

/// Decode a batch of raw RGBA8 frames starting at `start_time_sec`.
///
/// Returns at most `frame_count` frames; fewer when the source ends inside the
/// batch. Frames are straight RGBA with opaque alpha.
pub fn decode_video_frames_rgba8(
    source: &VideoSourceInfo,
    start_time_sec: f64,
    frame_count: u32,
) -> StepbeatResult<Vec<Vec<u8>>> {
    if frame_count == 0 {
        return Ok(Vec::new());
    }

    let out = std::process::Command::new("ffmpeg")
        .args(["-v", "error", "-ss", &format!("{start_time_sec:.9}")])
        .arg("-i")
        .arg(&source.source_path)
        .args([
            "-frames:v",
            &frame_count.to_string(),
            "-f",
            "rawvideo",
            "-pix_fmt",
            "rgba",
            "pipe:1",
        ])
        .output()
        .map_err(|e| StepbeatError::source(format!("failed to run ffmpeg for video decode: {e}")))?;

    if !out.status.success() {
        return Err(StepbeatError::source(format!(
            "ffmpeg video decode batch failed for '{}': {}",
            source.source_path.display(),
            String::from_utf8_lossy(&out.stderr).trim()
        )));
    }

    let expected_len = source.width as usize * source.height as usize * 4;
    if expected_len == 0 {
        return Err(StepbeatError::source(
            "decoded video frame size is zero (invalid source dimensions)",
        ));
    }
    if out.stdout.len() < expected_len || !out.stdout.len().is_multiple_of(expected_len) {
        return Err(StepbeatError::source(format!(
            "decoded video batch has invalid size: got {} bytes, expected multiples of {expected_len}",
            out.stdout.len()
        )));
    }

    let available = (out.stdout.len() / expected_len).min(frame_count as usize);
    let mut frames = Vec::with_capacity(available);
    for idx in 0..available {
        let off = idx * expected_len;
        frames.push(out.stdout[off..off + expected_len].to_vec());
    }
    Ok(frames)
}

fn parse_ff_ratio(s: &str) -> Option<(u32, u32)> {
    let mut parts = s.split('/');
    let a = parts.next()?.parse::<u32>().ok()?;
    let b = parts.next()?.parse::<u32>().ok()?;
    if b == 0 {
        return None;
    }
    Some((a, b))
}
