use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};

use crate::foundation::error::{StepbeatError, StepbeatResult};

/// Configuration for [`FfmpegEncoder`] MP4 output.
#[derive(Clone, Debug)]
pub struct EncodeConfig {
    /// Frame width in pixels; must be even for yuv420p output.
    pub width: u32,
    /// Frame height in pixels; must be even for yuv420p output.
    pub height: u32,
    /// Frame rate numerator.
    pub fps_num: u32,
    /// Frame rate denominator.
    pub fps_den: u32,
    /// Final output MP4 path.
    pub out_path: PathBuf,
    /// Overwrite the output file if it already exists.
    pub overwrite: bool,
    /// Container whose audio stream is mapped into the output, if any.
    pub audio_source: Option<PathBuf>,
}

impl EncodeConfig {
    fn validate(&self) -> StepbeatResult<()> {
        if self.fps_num == 0 || self.fps_den == 0 {
            return Err(StepbeatError::invalid_parameter("fps must be non-zero"));
        }
        if self.width == 0 || self.height == 0 {
            return Err(StepbeatError::invalid_parameter(
                "encoder width/height must be non-zero",
            ));
        }
        if !self.width.is_multiple_of(2) || !self.height.is_multiple_of(2) {
            return Err(StepbeatError::invalid_parameter(
                "encoder width/height must be even (required for yuv420p mp4 output)",
            ));
        }
        Ok(())
    }
}

/// Streams raw RGBA8 frames to the system `ffmpeg` binary.
///
/// The encoder writes to a temporary sibling of the output path and only
/// renames it into place in [`FfmpegEncoder::finish`]. A failed or abandoned
/// encode never leaves a partial file at the final path.
pub struct FfmpegEncoder {
    cfg: EncodeConfig,
    tmp_path: PathBuf,
    child: Option<Child>,
    stdin: Option<ChildStdin>,
    stderr_drain: Option<std::thread::JoinHandle<std::io::Result<Vec<u8>>>>,
    frame_len: usize,
    finalized: bool,
}

impl FfmpegEncoder {
    /// Validate `cfg`, spawn `ffmpeg` and open the frame stream.
    pub fn new(cfg: EncodeConfig) -> StepbeatResult<Self> {
        cfg.validate()?;
        ensure_parent_dir(&cfg.out_path)?;
        if !cfg.overwrite && cfg.out_path.exists() {
            return Err(StepbeatError::invalid_parameter(format!(
                "output file '{}' already exists",
                cfg.out_path.display()
            )));
        }
        if !is_ffmpeg_on_path() {
            return Err(StepbeatError::encode(
                "ffmpeg is required for MP4 encoding, but was not found on PATH",
            ));
        }

        let tmp_path = temp_sibling_path(&cfg.out_path);

        let mut cmd = Command::new("ffmpeg");
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());
        cmd.arg("-y");

        // Input 0: raw RGBA8 frames on stdin at the source frame rate.
        cmd.args([
            "-loglevel",
            "error",
            "-f",
            "rawvideo",
            "-pix_fmt",
            "rgba",
            "-s",
            &format!("{}x{}", cfg.width, cfg.height),
            "-r",
            &format!("{}/{}", cfg.fps_num, cfg.fps_den),
            "-i",
            "pipe:0",
        ]);

        if let Some(audio_source) = cfg.audio_source.as_ref() {
            // Input 1: audio mapped through from the base video container.
            cmd.arg("-i").arg(audio_source).args([
                "-map",
                "0:v:0",
                "-map",
                "1:a:0",
                "-c:v",
                "libx264",
                "-pix_fmt",
                "yuv420p",
                "-c:a",
                "aac",
                "-shortest",
                "-movflags",
                "+faststart",
            ]);
        } else {
            cmd.args([
                "-an",
                "-c:v",
                "libx264",
                "-pix_fmt",
                "yuv420p",
                "-movflags",
                "+faststart",
            ]);
        }
        cmd.args(["-f", "mp4"]).arg(&tmp_path);

        let mut child = cmd.spawn().map_err(|e| {
            StepbeatError::encode(format!(
                "failed to spawn ffmpeg (is it installed and on PATH?): {e}"
            ))
        })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| StepbeatError::encode("failed to open ffmpeg stdin (unexpected)"))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| StepbeatError::encode("failed to open ffmpeg stderr (unexpected)"))?;
        let stderr_drain = std::thread::spawn(move || {
            let mut stderr_bytes = Vec::new();
            stderr.read_to_end(&mut stderr_bytes)?;
            Ok(stderr_bytes)
        });

        let frame_len = (cfg.width as usize) * (cfg.height as usize) * 4;
        Ok(Self {
            cfg,
            tmp_path,
            child: Some(child),
            stdin: Some(stdin),
            stderr_drain: Some(stderr_drain),
            frame_len,
            finalized: false,
        })
    }

    /// Stream one straight-RGBA8 frame to the encoder.
    pub fn push_frame(&mut self, frame_rgba8: &[u8]) -> StepbeatResult<()> {
        if frame_rgba8.len() != self.frame_len {
            return Err(StepbeatError::invalid_parameter(format!(
                "frame size mismatch: got {} bytes, expected {} ({}x{}x4)",
                frame_rgba8.len(),
                self.frame_len,
                self.cfg.width,
                self.cfg.height
            )));
        }
        let Some(stdin) = self.stdin.as_mut() else {
            return Err(StepbeatError::encode("ffmpeg encoder is already finalized"));
        };

        use std::io::Write as _;
        stdin.write_all(frame_rgba8).map_err(|e| {
            StepbeatError::encode(format!("failed to write frame to ffmpeg stdin: {e}"))
        })?;
        Ok(())
    }

    /// Close the stream, wait for `ffmpeg`, and atomically move the finished
    /// file to the final output path.
    pub fn finish(mut self) -> StepbeatResult<()> {
        drop(self.stdin.take());
        let mut child = self
            .child
            .take()
            .ok_or_else(|| StepbeatError::encode("ffmpeg encoder not started"))?;

        let status = child
            .wait()
            .map_err(|e| StepbeatError::encode(format!("failed to wait for ffmpeg: {e}")))?;
        let stderr_bytes = match self.stderr_drain.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| StepbeatError::encode("ffmpeg stderr drain thread panicked"))?
                .map_err(|e| StepbeatError::encode(format!("ffmpeg stderr read failed: {e}")))?,
            None => Vec::new(),
        };

        if !status.success() {
            let stderr = String::from_utf8_lossy(&stderr_bytes);
            return Err(StepbeatError::encode(format!(
                "ffmpeg exited with status {}: {}",
                status,
                stderr.trim()
            )));
        }

        std::fs::rename(&self.tmp_path, &self.cfg.out_path).map_err(|e| {
            StepbeatError::encode(format!(
                "failed to move '{}' to '{}': {e}",
                self.tmp_path.display(),
                self.cfg.out_path.display()
            ))
        })?;
        self.finalized = true;
        Ok(())
    }
}

impl Drop for FfmpegEncoder {
    fn drop(&mut self) {
        // Abandoned encode: stop the child and remove the temp file so the
        // final path never receives a truncated video.
        drop(self.stdin.take());
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
        if !self.finalized {
            let _ = std::fs::remove_file(&self.tmp_path);
        }
    }
}

/// Derive the temporary encode path next to the final output.
fn temp_sibling_path(out_path: &Path) -> PathBuf {
    let file_name = out_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "out.mp4".to_string());
    out_path.with_file_name(format!(".{}.{}.part", file_name, std::process::id()))
}

/// Ensure the parent directory of `path` exists.
pub fn ensure_parent_dir(path: &Path) -> StepbeatResult<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        use anyhow::Context as _;
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
    }
    Ok(())
}

/// Return `true` when `ffmpeg` can be invoked from `PATH`.
pub fn is_ffmpeg_on_path() -> bool {
    std::process::Command::new("ffmpeg")
        .arg("-version")
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(width: u32, height: u32, fps_num: u32, fps_den: u32) -> EncodeConfig {
        EncodeConfig {
            width,
            height,
            fps_num,
            fps_den,
            out_path: PathBuf::from("out/final.mp4"),
            overwrite: true,
            audio_source: None,
        }
    }

    #[test]
    fn odd_dimensions_are_rejected() {
        assert!(cfg(1279, 720, 30, 1).validate().is_err());
        assert!(cfg(1280, 719, 30, 1).validate().is_err());
        assert!(cfg(1280, 720, 30, 1).validate().is_ok());
    }

    #[test]
    fn zero_fps_is_rejected() {
        assert!(cfg(1280, 720, 0, 1).validate().is_err());
        assert!(cfg(1280, 720, 30, 0).validate().is_err());
    }

    #[test]
    fn temp_path_is_a_hidden_sibling() {
        let tmp = temp_sibling_path(Path::new("out/final.mp4"));
        assert_eq!(tmp.parent(), Some(Path::new("out")));
        let name = tmp.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with(".final.mp4."));
        assert!(name.ends_with(".part"));
    }
}
