/// Convenience result type used across stepbeat.
pub type StepbeatResult<T> = Result<T, StepbeatError>;

/// Top-level error taxonomy used by pipeline APIs.
#[derive(thiserror::Error, Debug)]
pub enum StepbeatError {
    /// Invalid user-provided parameter (bpm, dimensions, caption entries).
    ///
    /// Rejected before any rendering work starts.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// A single text/glyph asset failed to render.
    ///
    /// Recovered locally in most paths: the element is dropped and processing
    /// continues.
    #[error("render error: {0}")]
    AssetRender(String),

    /// The input video is missing, unreadable or not probe-able. Fatal.
    #[error("source error: {0}")]
    Source(String),

    /// The final encode failed. Fatal; no partial output is left behind.
    #[error("encode error: {0}")]
    Encode(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl StepbeatError {
    /// Build a [`StepbeatError::InvalidParameter`] value.
    pub fn invalid_parameter(msg: impl Into<String>) -> Self {
        Self::InvalidParameter(msg.into())
    }

    /// Build a [`StepbeatError::AssetRender`] value.
    pub fn asset_render(msg: impl Into<String>) -> Self {
        Self::AssetRender(msg.into())
    }

    /// Build a [`StepbeatError::Source`] value.
    pub fn source(msg: impl Into<String>) -> Self {
        Self::Source(msg.into())
    }

    /// Build a [`StepbeatError::Encode`] value.
    pub fn encode(msg: impl Into<String>) -> Self {
        Self::Encode(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_kind_prefix() {
        assert_eq!(
            StepbeatError::invalid_parameter("bpm must be > 0").to_string(),
            "invalid parameter: bpm must be > 0"
        );
        assert_eq!(
            StepbeatError::encode("ffmpeg exited with status 1").to_string(),
            "encode error: ffmpeg exited with status 1"
        );
    }

    #[test]
    fn anyhow_errors_wrap_transparently() {
        let err: StepbeatError = anyhow::anyhow!("disk full").into();
        assert_eq!(err.to_string(), "disk full");
    }
}
