//! Error types for media operations.

use std::path::PathBuf;
use thiserror::Error;

use reel_models::FailureKind;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur while compiling or rendering a composition.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("Invalid composition: {0}")]
    InvalidComposition(String),

    #[error("Invalid filter graph: {0}")]
    InvalidGraph(String),

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("FFmpeg not found: {0}")]
    FfmpegNotFound(String),

    #[error("FFprobe not found: {0}")]
    FfprobeNotFound(String),

    #[error("Failed to start FFmpeg: {0}")]
    SpawnFailed(String),

    #[error("FFmpeg command failed: {message}")]
    FfmpegFailed {
        message: String,
        stderr: Option<String>,
        exit_code: Option<i32>,
    },

    #[error("FFmpeg reported success but no output exists at {0}")]
    MissingOutput(PathBuf),

    #[error("FFprobe command failed: {message}")]
    FfprobeFailed {
        message: String,
        stderr: Option<String>,
    },

    #[error("Operation cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl MediaError {
    /// Spec rejected before compiling.
    pub fn invalid_composition(message: impl Into<String>) -> Self {
        Self::InvalidComposition(message.into())
    }

    /// Compiled graph failed its static checks.
    pub fn invalid_graph(message: impl Into<String>) -> Self {
        Self::InvalidGraph(message.into())
    }

    /// Engine process could not be started.
    pub fn spawn_failed(message: impl Into<String>) -> Self {
        Self::SpawnFailed(message.into())
    }

    /// Create an FFmpeg failure error.
    pub fn ffmpeg_failed(
        message: impl Into<String>,
        stderr: Option<String>,
        exit_code: Option<i32>,
    ) -> Self {
        Self::FfmpegFailed {
            message: message.into(),
            stderr,
            exit_code,
        }
    }

    /// Unexpected internal failure.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Which failure channel this error belongs to.
    pub fn kind(&self) -> FailureKind {
        match self {
            MediaError::InvalidComposition(_)
            | MediaError::InvalidGraph(_)
            | MediaError::FileNotFound(_)
            | MediaError::FfprobeNotFound(_)
            | MediaError::FfprobeFailed { .. }
            | MediaError::JsonParse(_) => FailureKind::Configuration,
            MediaError::FfmpegNotFound(_) | MediaError::SpawnFailed(_) => FailureKind::Spawn,
            MediaError::FfmpegFailed { .. } | MediaError::MissingOutput(_) => FailureKind::Encode,
            MediaError::Cancelled => FailureKind::Cancelled,
            MediaError::Io(_) | MediaError::Internal(_) => FailureKind::Internal,
        }
    }

    /// Trailing diagnostic output of the engine, when the engine ran.
    pub fn stderr_tail(&self) -> Option<&str> {
        match self {
            MediaError::FfmpegFailed { stderr, .. } | MediaError::FfprobeFailed { stderr, .. } => {
                stderr.as_deref()
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(MediaError::invalid_composition("x").kind(), FailureKind::Configuration);
        assert_eq!(MediaError::FfmpegNotFound("ffmpeg".into()).kind(), FailureKind::Spawn);
        assert_eq!(MediaError::spawn_failed("denied").kind(), FailureKind::Spawn);
        assert_eq!(
            MediaError::ffmpeg_failed("boom", Some("tail".into()), Some(1)).kind(),
            FailureKind::Encode
        );
        assert_eq!(MediaError::Cancelled.kind(), FailureKind::Cancelled);
    }

    #[test]
    fn test_stderr_tail_only_for_engine_failures() {
        let err = MediaError::ffmpeg_failed("boom", Some("Invalid argument".into()), Some(234));
        assert_eq!(err.stderr_tail(), Some("Invalid argument"));
        assert_eq!(MediaError::Cancelled.stderr_tail(), None);
    }
}
