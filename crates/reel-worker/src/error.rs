//! Render job error types.

use thiserror::Error;

use reel_media::MediaError;
use reel_models::{FailureKind, RenderFailure};

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Media error: {0}")]
    Media(#[from] MediaError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl WorkerError {
    /// Request that cannot be bound to its uploads.
    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }

    /// Failure category reported to callers.
    pub fn kind(&self) -> FailureKind {
        match self {
            WorkerError::InvalidRequest(_) | WorkerError::Json(_) => FailureKind::Configuration,
            WorkerError::Media(e) => e.kind(),
            WorkerError::Io(_) => FailureKind::Internal,
        }
    }

    /// Normalize into the failure payload returned to callers.
    pub fn to_failure(&self) -> RenderFailure {
        let stderr_tail = match self {
            WorkerError::Media(e) => e.stderr_tail().map(str::to_string),
            _ => None,
        };
        RenderFailure {
            kind: self.kind(),
            message: self.to_string(),
            stderr_tail,
        }
    }
}
