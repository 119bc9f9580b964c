//! Pipeline error types.

use thiserror::Error;
use vstream_media::MediaError;
use vstream_models::{ErrorKind, FailureResponse};
use vstream_storage::StorageError;

pub type PipelineResult<T> = Result<T, PipelineError>;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// Bad input; nothing was written yet.
    #[error("{0}")]
    Validation(String),

    /// Workspace or filesystem setup failure.
    #[error("Resource unavailable: {0}")]
    Resource(String),

    /// Transcoder failure, timeout or inconsistent output.
    #[error("Transcode failed: {0}")]
    Transcode(#[from] MediaError),

    /// Object store failure.
    #[error("Publish failed: {0}")]
    Publish(#[from] StorageError),

    /// Invalid start-up configuration.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl PipelineError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn resource(msg: impl Into<String>) -> Self {
        Self::Resource(msg.into())
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Caller-facing error kind.
    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::Validation(_) => ErrorKind::Validation,
            PipelineError::Resource(_) | PipelineError::Config(_) => ErrorKind::Resource,
            PipelineError::Transcode(_) => ErrorKind::Transcode,
            PipelineError::Publish(_) => ErrorKind::Publish,
        }
    }

    /// Diagnostic text captured from the transcoder, if any.
    pub fn diagnostics(&self) -> Option<&str> {
        match self {
            PipelineError::Transcode(e) => e.diagnostics(),
            _ => None,
        }
    }

    /// Structured failure for the caller.
    pub fn to_failure(&self) -> FailureResponse {
        FailureResponse::new(self.kind(), self.to_string())
    }
}
