//! Upload-to-HLS pipeline.
//!
//! Takes an uploaded video through validation, a per-run workspace, FFmpeg
//! HLS segmenting, playlist rewriting and object-store publishing, and
//! always removes the workspace afterwards.

pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod pipeline;
pub mod retry;
pub mod target;
pub mod validation;
pub mod workspace;

pub use config::{parse_extensions, PipelineConfig, UploadConfig};
pub use error::{PipelineError, PipelineResult};
pub use logging::{RunLogger, RunState};
pub use pipeline::{Clock, Pipeline};
pub use retry::{retry_async, RetryConfig, RetryResult};
pub use target::PublishTarget;
pub use validation::validate_upload;
pub use vstream_media::MANIFEST_NAME;
pub use workspace::{CleanupOutcome, DirRemover, FsRemover, Workspace, WorkspaceManager, OUTPUT_DIR_NAME};
