//! Shared data models for the VStream upload pipeline.
//!
//! This crate provides Serde-serializable types for:
//! - Upload requests and their byte sources
//! - Media metadata parsed from the transcoder
//! - Caller-facing processing results and failures
//! - File-name sanitizing for workspace paths and object keys

pub mod media;
pub mod naming;
pub mod result;
pub mod upload;

pub use media::{MediaMetadata, UNKNOWN};
pub use naming::{file_extension, file_stem, sanitize_file_name, NamingError};
pub use result::{ErrorKind, FailureResponse, PlaybackInfo, PlaybackStatus, ProcessingResult, UploadResponse};
pub use upload::{UploadRequest, UploadSource};
