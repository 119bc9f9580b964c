#![deny(unreachable_patterns)]
//! FFmpeg CLI wrapper for HLS publishing.
//!
//! This crate provides:
//! - Type-safe FFmpeg command building
//! - A runner that drains stdout/stderr concurrently and enforces a deadline
//! - Duration/resolution/codec parsing from FFmpeg's diagnostic output
//! - HLS segmenting behind the [`Transcoder`] trait
//! - Playlist rewriting to absolute segment URLs

pub mod command;
pub mod error;
pub mod fs_utils;
pub mod hls;
pub mod manifest;
pub mod probe;

pub use command::{locate_ffmpeg, CommandOutput, FfmpegCommand, FfmpegRunner};
pub use error::{MediaError, MediaResult};
pub use hls::{HlsTranscoder, TranscodeOutcome, TranscodeProfile, Transcoder, MANIFEST_NAME};
pub use manifest::{
    is_segment_reference, rewrite_manifest, rewrite_manifest_text, verify_references,
    ManifestRewrite, SEGMENT_EXTENSION,
};
pub use probe::{parse_diagnostics, probe_media};
