//! Caller-facing results and failures.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::media::MediaMetadata;

/// Outcome of a successful pipeline run.
///
/// A value, not a stored entity: it is returned to the caller and dropped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingResult {
    /// Externally reachable manifest URL
    pub playback_url: String,
    /// Client-declared file name
    pub original_file_name: String,
    /// Number of published media segments (the manifest is not counted)
    pub segment_count: usize,
    /// Number of published HLS objects (segments plus manifest)
    pub published_files: usize,
    pub duration_seconds: f64,
    pub resolution: String,
    pub codec: String,
}

impl ProcessingResult {
    /// Assemble a result from the run's metadata.
    pub fn new(
        playback_url: impl Into<String>,
        original_file_name: impl Into<String>,
        segment_count: usize,
        published_files: usize,
        metadata: MediaMetadata,
    ) -> Self {
        Self {
            playback_url: playback_url.into(),
            original_file_name: original_file_name.into(),
            segment_count,
            published_files,
            duration_seconds: metadata.duration_seconds,
            resolution: metadata.resolution,
            codec: metadata.codec,
        }
    }
}

/// Failure classes surfaced to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Bad input; nothing was written
    Validation,
    /// Workspace/filesystem setup failure
    Resource,
    /// External transcoder failure or timeout
    Transcode,
    /// Object storage failure
    Publish,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::Resource => "resource",
            ErrorKind::Transcode => "transcode",
            ErrorKind::Publish => "publish",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured failure payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureResponse {
    pub kind: ErrorKind,
    pub message: String,
}

impl FailureResponse {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// HTTP response body for a successful upload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub message: String,
    pub playback_url: String,
    pub original_file: String,
    pub segment_count: usize,
    pub hls_files_count: usize,
    pub duration_seconds: f64,
    pub resolution: String,
    pub codec: String,
}

impl From<ProcessingResult> for UploadResponse {
    fn from(result: ProcessingResult) -> Self {
        Self {
            message: "Video uploaded and processed".to_string(),
            playback_url: result.playback_url,
            original_file: result.original_file_name,
            segment_count: result.segment_count,
            hls_files_count: result.published_files,
            duration_seconds: result.duration_seconds,
            resolution: result.resolution,
            codec: result.codec,
        }
    }
}

/// Whether a published stream's manifest is reachable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackStatus {
    Available,
    Missing,
}

/// Playback information for a published stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackInfo {
    pub date: String,
    pub video_name: String,
    pub status: PlaybackStatus,
    pub playback_url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_processing_result_wire_names() {
        let result = ProcessingResult::new(
            "http://localhost:8000/api/play/2024-01-02/clip/index.m3u8",
            "clip.mp4",
            3,
            4,
            MediaMetadata {
                duration_seconds: 25.0,
                resolution: "1920x1080".to_string(),
                codec: "h264".to_string(),
            },
        );

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["segmentCount"], 3);
        assert_eq!(json["originalFileName"], "clip.mp4");
        assert_eq!(json["durationSeconds"], 25.0);
        assert!(json["playbackUrl"].as_str().unwrap().ends_with("index.m3u8"));
    }

    #[test]
    fn test_error_kind_serialization() {
        let failure = FailureResponse::new(ErrorKind::Transcode, "ffmpeg exited with 1");
        let json = serde_json::to_string(&failure).unwrap();
        assert!(json.contains("\"kind\":\"transcode\""));
        assert_eq!(ErrorKind::Publish.to_string(), "publish");
    }

    #[test]
    fn test_upload_response_counts() {
        let result = ProcessingResult::new("u", "a.mp4", 5, 6, MediaMetadata::default());
        let response = UploadResponse::from(result);
        assert_eq!(response.segment_count, 5);
        assert_eq!(response.hls_files_count, 6);
        assert_eq!(response.resolution, "Unknown");
    }
}
