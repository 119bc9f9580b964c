//! Pipeline configuration.

use std::path::PathBuf;
use std::time::Duration;

use vstream_media::TranscodeProfile;
use vstream_storage::StorageConfig;

use crate::error::{PipelineError, PipelineResult};

const DEFAULT_EXTENSIONS: &[&str] = &[
    ".mp4", ".mov", ".avi", ".mkv", ".webm", ".flv", ".wmv", ".m4v", ".3gp",
];

/// Upload limits and workspace settings.
#[derive(Debug, Clone)]
pub struct UploadConfig {
    /// Lowercase extensions with leading dot
    pub allowed_extensions: Vec<String>,
    /// Maximum upload size in bytes
    pub max_file_size: u64,
    /// Root directory for per-run workspaces
    pub temp_path: PathBuf,
    /// Attempts for workspace deletion
    pub max_retry_count: u32,
    /// Base delay between deletion attempts (multiplied by the attempt number)
    pub retry_delay: Duration,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            allowed_extensions: DEFAULT_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
            max_file_size: 1024 * 1024 * 1024,
            temp_path: std::env::temp_dir().join("vstream"),
            max_retry_count: 3,
            retry_delay: Duration::from_millis(500),
        }
    }
}

impl UploadConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            allowed_extensions: std::env::var("UPLOAD_ALLOWED_EXTENSIONS")
                .ok()
                .map(|s| parse_extensions(&s))
                .filter(|v| !v.is_empty())
                .unwrap_or(defaults.allowed_extensions),
            max_file_size: std::env::var("UPLOAD_MAX_FILE_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_file_size),
            temp_path: std::env::var("UPLOAD_TEMP_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.temp_path),
            max_retry_count: std::env::var("UPLOAD_MAX_RETRY_COUNT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_retry_count),
            retry_delay: std::env::var("UPLOAD_RETRY_DELAY_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(defaults.retry_delay),
        }
    }

    /// Upload limit in megabytes, rounded up, for messages.
    pub fn max_file_size_mb(&self) -> u64 {
        self.max_file_size.div_ceil(1024 * 1024)
    }
}

/// Parse a comma list like `mp4, .MOV` into `[".mp4", ".mov"]`.
pub fn parse_extensions(list: &str) -> Vec<String> {
    list.split(',')
        .map(|s| s.trim().to_ascii_lowercase())
        .filter(|s| !s.is_empty() && s != ".")
        .map(|s| if s.starts_with('.') { s } else { format!(".{s}") })
        .collect()
}

/// Everything one pipeline needs, loaded once at start-up.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub upload: UploadConfig,
    pub transcode: TranscodeProfile,
    pub storage: StorageConfig,
    /// Base of the playback URL returned to callers
    pub playback_base_url: String,
    /// Concurrent segment uploads per run
    pub publish_concurrency: usize,
    /// Key prefix for HLS objects
    pub hls_prefix: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            upload: UploadConfig::default(),
            transcode: TranscodeProfile::default(),
            storage: StorageConfig::default(),
            playback_base_url: "http://localhost:8000".to_string(),
            publish_concurrency: 4,
            hls_prefix: "hls".to_string(),
        }
    }
}

impl PipelineConfig {
    /// Create config from environment variables.
    pub fn from_env() -> PipelineResult<Self> {
        let defaults = Self::default();
        let storage =
            StorageConfig::from_env().map_err(|e| PipelineError::config_error(e.to_string()))?;

        Ok(Self {
            upload: UploadConfig::from_env(),
            transcode: TranscodeProfile::from_env(),
            storage,
            playback_base_url: std::env::var("PLAYBACK_BASE_URL")
                .map(|s| s.trim_end_matches('/').to_string())
                .unwrap_or(defaults.playback_base_url),
            publish_concurrency: std::env::var("PUBLISH_CONCURRENCY")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|n: &usize| *n > 0)
                .unwrap_or(defaults.publish_concurrency),
            hls_prefix: defaults.hls_prefix,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_extensions() {
        assert_eq!(parse_extensions("mp4, .MOV,,  .mkv "), vec![".mp4", ".mov", ".mkv"]);
        assert!(parse_extensions(" , ").is_empty());
    }

    #[test]
    fn test_defaults() {
        let config = UploadConfig::default();
        assert_eq!(config.max_file_size_mb(), 1024);
        assert!(config.allowed_extensions.contains(&".mp4".to_string()));
        assert_eq!(PipelineConfig::default().publish_concurrency, 4);
    }
}
