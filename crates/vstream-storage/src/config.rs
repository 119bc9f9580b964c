//! Storage configuration and backend selection.

use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use tracing::info;

use crate::client::{S3Config, S3ObjectStore};
use crate::error::{StorageError, StorageResult};
use crate::local::LocalObjectStore;
use crate::publisher::Publisher;
use crate::store::ObjectStore;

/// Which object store to publish to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    S3,
    Local,
}

impl FromStr for StorageBackend {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "s3" | "minio" | "r2" => Ok(Self::S3),
            "local" | "fs" => Ok(Self::Local),
            other => Err(StorageError::config_error(format!(
                "unknown STORAGE_BACKEND: {other}"
            ))),
        }
    }
}

/// Buckets and backend settings.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// Present for the S3 backend
    pub s3: Option<S3Config>,
    /// Root directory for the local backend
    pub local_path: PathBuf,
    /// Bucket for original uploads
    pub raw_bucket: String,
    /// Bucket for playlists and segments
    pub hls_bucket: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Local,
            s3: None,
            local_path: std::env::temp_dir().join("vstream-objects"),
            raw_bucket: "video-raw".to_string(),
            hls_bucket: "video-hls".to_string(),
        }
    }
}

impl StorageConfig {
    /// Create config from environment variables.
    ///
    /// The S3 backend fails here when its endpoint or credentials are missing.
    pub fn from_env() -> StorageResult<Self> {
        let defaults = Self::default();

        let backend = match std::env::var("STORAGE_BACKEND") {
            Ok(v) => v.parse()?,
            Err(_) => StorageBackend::S3,
        };

        let s3 = match backend {
            StorageBackend::S3 => Some(S3Config::from_env()?),
            StorageBackend::Local => None,
        };

        Ok(Self {
            backend,
            s3,
            local_path: std::env::var("LOCAL_STORAGE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.local_path),
            raw_bucket: std::env::var("S3_RAW_BUCKET").unwrap_or(defaults.raw_bucket),
            hls_bucket: std::env::var("S3_HLS_BUCKET").unwrap_or(defaults.hls_bucket),
        })
    }

    /// Local-backend config rooted at `path`.
    pub fn local(path: impl Into<PathBuf>) -> Self {
        Self {
            local_path: path.into(),
            ..Default::default()
        }
    }

    /// Base of public object URLs for the configured backend.
    pub fn public_base_url(&self) -> String {
        match (&self.backend, &self.s3) {
            (StorageBackend::S3, Some(s3)) => s3.public_base_url(),
            _ => format!("file://{}", self.local_path.display()),
        }
    }

    /// Build the object store and a publisher over it.
    pub async fn build_publisher(&self) -> StorageResult<Publisher> {
        let store: Arc<dyn ObjectStore> = match self.backend {
            StorageBackend::S3 => {
                let s3 = self
                    .s3
                    .as_ref()
                    .ok_or_else(|| StorageError::config_error("S3 backend without S3 settings"))?;
                Arc::new(S3ObjectStore::new(s3)?)
            }
            StorageBackend::Local => Arc::new(LocalObjectStore::new(&self.local_path).await?),
        };

        info!(
            backend = store.backend_name(),
            raw_bucket = %self.raw_bucket,
            hls_bucket = %self.hls_bucket,
            "Object store ready"
        );

        Ok(Publisher::new(store, self.public_base_url()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_parse() {
        assert_eq!("S3".parse::<StorageBackend>().unwrap(), StorageBackend::S3);
        assert_eq!("minio".parse::<StorageBackend>().unwrap(), StorageBackend::S3);
        assert_eq!("local".parse::<StorageBackend>().unwrap(), StorageBackend::Local);
        assert!("azure".parse::<StorageBackend>().is_err());
    }

    #[tokio::test]
    async fn test_build_local_publisher() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = StorageConfig::local(dir.path());

        let publisher = config.build_publisher().await.unwrap();
        assert_eq!(publisher.store().backend_name(), "local");
        assert!(publisher
            .public_url(&config.hls_bucket, "hls/d/v/index.m3u8")
            .starts_with("file://"));
    }
}
