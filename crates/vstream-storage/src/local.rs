//! Local filesystem object store.
//!
//! Buckets are directories under the root, keys are relative paths inside
//! the bucket directory. Used for development and tests.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tracing::{debug, info};

use crate::error::{StorageError, StorageResult};
use crate::store::{ObjectStat, ObjectStore};

/// Filesystem-backed [`ObjectStore`].
#[derive(Debug, Clone)]
pub struct LocalObjectStore {
    root: PathBuf,
}

impl LocalObjectStore {
    /// Create the store, creating `root` if needed.
    pub async fn new(root: impl Into<PathBuf>) -> StorageResult<Self> {
        let root = root.into();

        fs::create_dir_all(&root).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create storage directory {}: {}",
                root.display(),
                e
            ))
        })?;

        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn bucket_path(&self, bucket: &str) -> StorageResult<PathBuf> {
        if bucket.is_empty() || bucket.contains(['/', '\\']) || bucket == "." || bucket == ".." {
            return Err(StorageError::InvalidKey(format!("invalid bucket name: {bucket}")));
        }
        Ok(self.root.join(bucket))
    }

    /// Map a key to a path, rejecting anything that could leave the bucket.
    fn object_path(&self, bucket: &str, key: &str) -> StorageResult<PathBuf> {
        let bucket_path = self.bucket_path(bucket)?;

        if key.is_empty() || key.starts_with('/') || key.contains('\\') {
            return Err(StorageError::InvalidKey(format!("invalid key: {key}")));
        }

        let relative = Path::new(key);
        if !relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)))
        {
            return Err(StorageError::InvalidKey(format!(
                "key resolves outside bucket: {key}"
            )));
        }

        Ok(bucket_path.join(relative))
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn bucket_exists(&self, bucket: &str) -> StorageResult<bool> {
        let path = self.bucket_path(bucket)?;
        Ok(fs::metadata(&path).await.map(|m| m.is_dir()).unwrap_or(false))
    }

    async fn create_bucket(&self, bucket: &str) -> StorageResult<()> {
        let path = self.bucket_path(bucket)?;
        fs::create_dir_all(&path)
            .await
            .map_err(|e| StorageError::bucket_failed(format!("{}: {}", path.display(), e)))?;
        info!(bucket = %bucket, path = %path.display(), "Created local bucket");
        Ok(())
    }

    async fn put_file(
        &self,
        bucket: &str,
        key: &str,
        path: &Path,
        _content_type: &str,
    ) -> StorageResult<()> {
        let target = self.object_path(bucket, key)?;

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).await?;
        }

        let bytes = fs::copy(path, &target).await.map_err(|e| {
            StorageError::upload_failed(format!(
                "Failed to copy {} to {}: {}",
                path.display(),
                target.display(),
                e
            ))
        })?;

        debug!(key = %key, size_bytes = bytes, "Local storage upload successful");
        Ok(())
    }

    async fn stat_object(&self, bucket: &str, key: &str) -> StorageResult<ObjectStat> {
        let path = self.object_path(bucket, key)?;
        match fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => Ok(ObjectStat {
                key: key.to_string(),
                size: meta.len(),
            }),
            Ok(_) => Err(StorageError::not_found(key)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(StorageError::not_found(key)),
            Err(e) => Err(e.into()),
        }
    }

    fn backend_name(&self) -> &'static str {
        "local"
    }
}
