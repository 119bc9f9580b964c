//! Object storage capability.

use std::path::Path;

use async_trait::async_trait;

use crate::error::StorageResult;

/// Object metadata returned by a stat call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectStat {
    pub key: String,
    /// Size in bytes
    pub size: u64,
}

/// Minimal object-store surface the publisher needs.
///
/// Implementations must be safe to call concurrently; the publisher uploads
/// segments in parallel.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Whether the bucket exists.
    async fn bucket_exists(&self, bucket: &str) -> StorageResult<bool>;

    /// Create the bucket. Creating a bucket that already exists succeeds.
    async fn create_bucket(&self, bucket: &str) -> StorageResult<()>;

    /// Upload a local file under `key`, replacing any existing object.
    async fn put_file(
        &self,
        bucket: &str,
        key: &str,
        path: &Path,
        content_type: &str,
    ) -> StorageResult<()>;

    /// Stat an object; [`StorageError::NotFound`](crate::StorageError::NotFound) when absent.
    async fn stat_object(&self, bucket: &str, key: &str) -> StorageResult<ObjectStat>;

    /// Backend name for logs.
    fn backend_name(&self) -> &'static str;
}
