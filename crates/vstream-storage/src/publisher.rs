//! Publishing local files to an object store.

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::StorageResult;
use crate::store::ObjectStore;

/// Content type for an object key, by extension.
pub fn content_type_for(key: &str) -> &'static str {
    let ext = key
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "m3u8" => "application/vnd.apple.mpegurl",
        "ts" => "video/mp2t",
        "mp4" | "m4v" => "video/mp4",
        "mov" => "video/quicktime",
        "webm" => "video/webm",
        "mkv" => "video/x-matroska",
        _ => "application/octet-stream",
    }
}

/// Uploads files and builds their public URLs.
///
/// Uploads are never retried here; a failed `publish` surfaces the
/// storage error to the caller.
#[derive(Clone)]
pub struct Publisher {
    store: Arc<dyn ObjectStore>,
    public_base_url: String,
}

impl Publisher {
    /// `public_base_url` is `scheme://host[:port]`, without a trailing slash.
    pub fn new(store: Arc<dyn ObjectStore>, public_base_url: impl Into<String>) -> Self {
        let public_base_url = public_base_url.into().trim_end_matches('/').to_string();
        Self {
            store,
            public_base_url,
        }
    }

    pub fn store(&self) -> &Arc<dyn ObjectStore> {
        &self.store
    }

    /// Create the container if it does not exist yet.
    pub async fn ensure_container(&self, name: &str) -> StorageResult<()> {
        if self.store.bucket_exists(name).await? {
            return Ok(());
        }
        debug!(bucket = %name, backend = self.store.backend_name(), "Creating bucket");
        self.store.create_bucket(name).await
    }

    /// Upload `local_path` under `key`, overwriting any existing object.
    pub async fn publish(&self, container: &str, key: &str, local_path: &Path) -> StorageResult<()> {
        self.ensure_container(container).await?;
        self.store
            .put_file(container, key, local_path, content_type_for(key))
            .await?;
        debug!(bucket = %container, key = %key, "Published object");
        Ok(())
    }

    /// Public URL of an object: `base/container/key`, each key segment percent-encoded.
    pub fn public_url(&self, container: &str, key: &str) -> String {
        let encoded: Vec<String> = key
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect();
        format!(
            "{}/{}/{}",
            self.public_base_url,
            urlencoding::encode(container),
            encoded.join("/")
        )
    }

    /// Whether the object exists. Any failure counts as absent.
    pub async fn exists(&self, container: &str, key: &str) -> bool {
        match self.store.stat_object(container, key).await {
            Ok(_) => true,
            Err(crate::StorageError::NotFound(_)) => false,
            Err(e) => {
                warn!(bucket = %container, key = %key, error = %e, "Existence check failed");
                false
            }
        }
    }
}
