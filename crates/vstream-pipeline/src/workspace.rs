//! Per-run scratch directories.
//!
//! Every run gets its own directory under the configured root, named by a
//! random token, holding the saved upload and an `hls/` output directory.
//! Deletion retries with linear backoff and never fails the run.
//!
//! A [`Workspace`] that is dropped without [`WorkspaceManager::destroy`]
//! (the run future was cancelled) removes itself on a background task.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{PipelineError, PipelineResult};
use crate::metrics;
use crate::retry::{retry_async, RetryConfig};

/// Name of the transcoder output directory inside a workspace.
pub const OUTPUT_DIR_NAME: &str = "hls";

/// Recursive directory deletion.
#[async_trait]
pub trait DirRemover: Send + Sync {
    /// Remove `path` and everything below it. A missing path is success.
    async fn remove_dir_all(&self, path: &Path) -> io::Result<()>;
}

/// [`DirRemover`] on the real filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsRemover;

#[async_trait]
impl DirRemover for FsRemover {
    async fn remove_dir_all(&self, path: &Path) -> io::Result<()> {
        match tokio::fs::remove_dir_all(path).await {
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            other => other,
        }
    }
}

/// A directory owned by exactly one run.
pub struct Workspace {
    id: String,
    path: PathBuf,
    output_dir: PathBuf,
    /// Set until `destroy` takes the workspace; used by `Drop`
    manager: Option<WorkspaceManager>,
}

impl std::fmt::Debug for Workspace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Workspace")
            .field("id", &self.id)
            .field("path", &self.path)
            .finish()
    }
}

impl Workspace {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Directory the transcoder writes into.
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Location of the saved upload.
    pub fn source_path(&self, file_name: &str) -> PathBuf {
        self.path.join(file_name)
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        let Some(manager) = self.manager.take() else {
            return;
        };

        let abandoned = Workspace {
            id: std::mem::take(&mut self.id),
            path: std::mem::take(&mut self.path),
            output_dir: std::mem::take(&mut self.output_dir),
            manager: None,
        };
        warn!(workspace = %abandoned.id, "Run abandoned, removing workspace");

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    manager.destroy(abandoned).await;
                });
            }
            Err(_) => {
                if let Err(e) = std::fs::remove_dir_all(&abandoned.path) {
                    if e.kind() != io::ErrorKind::NotFound {
                        metrics::record_cleanup_failure();
                        warn!(
                            workspace = %abandoned.id,
                            path = %abandoned.path.display(),
                            error = %e,
                            "Giving up on workspace cleanup"
                        );
                    }
                }
            }
        }
    }
}

/// Result of a destroy call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CleanupOutcome {
    pub removed: bool,
    pub attempts: u32,
}

/// Allocates and removes workspaces under one root.
#[derive(Clone)]
pub struct WorkspaceManager {
    root: PathBuf,
    remover: Arc<dyn DirRemover>,
    retry: RetryConfig,
}

impl WorkspaceManager {
    /// Create the manager, creating `root` if it does not exist.
    ///
    /// Failure here is a start-up configuration error.
    pub async fn init(root: impl Into<PathBuf>, retry: RetryConfig) -> PipelineResult<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await.map_err(|e| {
            PipelineError::config_error(format!(
                "Cannot create workspace root {}: {}",
                root.display(),
                e
            ))
        })?;

        info!(root = %root.display(), "Workspace root ready");

        Ok(Self {
            root,
            remover: Arc::new(FsRemover),
            retry,
        })
    }

    /// Replace the deletion strategy.
    pub fn with_remover(mut self, remover: Arc<dyn DirRemover>) -> Self {
        self.remover = remover;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Allocate a fresh workspace. Not retried.
    pub async fn create(&self) -> PipelineResult<Workspace> {
        let id = Uuid::new_v4().simple().to_string();
        let path = self.root.join(&id);
        let output_dir = path.join(OUTPUT_DIR_NAME);

        // create_dir (not create_dir_all) so a missing root is reported
        tokio::fs::create_dir(&path).await.map_err(|e| {
            PipelineError::resource(format!("Cannot create workspace {}: {}", path.display(), e))
        })?;
        if let Err(e) = tokio::fs::create_dir(&output_dir).await {
            if let Err(rollback) = self.remover.remove_dir_all(&path).await {
                metrics::record_cleanup_failure();
                warn!(
                    workspace = %id,
                    path = %path.display(),
                    error = %rollback,
                    "Cannot remove partially created workspace"
                );
            }
            return Err(PipelineError::resource(format!(
                "Cannot create output directory {}: {}",
                output_dir.display(),
                e
            )));
        }

        debug!(workspace = %id, "Workspace created");
        Ok(Workspace {
            id,
            path,
            output_dir,
            manager: Some(self.clone()),
        })
    }

    /// Remove the workspace and everything in it.
    ///
    /// Retries up to the configured attempt count, waiting `base × attempt`
    /// between attempts. Exhausting the retries is logged, never returned.
    pub async fn destroy(&self, mut workspace: Workspace) -> CleanupOutcome {
        workspace.manager = None;
        let path = std::mem::take(&mut workspace.path);
        let id = std::mem::take(&mut workspace.id);

        let result = retry_async(
            &self.retry,
            || self.remover.remove_dir_all(&path),
            |attempt, e| {
                metrics::record_cleanup_failure();
                warn!(
                    workspace = %id,
                    attempt,
                    max_attempts = self.retry.max_attempts,
                    error = %e,
                    "Workspace cleanup attempt failed"
                );
            },
        )
        .await;

        let attempts = result.attempts();
        match result.into_result() {
            Ok(()) => {
                debug!(workspace = %id, attempts, "Workspace removed");
                CleanupOutcome {
                    removed: true,
                    attempts,
                }
            }
            Err(e) => {
                warn!(
                    workspace = %id,
                    path = %path.display(),
                    attempts,
                    error = %e,
                    "Giving up on workspace cleanup"
                );
                CleanupOutcome {
                    removed: false,
                    attempts,
                }
            }
        }
    }
}
