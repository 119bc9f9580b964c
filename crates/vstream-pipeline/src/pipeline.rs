//! Upload-to-HLS orchestration.
//!
//! validate → workspace → save → transcode → rewrite → publish source →
//! publish segments → publish manifest → cleanup.
//!
//! The workspace is destroyed exactly once on every path that created it,
//! including a run whose future is dropped before it finishes.
//! A run either returns a result with every object published or an error;
//! there is no partial success.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use chrono::{Local, NaiveDate};
use futures::stream::{self, TryStreamExt};
use tracing::{debug, Instrument};
use uuid::Uuid;
use vstream_media::{
    locate_ffmpeg, rewrite_manifest, verify_references, HlsTranscoder, MediaError, Transcoder,
};
use vstream_models::{ProcessingResult, UploadRequest, UploadSource};
use vstream_storage::{Publisher, StorageError};

use crate::config::PipelineConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::logging::{RunLogger, RunState};
use crate::metrics;
use crate::retry::RetryConfig;
use crate::target::PublishTarget;
use crate::validation::validate_upload;
use crate::workspace::{Workspace, WorkspaceManager};

/// Source of the calendar date used in object keys.
pub type Clock = Arc<dyn Fn() -> NaiveDate + Send + Sync>;

/// Drives one upload through transcode and publish.
///
/// Cheap to clone; concurrent runs share nothing but the capabilities.
#[derive(Clone)]
pub struct Pipeline {
    config: PipelineConfig,
    transcoder: Arc<dyn Transcoder>,
    publisher: Publisher,
    workspaces: WorkspaceManager,
    clock: Clock,
}

impl Pipeline {
    pub fn new(
        config: PipelineConfig,
        transcoder: Arc<dyn Transcoder>,
        publisher: Publisher,
        workspaces: WorkspaceManager,
    ) -> Self {
        Self {
            config,
            transcoder,
            publisher,
            workspaces,
            clock: Arc::new(|| Local::now().date_naive()),
        }
    }

    /// Build the production pipeline from configuration.
    ///
    /// Resolves FFmpeg, connects the object store and creates the workspace
    /// root. Any failure is a start-up error.
    pub async fn from_config(config: PipelineConfig) -> PipelineResult<Self> {
        let ffmpeg = locate_ffmpeg(&config.transcode.ffmpeg_path)
            .map_err(|e| PipelineError::config_error(e.to_string()))?;
        let mut profile = config.transcode.clone();
        profile.ffmpeg_path = ffmpeg;

        let publisher = config
            .storage
            .build_publisher()
            .await
            .map_err(|e| PipelineError::config_error(e.to_string()))?;

        let retry = RetryConfig::new("workspace_cleanup")
            .with_max_attempts(config.upload.max_retry_count)
            .with_base_delay(config.upload.retry_delay);
        let workspaces = WorkspaceManager::init(&config.upload.temp_path, retry).await?;

        Ok(Self::new(
            config,
            Arc::new(HlsTranscoder::new(profile)),
            publisher,
            workspaces,
        ))
    }

    /// Override the date source.
    pub fn with_clock(mut self, clock: impl Fn() -> NaiveDate + Send + Sync + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn publisher(&self) -> &Publisher {
        &self.publisher
    }

    /// Run the whole pipeline for one upload.
    pub async fn process(&self, request: UploadRequest) -> PipelineResult<ProcessingResult> {
        let logger = RunLogger::new(Uuid::new_v4().to_string(), &request.original_file_name);
        let span = logger.create_span();
        let started = Instant::now();

        let result = self.run(&request, &logger).instrument(span).await;

        let outcome = match &result {
            Ok(_) => "success",
            Err(e) => e.kind().as_str(),
        };
        metrics::record_run(outcome, started.elapsed().as_secs_f64());

        result
    }

    async fn run(
        &self,
        request: &UploadRequest,
        logger: &RunLogger,
    ) -> PipelineResult<ProcessingResult> {
        logger.log_transition(RunState::Validating);

        let file_name = validate_upload(request, &self.config.upload).map_err(|e| {
            logger.log_failure(RunState::Validating, &e);
            e
        })?;

        let workspace = self.workspaces.create().await.map_err(|e| {
            logger.log_failure(RunState::WorkspaceReady, &e);
            e
        })?;
        logger.log_transition(RunState::WorkspaceReady);

        let target = PublishTarget::new(
            (self.clock)(),
            &file_name,
            &self.config.storage.raw_bucket,
            &self.config.storage.hls_bucket,
            &self.config.hls_prefix,
        );

        let mut state = RunState::WorkspaceReady;
        let result = self
            .run_in_workspace(&workspace, request, &target, logger, &mut state)
            .await;

        if let Err(e) = &result {
            logger.log_failure(state, e);
        }

        self.workspaces.destroy(workspace).await;

        let processed = result?;
        logger.log_transition(RunState::Done);
        logger.log_completion(&processed.playback_url, processed.segment_count);
        Ok(processed)
    }

    async fn run_in_workspace(
        &self,
        workspace: &Workspace,
        request: &UploadRequest,
        target: &PublishTarget,
        logger: &RunLogger,
        state: &mut RunState,
    ) -> PipelineResult<ProcessingResult> {
        let mut advance = |next: RunState| {
            *state = next;
            logger.log_transition(next);
        };

        let source = workspace.source_path(&target.file_name);
        save_upload(&request.source, &source).await?;
        advance(RunState::Saved);

        let transcode_started = Instant::now();
        let outcome = self
            .transcoder
            .transcode(&source, workspace.output_dir())
            .await?;
        metrics::record_transcode_duration(transcode_started.elapsed().as_secs_f64());
        advance(RunState::Transcoded);

        let base_url = self
            .publisher
            .public_url(&target.hls_bucket, target.hls_prefix());
        let rewrite = rewrite_manifest(&outcome.manifest, &base_url).await?;
        verify_references(
            &rewrite.references,
            &outcome.segments,
            self.transcoder.profile().is_vod(),
        )?;
        advance(RunState::Rewritten);

        self.publisher
            .publish(&target.raw_bucket, &target.raw_key(), &source)
            .await?;
        metrics::record_published(&target.raw_bucket, 1);
        advance(RunState::SourcePublished);

        self.publish_segments(workspace.output_dir(), &outcome.segments, target)
            .await?;
        // Manifest last, so it never points at segments that are not there yet
        self.publisher
            .publish(&target.hls_bucket, &target.manifest_key(), &outcome.manifest)
            .await?;
        metrics::record_published(&target.hls_bucket, outcome.segment_count() as u64 + 1);
        advance(RunState::SegmentsPublished);

        Ok(ProcessingResult::new(
            target.playback_url(&self.config.playback_base_url),
            &request.original_file_name,
            outcome.segment_count(),
            outcome.segment_count() + 1,
            outcome.metadata,
        ))
    }

    async fn publish_segments(
        &self,
        output_dir: &Path,
        segments: &[PathBuf],
        target: &PublishTarget,
    ) -> PipelineResult<()> {
        let uploads = segments
            .iter()
            .map(|path| -> PipelineResult<(String, &PathBuf)> {
                Ok((target.hls_key(&relative_key(output_dir, path)?), path))
            })
            .collect::<PipelineResult<Vec<_>>>()?;

        debug!(
            count = uploads.len(),
            concurrency = self.config.publish_concurrency,
            "Publishing segments"
        );

        stream::iter(uploads.into_iter().map(Ok::<_, StorageError>))
            .try_for_each_concurrent(self.config.publish_concurrency.max(1), |(key, path)| async move {
                self.publisher.publish(&target.hls_bucket, &key, path).await
            })
            .await?;

        Ok(())
    }
}

async fn save_upload(source: &UploadSource, dest: &Path) -> PipelineResult<()> {
    let saved = match source {
        UploadSource::Bytes(data) => tokio::fs::write(dest, data).await,
        UploadSource::Path(path) => tokio::fs::copy(path, dest).await.map(|_| ()),
    };
    saved.map_err(|e| {
        PipelineError::resource(format!("Cannot save upload to {}: {}", dest.display(), e))
    })
}

/// `/` separated path of `path` below `root`.
fn relative_key(root: &Path, path: &Path) -> PipelineResult<String> {
    let relative = path.strip_prefix(root).map_err(|_| {
        MediaError::inconsistent(format!("{} is outside the output directory", path.display()))
    })?;

    let parts = relative
        .components()
        .map(|c| match c {
            Component::Normal(part) => part.to_str().map(str::to_string),
            _ => None,
        })
        .collect::<Option<Vec<_>>>()
        .filter(|parts| !parts.is_empty())
        .ok_or_else(|| {
            MediaError::inconsistent(format!("unusable output file name {}", path.display()))
        })?;

    Ok(parts.join("/"))
}
