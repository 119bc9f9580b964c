//! Structured run logging.
//!
//! One event per state transition, tagged with the run id and file name.

use std::fmt;

use tracing::{error, info, warn, Span};

use crate::error::PipelineError;

/// Pipeline run states, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Validating,
    WorkspaceReady,
    Saved,
    Transcoded,
    Rewritten,
    SourcePublished,
    SegmentsPublished,
    Done,
    Failed,
}

impl RunState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunState::Validating => "validating",
            RunState::WorkspaceReady => "workspace_ready",
            RunState::Saved => "saved",
            RunState::Transcoded => "transcoded",
            RunState::Rewritten => "rewritten",
            RunState::SourcePublished => "source_published",
            RunState::SegmentsPublished => "segments_published",
            RunState::Done => "done",
            RunState::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Done | RunState::Failed)
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Run logger with consistent fields.
#[derive(Debug, Clone)]
pub struct RunLogger {
    run_id: String,
    file_name: String,
}

impl RunLogger {
    pub fn new(run_id: impl Into<String>, file_name: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            file_name: file_name.into(),
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn log_transition(&self, state: RunState) {
        info!(
            run_id = %self.run_id,
            file_name = %self.file_name,
            state = %state,
            "Run state: {}", state
        );
    }

    pub fn log_warning(&self, message: &str) {
        warn!(
            run_id = %self.run_id,
            file_name = %self.file_name,
            "Run warning: {}", message
        );
    }

    /// Log a terminal failure. Validation failures are the caller's fault and logged at warn.
    pub fn log_failure(&self, failed_in: RunState, err: &PipelineError) {
        match err {
            PipelineError::Validation(_) => warn!(
                run_id = %self.run_id,
                file_name = %self.file_name,
                failed_in = %failed_in,
                kind = %err.kind(),
                "Upload rejected: {}", err
            ),
            _ => error!(
                run_id = %self.run_id,
                file_name = %self.file_name,
                failed_in = %failed_in,
                kind = %err.kind(),
                diagnostics = err.diagnostics().unwrap_or_default(),
                "Run failed: {}", err
            ),
        }
    }

    pub fn log_completion(&self, playback_url: &str, segments: usize) {
        info!(
            run_id = %self.run_id,
            file_name = %self.file_name,
            segments,
            playback_url = %playback_url,
            "Run completed"
        );
    }

    /// Span carrying the run fields, for instrumenting the whole run.
    pub fn create_span(&self) -> Span {
        tracing::info_span!(
            "pipeline_run",
            run_id = %self.run_id,
            file_name = %self.file_name
        )
    }
}
