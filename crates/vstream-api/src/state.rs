//! Application state.

use std::sync::Arc;

use vstream_pipeline::Pipeline;
use vstream_storage::Publisher;

use crate::config::ApiConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub pipeline: Arc<Pipeline>,
}

impl AppState {
    pub fn new(config: ApiConfig, pipeline: Pipeline) -> Self {
        Self {
            config,
            pipeline: Arc::new(pipeline),
        }
    }

    pub fn publisher(&self) -> &Publisher {
        self.pipeline.publisher()
    }

    /// Bucket holding playlists and segments.
    pub fn hls_bucket(&self) -> &str {
        &self.pipeline.config().storage.hls_bucket
    }

    /// Key prefix of HLS objects.
    pub fn hls_prefix(&self) -> &str {
        &self.pipeline.config().hls_prefix
    }
}
