//! Upload validation.

use vstream_models::{file_extension, sanitize_file_name, UploadRequest};

use crate::config::UploadConfig;
use crate::error::{PipelineError, PipelineResult};

/// Check an upload against the configured limits.
///
/// Returns the sanitized file name the workspace and object keys use.
/// Performs no I/O.
pub fn validate_upload(request: &UploadRequest, config: &UploadConfig) -> PipelineResult<String> {
    if request.original_file_name.trim().is_empty() || request.declared_size == 0 {
        return Err(PipelineError::validation("Please upload a valid video file"));
    }

    let allowed = file_extension(&request.original_file_name)
        .map(|ext| config.allowed_extensions.contains(&ext))
        .unwrap_or(false);
    if !allowed {
        return Err(PipelineError::validation(format!(
            "Unsupported file type. Allowed types: {}",
            config.allowed_extensions.join(", ")
        )));
    }

    if request.declared_size > config.max_file_size {
        return Err(PipelineError::validation(format!(
            "File size exceeds the limit of {} MB",
            config.max_file_size_mb()
        )));
    }

    sanitize_file_name(&request.original_file_name)
        .map_err(|e| PipelineError::validation(e.to_string()))
}
