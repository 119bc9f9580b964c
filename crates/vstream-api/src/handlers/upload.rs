//! Video upload handler.

use axum::extract::{Multipart, State};
use axum::Json;
use tokio::io::AsyncWriteExt;
use tracing::info;
use vstream_models::{UploadRequest, UploadResponse};
use vstream_pipeline::PipelineError;

use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::state::AppState;

/// Multipart field carrying the video.
const FILE_FIELD: &str = "file";

/// Accept a multipart upload, run the pipeline and return the playback URL.
///
/// The file is spooled to a temporary file under the workspace root while it
/// streams in; the size limit is enforced before the whole body has been read.
/// The spool file is removed when the handler returns or is dropped.
pub async fn upload_video(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<Json<UploadResponse>> {
    let upload_config = &state.pipeline.config().upload;

    while let Some(mut field) = multipart.next_field().await? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let file_name = field.file_name().unwrap_or_default().to_string();

        let spool = tempfile::NamedTempFile::new_in(&upload_config.temp_path)
            .map_err(|e| PipelineError::resource(format!("Cannot spool upload: {e}")))?;
        let std_file = spool
            .reopen()
            .map_err(|e| PipelineError::resource(format!("Cannot spool upload: {e}")))?;
        let mut file = tokio::fs::File::from_std(std_file);

        let mut size: u64 = 0;
        while let Some(chunk) = field.chunk().await? {
            size += chunk.len() as u64;
            if size > upload_config.max_file_size {
                return Err(PipelineError::validation(format!(
                    "File size exceeds the limit of {} MB",
                    upload_config.max_file_size_mb()
                ))
                .into());
            }
            file.write_all(&chunk)
                .await
                .map_err(|e| PipelineError::resource(format!("Cannot spool upload: {e}")))?;
        }
        file.flush()
            .await
            .map_err(|e| PipelineError::resource(format!("Cannot spool upload: {e}")))?;
        drop(file);

        info!(file_name = %file_name, size_bytes = size, "Upload received");
        metrics::record_upload_bytes(size);

        let request = UploadRequest::from_path(file_name, size, spool.path());
        let result = state.pipeline.process(request).await?;

        return Ok(Json(UploadResponse::from(result)));
    }

    Err(ApiError::bad_request("No file uploaded"))
}
