//! Playback handlers.
//!
//! Playlists and segments are served straight from the object store; these
//! routes only redirect to the public object URL.

use axum::extract::{Path, State};
use axum::response::Redirect;
use axum::Json;
use tracing::debug;
use vstream_models::{PlaybackInfo, PlaybackStatus};
use vstream_pipeline::MANIFEST_NAME;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Reject anything that is not a single plain path segment.
fn check_segment(name: &str, value: &str) -> ApiResult<()> {
    if value.is_empty() || value == "." || value == ".." || value.contains(['/', '\\']) {
        return Err(ApiError::bad_request(format!("invalid {name}")));
    }
    Ok(())
}

fn object_key(state: &AppState, date: &str, video: &str, file: &str) -> String {
    format!("{}/{}/{}/{}", state.hls_prefix(), date, video, file)
}

/// Redirect to a published playlist or segment.
pub async fn play_file(
    State(state): State<AppState>,
    Path((date, video, file)): Path<(String, String, String)>,
) -> ApiResult<Redirect> {
    check_segment("date", &date)?;
    check_segment("video name", &video)?;
    check_segment("file name", &file)?;

    let key = object_key(&state, &date, &video, &file);
    if !state.publisher().exists(state.hls_bucket(), &key).await {
        return Err(ApiError::not_found(format!("{video}/{file}")));
    }

    let url = state.publisher().public_url(state.hls_bucket(), &key);
    debug!(key = %key, "Redirecting playback request");
    Ok(Redirect::temporary(&url))
}

/// Whether a video's playlist has been published.
pub async fn play_info(
    State(state): State<AppState>,
    Path((date, video)): Path<(String, String)>,
) -> ApiResult<Json<PlaybackInfo>> {
    check_segment("date", &date)?;
    check_segment("video name", &video)?;

    let key = object_key(&state, &date, &video, MANIFEST_NAME);
    let status = if state.publisher().exists(state.hls_bucket(), &key).await {
        PlaybackStatus::Available
    } else {
        PlaybackStatus::Missing
    };

    Ok(Json(PlaybackInfo {
        playback_url: state.publisher().public_url(state.hls_bucket(), &key),
        date,
        video_name: video,
        status,
    }))
}
