//! API error types.

use std::sync::atomic::{AtomicBool, Ordering};

use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;
use vstream_models::{ErrorKind, FailureResponse};
use vstream_pipeline::PipelineError;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

impl ApiError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Pipeline(e) => match e.kind() {
                ErrorKind::Validation => StatusCode::BAD_REQUEST,
                ErrorKind::Resource => StatusCode::SERVICE_UNAVAILABLE,
                ErrorKind::Transcode => StatusCode::INTERNAL_SERVER_ERROR,
                ErrorKind::Publish => StatusCode::BAD_GATEWAY,
            },
        }
    }
}

impl From<MultipartError> for ApiError {
    fn from(e: MultipartError) -> Self {
        Self::BadRequest(e.body_text())
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    detail: String,
}

static HIDE_DETAILS: AtomicBool = AtomicBool::new(false);

/// Hide infrastructure details in error bodies. Set from
/// [`ApiConfig::is_production`](crate::ApiConfig::is_production) when the router is built.
pub fn hide_error_details(hide: bool) {
    HIDE_DETAILS.store(hide, Ordering::Relaxed);
}

fn is_production() -> bool {
    HIDE_DETAILS.load(Ordering::Relaxed)
}

/// Message returned to the caller for a pipeline failure.
fn pipeline_message(e: &PipelineError, hide_details: bool) -> String {
    match e.kind() {
        ErrorKind::Resource | ErrorKind::Publish if hide_details => {
            "The service is temporarily unavailable".to_string()
        }
        _ => e.to_string(),
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        match self {
            ApiError::Pipeline(e) => {
                let kind = e.kind();
                // Don't expose infrastructure details in production
                let message = pipeline_message(&e, is_production());
                (status, Json(FailureResponse::new(kind, message))).into_response()
            }
            ApiError::Internal(_) if is_production() => (
                status,
                Json(ErrorResponse {
                    detail: "An internal error occurred".to_string(),
                }),
            )
                .into_response(),
            other => (
                status,
                Json(ErrorResponse {
                    detail: other.to_string(),
                }),
            )
                .into_response(),
        }
    }
}
