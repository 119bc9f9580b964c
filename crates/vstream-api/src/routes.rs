//! API routes.

use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;

use crate::error::hide_error_details;
use crate::handlers::{health, play_file, play_info, ready, upload_video};
use crate::metrics::metrics_middleware;
use crate::middleware::{cors_layer, request_id, request_logging};
use crate::state::AppState;

/// Create the API router.
pub fn create_router(state: AppState, metrics_handle: Option<PrometheusHandle>) -> Router {
    hide_error_details(state.config.is_production());

    // Uploads run the whole pipeline, so they get no request timeout
    let upload_routes = Router::new()
        .route("/upload/video", post(upload_video))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(state.config.max_body_size));

    let play_routes = Router::new()
        .route("/play/:date/:video/info", get(play_info))
        .route("/play/:date/:video/:file", get(play_file))
        .layer(TimeoutLayer::new(state.config.request_timeout));

    let api_routes = Router::new().merge(upload_routes).merge(play_routes);

    let mut router = Router::new()
        .route("/health", get(health))
        .route("/ready", get(ready))
        .nest("/api", api_routes);

    if let Some(handle) = metrics_handle {
        router = router.merge(
            Router::new().route("/metrics", get(move || async move { handle.render() })),
        );
    }

    router
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(request_id))
        .layer(middleware::from_fn(request_logging))
        .layer(cors_layer(&state.config.cors_origins))
        .with_state(state)
}
