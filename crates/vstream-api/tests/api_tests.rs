//! Router tests over the local object store and a stand-in transcoder.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use chrono::NaiveDate;
use tempfile::TempDir;
use tower::ServiceExt;
use vstream_api::{create_router, ApiConfig, AppState};
use vstream_media::{MediaResult, TranscodeOutcome, TranscodeProfile, Transcoder};
use vstream_models::MediaMetadata;
use vstream_pipeline::{Pipeline, PipelineConfig, RetryConfig, UploadConfig, WorkspaceManager, MANIFEST_NAME};
use vstream_storage::{LocalObjectStore, Publisher};

const BOUNDARY: &str = "vstream-test-boundary";

struct StubTranscoder {
    profile: TranscodeProfile,
}

#[async_trait]
impl Transcoder for StubTranscoder {
    async fn probe(&self, _input: &Path) -> MediaResult<MediaMetadata> {
        Ok(MediaMetadata::default())
    }

    async fn transcode(&self, _input: &Path, output_dir: &Path) -> MediaResult<TranscodeOutcome> {
        let segment = output_dir.join("index0.ts");
        std::fs::write(&segment, b"segment")?;
        let manifest = output_dir.join(MANIFEST_NAME);
        std::fs::write(&manifest, "#EXTM3U\n#EXTINF:4.0,\nindex0.ts\n#EXT-X-ENDLIST\n")?;
        Ok(TranscodeOutcome {
            metadata: MediaMetadata {
                duration_seconds: 4.0,
                resolution: "640x360".to_string(),
                codec: "h264".to_string(),
            },
            manifest,
            segments: vec![segment],
        })
    }

    fn profile(&self) -> &TranscodeProfile {
        &self.profile
    }
}

struct TestApp {
    _dir: TempDir,
    work_root: PathBuf,
    router: Router,
    publisher: Publisher,
}

async fn app() -> TestApp {
    let dir = TempDir::new().unwrap();
    let work_root = dir.path().join("work");
    let config = PipelineConfig {
        upload: UploadConfig {
            max_file_size: 64 * 1024,
            temp_path: work_root.clone(),
            ..Default::default()
        },
        ..Default::default()
    };

    let store = LocalObjectStore::new(dir.path().join("objects")).await.unwrap();
    let publisher = Publisher::new(Arc::new(store), "http://minio:9000");
    let workspaces = WorkspaceManager::init(&config.upload.temp_path, RetryConfig::new("cleanup"))
        .await
        .unwrap();

    let pipeline = Pipeline::new(
        config,
        Arc::new(StubTranscoder {
            profile: TranscodeProfile::default(),
        }),
        publisher.clone(),
        workspaces,
    )
    .with_clock(|| NaiveDate::from_ymd_opt(2024, 5, 1).unwrap());

    let state = AppState::new(ApiConfig::default().with_upload_limit(64 * 1024), pipeline);

    TestApp {
        _dir: dir,
        work_root,
        router: create_router(state, None),
        publisher,
    }
}

fn multipart(file_name: &str, content: &[u8]) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri("/api/upload/video")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn entries(dir: &Path) -> usize {
    std::fs::read_dir(dir).map(|d| d.count()).unwrap_or(0)
}

async fn json(response: axum::response::Response) -> serde_json::Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_health() {
    let app = app().await;
    let response = app.router.oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json(response).await["status"], "healthy");
}

#[tokio::test]
async fn test_ready_creates_hls_bucket() {
    let app = app().await;
    let response = app.router.oneshot(get("/ready")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(app.publisher.store().bucket_exists("video-hls").await.unwrap());
}

#[tokio::test]
async fn test_upload_then_play() {
    let app = app().await;

    let response = app
        .router
        .clone()
        .oneshot(multipart("clip.mp4", &[0u8; 1024]))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json(response).await;
    assert_eq!(
        body["playbackUrl"],
        "http://localhost:8000/api/play/2024-05-01/clip/index.m3u8"
    );
    assert_eq!(body["hlsFilesCount"], 2);
    assert_eq!(body["codec"], "h264");

    let response = app
        .router
        .clone()
        .oneshot(get("/api/play/2024-05-01/clip/index.m3u8"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(
        response.headers()[header::LOCATION],
        "http://minio:9000/video-hls/hls/2024-05-01/clip/index.m3u8"
    );

    let response = app
        .router
        .oneshot(get("/api/play/2024-05-01/clip/info"))
        .await
        .unwrap();
    assert_eq!(json(response).await["status"], "available");
}

#[tokio::test]
async fn test_upload_rejects_text_file() {
    let app = app().await;

    let response = app
        .router
        .oneshot(multipart("notes.txt", b"hello"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json(response).await["kind"], "validation");
    assert_eq!(entries(&app.work_root), 0);
    assert!(!app.publisher.store().bucket_exists("video-raw").await.unwrap());
}

#[tokio::test]
async fn test_upload_rejects_oversize_while_streaming() {
    let app = app().await;

    let response = app
        .router
        .oneshot(multipart("big.mp4", &vec![0u8; 65 * 1024]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json(response).await;
    assert_eq!(body["kind"], "validation");
    assert!(body["message"].as_str().unwrap().contains("MB"));
    assert_eq!(entries(&app.work_root), 0);
}

#[tokio::test]
async fn test_play_missing_is_404() {
    let app = app().await;

    let response = app
        .router
        .clone()
        .oneshot(get("/api/play/2024-05-01/nothing/index.m3u8"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .router
        .oneshot(get("/api/play/2024-05-01/nothing/info"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json(response).await["status"], "missing");
}
