//! End-to-end pipeline runs against a fake transcoder and the local object store.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use tempfile::TempDir;
use vstream_media::{
    MediaError, MediaResult, TranscodeOutcome, TranscodeProfile, Transcoder, MANIFEST_NAME,
};
use vstream_models::{ErrorKind, MediaMetadata, UploadRequest};
use vstream_pipeline::{
    DirRemover, FsRemover, Pipeline, PipelineConfig, PipelineError, RetryConfig, UploadConfig,
    WorkspaceManager,
};
use vstream_storage::{
    LocalObjectStore, ObjectStat, ObjectStore, Publisher, StorageError, StorageResult,
};

const PUBLIC_BASE: &str = "http://store";

#[derive(Clone, Copy)]
enum Behavior {
    Segments(usize),
    ExitCode(i32),
    UnreferencedSegment,
    Timeout,
    Hang,
}

struct FakeTranscoder {
    behavior: Behavior,
    profile: TranscodeProfile,
    calls: AtomicUsize,
}

impl FakeTranscoder {
    fn new(behavior: Behavior) -> Arc<Self> {
        Arc::new(Self {
            behavior,
            profile: TranscodeProfile::default(),
            calls: AtomicUsize::new(0),
        })
    }

    fn metadata() -> MediaMetadata {
        MediaMetadata {
            duration_seconds: 25.5,
            resolution: "1280x720".to_string(),
            codec: "h264".to_string(),
        }
    }
}

#[async_trait]
impl Transcoder for FakeTranscoder {
    async fn probe(&self, _input: &Path) -> MediaResult<MediaMetadata> {
        Ok(Self::metadata())
    }

    async fn transcode(&self, input: &Path, output_dir: &Path) -> MediaResult<TranscodeOutcome> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        assert!(input.is_file(), "upload was not saved before transcoding");

        let count = match self.behavior {
            Behavior::ExitCode(code) => {
                return Err(MediaError::ffmpeg_failed(
                    format!("FFmpeg exited with code {code}"),
                    Some("in.mp4: Invalid data found when processing input".to_string()),
                    Some(code),
                ))
            }
            Behavior::Timeout => return Err(MediaError::Timeout(3600)),
            Behavior::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                return Err(MediaError::Timeout(3600));
            }
            Behavior::Segments(n) => n,
            Behavior::UnreferencedSegment => 2,
        };

        let mut playlist = String::from("#EXTM3U\n#EXT-X-VERSION:3\n#EXT-X-TARGETDURATION:10\n");
        let mut segments = Vec::new();
        for i in 0..count {
            let name = format!("index{i}.ts");
            std::fs::write(output_dir.join(&name), vec![i as u8; 16])?;
            segments.push(output_dir.join(&name));
            if matches!(self.behavior, Behavior::UnreferencedSegment) && i == count - 1 {
                continue;
            }
            playlist.push_str(&format!("#EXTINF:10.0,\n{name}\n"));
        }
        playlist.push_str("#EXT-X-ENDLIST\n");

        let manifest = output_dir.join(MANIFEST_NAME);
        std::fs::write(&manifest, playlist)?;

        Ok(TranscodeOutcome {
            metadata: Self::metadata(),
            manifest,
            segments,
        })
    }

    fn profile(&self) -> &TranscodeProfile {
        &self.profile
    }
}

/// Local store that refuses segment uploads.
struct SegmentRejectingStore {
    inner: LocalObjectStore,
}

#[async_trait]
impl ObjectStore for SegmentRejectingStore {
    async fn bucket_exists(&self, bucket: &str) -> StorageResult<bool> {
        self.inner.bucket_exists(bucket).await
    }

    async fn create_bucket(&self, bucket: &str) -> StorageResult<()> {
        self.inner.create_bucket(bucket).await
    }

    async fn put_file(
        &self,
        bucket: &str,
        key: &str,
        path: &Path,
        content_type: &str,
    ) -> StorageResult<()> {
        if key.ends_with(".ts") {
            return Err(StorageError::upload_failed("storage full"));
        }
        self.inner.put_file(bucket, key, path, content_type).await
    }

    async fn stat_object(&self, bucket: &str, key: &str) -> StorageResult<ObjectStat> {
        self.inner.stat_object(bucket, key).await
    }

    fn backend_name(&self) -> &'static str {
        "rejecting"
    }
}

/// Counts destroy calls per workspace path.
#[derive(Default)]
struct CountingRemover {
    calls: std::sync::Mutex<Vec<PathBuf>>,
}

#[async_trait]
impl DirRemover for CountingRemover {
    async fn remove_dir_all(&self, path: &Path) -> io::Result<()> {
        self.calls.lock().unwrap().push(path.to_path_buf());
        FsRemover.remove_dir_all(path).await
    }
}

struct Harness {
    _dir: TempDir,
    workspace_root: PathBuf,
    store_root: PathBuf,
    remover: Arc<CountingRemover>,
    pipeline: Pipeline,
}

async fn harness(transcoder: Arc<FakeTranscoder>, reject_segments: bool) -> Harness {
    let dir = TempDir::new().unwrap();
    let workspace_root = dir.path().join("work");
    let store_root = dir.path().join("objects");

    let config = PipelineConfig {
        upload: UploadConfig {
            max_file_size: 1024 * 1024,
            temp_path: workspace_root.clone(),
            ..Default::default()
        },
        publish_concurrency: 2,
        ..Default::default()
    };

    let local = LocalObjectStore::new(&store_root).await.unwrap();
    let store: Arc<dyn ObjectStore> = if reject_segments {
        Arc::new(SegmentRejectingStore { inner: local })
    } else {
        Arc::new(local)
    };

    let remover = Arc::new(CountingRemover::default());
    let workspaces = WorkspaceManager::init(
        &workspace_root,
        RetryConfig::new("workspace_cleanup").with_base_delay(Duration::from_millis(1)),
    )
    .await
    .unwrap()
    .with_remover(remover.clone());

    let pipeline = Pipeline::new(
        config,
        transcoder,
        Publisher::new(store, PUBLIC_BASE),
        workspaces,
    )
    .with_clock(|| NaiveDate::from_ymd_opt(2024, 5, 1).unwrap());

    Harness {
        _dir: dir,
        workspace_root,
        store_root,
        remover,
        pipeline,
    }
}

fn entries(dir: &Path) -> usize {
    std::fs::read_dir(dir).map(|d| d.count()).unwrap_or(0)
}

#[tokio::test]
async fn test_successful_run_publishes_everything() {
    let transcoder = FakeTranscoder::new(Behavior::Segments(3));
    let h = harness(transcoder, false).await;

    let result = h
        .pipeline
        .process(UploadRequest::from_bytes("clip.mp4", vec![7u8; 4096]))
        .await
        .unwrap();

    assert_eq!(result.segment_count, 3);
    assert_eq!(result.published_files, 4);
    assert_eq!(result.duration_seconds, 25.5);
    assert_eq!(result.resolution, "1280x720");
    assert_eq!(result.codec, "h264");
    assert_eq!(result.original_file_name, "clip.mp4");
    assert!(result.playback_url.ends_with("/api/play/2024-05-01/clip/index.m3u8"));

    assert!(h.store_root.join("video-raw/2024-05-01/clip.mp4").is_file());
    let hls_dir = h.store_root.join("video-hls/hls/2024-05-01/clip");
    for i in 0..3 {
        assert!(hls_dir.join(format!("index{i}.ts")).is_file());
    }

    let manifest = std::fs::read_to_string(hls_dir.join(MANIFEST_NAME)).unwrap();
    let base = format!("{PUBLIC_BASE}/video-hls/hls/2024-05-01/clip/");
    let references: Vec<&str> = manifest.lines().filter(|l| !l.starts_with('#')).collect();
    assert_eq!(references.len(), 3);
    for (i, line) in references.iter().enumerate() {
        assert_eq!(*line, format!("{base}index{i}.ts"));
    }

    assert_eq!(entries(&h.workspace_root), 0);
    assert_eq!(h.remover.calls.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_unsupported_extension_has_no_side_effects() {
    let transcoder = FakeTranscoder::new(Behavior::Segments(1));
    let h = harness(transcoder.clone(), false).await;

    let err = h
        .pipeline
        .process(UploadRequest::from_bytes("notes.txt", b"hello".to_vec()))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(transcoder.calls.load(Ordering::SeqCst), 0);
    assert_eq!(entries(&h.workspace_root), 0);
    assert_eq!(entries(&h.store_root), 0);
    assert!(h.remover.calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_oversize_upload_is_rejected() {
    let transcoder = FakeTranscoder::new(Behavior::Segments(1));
    let h = harness(transcoder, false).await;

    let err = h
        .pipeline
        .process(UploadRequest::from_bytes("clip.mp4", vec![0u8; 2 * 1024 * 1024]))
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::Validation(ref m) if m.contains("1 MB")));
    assert_eq!(entries(&h.workspace_root), 0);
}

#[tokio::test]
async fn test_transcoder_failure_keeps_diagnostics_and_cleans_up() {
    let transcoder = FakeTranscoder::new(Behavior::ExitCode(1));
    let h = harness(transcoder, false).await;

    let err = h
        .pipeline
        .process(UploadRequest::from_bytes("clip.mp4", vec![1u8; 128]))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Transcode);
    assert!(err.diagnostics().unwrap().contains("Invalid data found"));
    assert_eq!(entries(&h.workspace_root), 0);
    assert_eq!(h.remover.calls.lock().unwrap().len(), 1);
    assert_eq!(entries(&h.store_root), 0);
}

#[tokio::test]
async fn test_publish_failure_is_terminal_and_cleans_up() {
    let transcoder = FakeTranscoder::new(Behavior::Segments(2));
    let h = harness(transcoder, true).await;

    let err = h
        .pipeline
        .process(UploadRequest::from_bytes("clip.mp4", vec![1u8; 128]))
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::Publish(StorageError::UploadFailed(_))));
    assert_eq!(entries(&h.workspace_root), 0);
    assert_eq!(h.remover.calls.lock().unwrap().len(), 1);
    assert!(!h
        .store_root
        .join("video-hls/hls/2024-05-01/clip")
        .join(MANIFEST_NAME)
        .exists());
}

#[tokio::test]
async fn test_unreferenced_segment_fails_vod_run() {
    let transcoder = FakeTranscoder::new(Behavior::UnreferencedSegment);
    let h = harness(transcoder, false).await;

    let err = h
        .pipeline
        .process(UploadRequest::from_bytes("clip.mp4", vec![1u8; 128]))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        PipelineError::Transcode(MediaError::InconsistentOutput(_))
    ));
    assert_eq!(entries(&h.workspace_root), 0);
}

#[tokio::test]
async fn test_concurrent_runs_use_distinct_workspaces() {
    let transcoder = FakeTranscoder::new(Behavior::Segments(2));
    let h = harness(transcoder, false).await;

    let (a, b) = tokio::join!(
        h.pipeline
            .process(UploadRequest::from_bytes("first.mp4", vec![1u8; 64])),
        h.pipeline
            .process(UploadRequest::from_bytes("second.mp4", vec![2u8; 64])),
    );

    assert!(a.unwrap().playback_url.contains("/first/"));
    assert!(b.unwrap().playback_url.contains("/second/"));

    let calls = h.remover.calls.lock().unwrap();
    assert_eq!(calls.len(), 2);
    assert_ne!(calls[0], calls[1]);
    assert_eq!(entries(&h.workspace_root), 0);
}

#[tokio::test]
async fn test_dot_stem_names_are_rejected() {
    let transcoder = FakeTranscoder::new(Behavior::Segments(1));
    let h = harness(transcoder.clone(), false).await;

    for name in ["..mp4", "...mp4"] {
        let err = h
            .pipeline
            .process(UploadRequest::from_bytes(name, vec![1u8; 64]))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation, "{name}");
    }

    assert_eq!(transcoder.calls.load(Ordering::SeqCst), 0);
    assert_eq!(entries(&h.workspace_root), 0);
    assert_eq!(entries(&h.store_root), 0);
}

#[tokio::test]
async fn test_transcoder_timeout_is_transcode_error() {
    let transcoder = FakeTranscoder::new(Behavior::Timeout);
    let h = harness(transcoder, false).await;

    let err = h
        .pipeline
        .process(UploadRequest::from_bytes("clip.mp4", vec![1u8; 128]))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Transcode);
    assert!(matches!(err, PipelineError::Transcode(MediaError::Timeout(3600))));
    assert_eq!(entries(&h.workspace_root), 0);
    assert_eq!(h.remover.calls.lock().unwrap().len(), 1);
    assert_eq!(entries(&h.store_root), 0);
}

#[tokio::test]
async fn test_missing_workspace_root_is_resource_error() {
    let transcoder = FakeTranscoder::new(Behavior::Segments(1));
    let h = harness(transcoder.clone(), false).await;
    std::fs::remove_dir(&h.workspace_root).unwrap();

    let err = h
        .pipeline
        .process(UploadRequest::from_bytes("clip.mp4", vec![1u8; 128]))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Resource);
    assert_eq!(transcoder.calls.load(Ordering::SeqCst), 0);
    assert!(h.remover.calls.lock().unwrap().is_empty());
    assert_eq!(entries(&h.store_root), 0);
}

#[tokio::test]
async fn test_cancelled_run_removes_workspace() {
    let transcoder = FakeTranscoder::new(Behavior::Hang);
    let h = harness(transcoder.clone(), false).await;

    let run = h
        .pipeline
        .process(UploadRequest::from_bytes("clip.mp4", vec![1u8; 128]));
    assert!(tokio::time::timeout(Duration::from_millis(200), run)
        .await
        .is_err());
    assert_eq!(transcoder.calls.load(Ordering::SeqCst), 1);

    for _ in 0..100 {
        if entries(&h.workspace_root) == 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(entries(&h.workspace_root), 0);
    assert_eq!(h.remover.calls.lock().unwrap().len(), 1);
}
