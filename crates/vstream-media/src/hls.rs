//! HLS segmenting through the FFmpeg CLI.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info};
use vstream_models::MediaMetadata;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};
use crate::fs_utils::list_files_recursive;
use crate::probe::probe_media;

/// Playlist file name written inside the output directory.
pub const MANIFEST_NAME: &str = "index.m3u8";

/// Fixed HLS profile, loaded once at start-up.
#[derive(Debug, Clone)]
pub struct TranscodeProfile {
    /// FFmpeg executable
    pub ffmpeg_path: PathBuf,
    /// Target segment duration in seconds
    pub segment_seconds: u32,
    /// Playlist size; 0 keeps every segment (VOD)
    pub list_size: u32,
    /// Deadline for each FFmpeg invocation
    pub timeout: Duration,
    /// Pause after exit before reading outputs, for handles the OS has not released yet
    pub settle_delay: Duration,
}

impl Default for TranscodeProfile {
    fn default() -> Self {
        Self {
            ffmpeg_path: PathBuf::from("ffmpeg"),
            segment_seconds: 10,
            list_size: 0,
            timeout: Duration::from_secs(3600),
            settle_delay: Duration::from_millis(500),
        }
    }
}

impl TranscodeProfile {
    /// Create profile from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            ffmpeg_path: std::env::var("FFMPEG_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.ffmpeg_path),
            segment_seconds: std::env::var("HLS_TIME")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.segment_seconds),
            list_size: std::env::var("HLS_LIST_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.list_size),
            timeout: std::env::var("FFMPEG_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
            settle_delay: std::env::var("FFMPEG_SETTLE_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(defaults.settle_delay),
        }
    }

    /// Whether the playlist keeps every segment.
    pub fn is_vod(&self) -> bool {
        self.list_size == 0
    }
}

/// Files and metadata produced by one transcode.
#[derive(Debug, Clone)]
pub struct TranscodeOutcome {
    pub metadata: MediaMetadata,
    /// Generated playlist
    pub manifest: PathBuf,
    /// Every other file in the output directory, sorted
    pub segments: Vec<PathBuf>,
}

impl TranscodeOutcome {
    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }
}

/// External transcoder capability.
#[async_trait]
pub trait Transcoder: Send + Sync {
    /// Read duration, resolution and codec without producing output.
    async fn probe(&self, input: &Path) -> MediaResult<MediaMetadata>;

    /// Segment `input` into an HLS playlist inside `output_dir`.
    async fn transcode(&self, input: &Path, output_dir: &Path) -> MediaResult<TranscodeOutcome>;

    /// Profile the transcoder was configured with.
    fn profile(&self) -> &TranscodeProfile;
}

/// [`Transcoder`] backed by the FFmpeg executable.
#[derive(Debug, Clone)]
pub struct HlsTranscoder {
    profile: TranscodeProfile,
    runner: FfmpegRunner,
}

impl HlsTranscoder {
    pub fn new(profile: TranscodeProfile) -> Self {
        let runner = FfmpegRunner::new(&profile.ffmpeg_path).with_timeout(profile.timeout);
        Self { profile, runner }
    }

    /// Build the segmenting command for `input`.
    pub fn segment_command(&self, input: &Path, output_dir: &Path) -> FfmpegCommand {
        FfmpegCommand::new(input, output_dir.join(MANIFEST_NAME))
            .codec_copy()
            .hls(self.profile.segment_seconds, self.profile.list_size)
    }
}

#[async_trait]
impl Transcoder for HlsTranscoder {
    async fn probe(&self, input: &Path) -> MediaResult<MediaMetadata> {
        probe_media(&self.runner, input).await
    }

    async fn transcode(&self, input: &Path, output_dir: &Path) -> MediaResult<TranscodeOutcome> {
        tokio::fs::create_dir_all(output_dir).await?;

        let metadata = self.probe(input).await?;
        debug!(
            duration = metadata.duration_seconds,
            resolution = %metadata.resolution,
            codec = %metadata.codec,
            "Probed input"
        );

        let cmd = self.segment_command(input, output_dir);
        info!(
            input = %input.display(),
            segment_seconds = self.profile.segment_seconds,
            list_size = self.profile.list_size,
            "Segmenting to HLS"
        );
        self.runner.run(&cmd).await?;

        tokio::time::sleep(self.profile.settle_delay).await;

        let manifest = output_dir.join(MANIFEST_NAME);
        if !tokio::fs::try_exists(&manifest).await.unwrap_or(false) {
            return Err(MediaError::ManifestMissing(manifest));
        }

        let segments: Vec<PathBuf> = list_files_recursive(output_dir)
            .await?
            .into_iter()
            .filter(|p| p != &manifest)
            .collect();

        info!(segments = segments.len(), "HLS segmenting finished");

        Ok(TranscodeOutcome {
            metadata,
            manifest,
            segments,
        })
    }

    fn profile(&self) -> &TranscodeProfile {
        &self.profile
    }
}
