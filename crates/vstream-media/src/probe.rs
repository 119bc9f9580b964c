//! Media metadata from FFmpeg's diagnostic output.
//!
//! `ffmpeg -i <file>` without an output prints the container and stream
//! summary on stderr and exits non-zero, so the exit status is ignored here.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;
use vstream_models::{MediaMetadata, UNKNOWN};

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};

static DURATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Duration: (\d+):(\d+):(\d+\.\d+)").expect("duration pattern is valid")
});

static RESOLUTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(\d{3,4}x\d{3,4})\b").expect("resolution pattern is valid")
});

static CODEC_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Video: (\w+)").expect("codec pattern is valid"));

/// Probe a media file for duration, resolution and codec.
pub async fn probe_media(runner: &FfmpegRunner, path: impl AsRef<Path>) -> MediaResult<MediaMetadata> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(MediaError::FileNotFound(path.to_path_buf()));
    }

    let output = runner.output(&FfmpegCommand::probe(path)).await?;
    if !output.success {
        debug!(
            exit_code = ?output.exit_code,
            "Probe exited non-zero, parsing diagnostics anyway"
        );
    }

    Ok(parse_diagnostics(&output.stderr))
}

/// Parse all three fields; each falls back independently.
pub fn parse_diagnostics(text: &str) -> MediaMetadata {
    MediaMetadata {
        duration_seconds: parse_duration(text),
        resolution: parse_resolution(text),
        codec: parse_codec(text),
    }
}

/// `Duration: HH:MM:SS.ff` in seconds, or `0.0` when absent.
pub fn parse_duration(text: &str) -> f64 {
    let Some(caps) = DURATION_RE.captures(text) else {
        return 0.0;
    };

    let hours: f64 = caps[1].parse().unwrap_or(0.0);
    let minutes: f64 = caps[2].parse().unwrap_or(0.0);
    let seconds: f64 = caps[3].parse().unwrap_or(0.0);

    hours * 3600.0 + minutes * 60.0 + seconds
}

/// First `WIDTHxHEIGHT` token, or [`UNKNOWN`].
pub fn parse_resolution(text: &str) -> String {
    RESOLUTION_RE
        .captures(text)
        .map(|caps| caps[1].to_string())
        .unwrap_or_else(|| UNKNOWN.to_string())
}

/// First `Video: <codec>` token, or [`UNKNOWN`].
pub fn parse_codec(text: &str) -> String {
    CODEC_RE
        .captures(text)
        .map(|caps| caps[1].to_string())
        .unwrap_or_else(|| UNKNOWN.to_string())
}
