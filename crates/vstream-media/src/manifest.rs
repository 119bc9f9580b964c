//! HLS playlist rewriting.
//!
//! FFmpeg writes segment references relative to the playlist. Before the
//! playlist is published every reference is prefixed with the public URL
//! of the directory the segments are uploaded to.
//!
//! A line is treated as a segment reference when it does not start with `#`
//! and ends in [`SEGMENT_EXTENSION`]. Rewriting is not idempotent: running it
//! twice prefixes the references twice, so call it once per produced playlist.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{MediaError, MediaResult};
use crate::fs_utils::file_name_str;

/// Extension of media segments produced by the HLS muxer.
pub const SEGMENT_EXTENSION: &str = ".ts";

/// Result of rewriting one playlist.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManifestRewrite {
    /// Playlist text after rewriting
    pub content: String,
    /// Original (relative) segment references, in playlist order
    pub references: Vec<String>,
}

/// Whether a playlist line (without terminator) references a segment.
pub fn is_segment_reference(line: &str) -> bool {
    !line.starts_with('#') && line.ends_with(SEGMENT_EXTENSION)
}

/// Prefix every segment reference in `content` with `public_base_url`.
///
/// Directive lines, blank lines, ordering and line terminators are preserved.
pub fn rewrite_manifest_text(content: &str, public_base_url: &str) -> ManifestRewrite {
    let base = public_base_url.trim_end_matches('/');
    let mut rewritten = String::with_capacity(content.len());
    let mut references = Vec::new();

    for raw in content.split_inclusive('\n') {
        let (line, terminator) = split_terminator(raw);

        if is_segment_reference(line) {
            rewritten.push_str(base);
            rewritten.push('/');
            rewritten.push_str(line);
            references.push(line.to_string());
        } else {
            rewritten.push_str(line);
        }
        rewritten.push_str(terminator);
    }

    ManifestRewrite {
        content: rewritten,
        references,
    }
}

/// Rewrite the playlist at `path` in place.
pub async fn rewrite_manifest(
    path: impl AsRef<Path>,
    public_base_url: &str,
) -> MediaResult<ManifestRewrite> {
    let path = path.as_ref();
    let content = tokio::fs::read_to_string(path).await?;

    let rewrite = rewrite_manifest_text(&content, public_base_url);
    tokio::fs::write(path, &rewrite.content).await?;

    debug!(
        manifest = %path.display(),
        references = rewrite.references.len(),
        "Rewrote playlist segment references"
    );

    Ok(rewrite)
}

/// Check playlist references against the segment files that were produced.
///
/// A reference to a file that was not produced is always an error, as is a
/// segment referenced more than once. With `require_all` (VOD playlists)
/// every produced segment must also be referenced.
pub fn verify_references(
    references: &[String],
    segments: &[PathBuf],
    require_all: bool,
) -> MediaResult<()> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for reference in references {
        let name = reference.rsplit('/').next().unwrap_or(reference);
        *counts.entry(name).or_default() += 1;
    }

    let produced: Vec<&str> = segments
        .iter()
        .filter_map(|p| file_name_str(p))
        .filter(|name| name.ends_with(SEGMENT_EXTENSION))
        .collect();

    for (name, count) in &counts {
        if !produced.contains(name) {
            return Err(MediaError::inconsistent(format!(
                "playlist references {} which was not produced",
                name
            )));
        }
        if *count > 1 {
            return Err(MediaError::inconsistent(format!(
                "playlist references {} {} times",
                name, count
            )));
        }
    }

    if require_all {
        if let Some(missing) = produced.iter().find(|name| !counts.contains_key(*name)) {
            return Err(MediaError::inconsistent(format!(
                "segment {} is not referenced by the playlist",
                missing
            )));
        }
    } else {
        let unreferenced = produced.iter().filter(|n| !counts.contains_key(*n)).count();
        if unreferenced > 0 {
            debug!(unreferenced, "Segments outside the live playlist window");
        }
    }

    Ok(())
}

fn split_terminator(raw: &str) -> (&str, &str) {
    if let Some(line) = raw.strip_suffix("\r\n") {
        (line, "\r\n")
    } else if let Some(line) = raw.strip_suffix('\n') {
        (line, "\n")
    } else {
        (raw, "")
    }
}
