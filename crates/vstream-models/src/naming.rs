//! File-name helpers shared by the workspace and the object-key layout.

use thiserror::Error;

/// Errors raised while sanitizing a client-supplied file name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NamingError {
    #[error("File name is empty")]
    Empty,

    #[error("File name is not usable: {0}")]
    Unusable(String),
}

const INVALID_CHARS: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

/// Reduce a client-supplied file name to a safe single path component.
///
/// Only the final component of the name is kept (both `/` and `\` count as
/// separators), then every character that is invalid in a file name is
/// replaced with `_`. Names whose stem is `.` or `..` (such as `..mp4`)
/// are rejected because the stem becomes a key segment.
pub fn sanitize_file_name(name: &str) -> Result<String, NamingError> {
    let last = name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();

    if last.is_empty() {
        return Err(NamingError::Empty);
    }

    let cleaned: String = last
        .chars()
        .map(|c| {
            if c.is_control() || INVALID_CHARS.contains(&c) {
                '_'
            } else {
                c
            }
        })
        .collect();

    if matches!(cleaned.as_str(), "." | "..") || matches!(file_stem(&cleaned), "." | "..") {
        return Err(NamingError::Unusable(name.to_string()));
    }

    Ok(cleaned)
}

/// Lowercased extension including the leading dot, e.g. `".mp4"`.
///
/// Returns `None` for names without an extension or dotfiles like `.env`.
pub fn file_extension(name: &str) -> Option<String> {
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(format!(".{}", ext.to_lowercase()))
}

/// File name without its final extension.
pub fn file_stem(name: &str) -> &str {
    match name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => name,
    }
}
