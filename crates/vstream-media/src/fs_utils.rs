//! Filesystem utilities for transcoder output.

use std::path::{Path, PathBuf};

use tokio::fs;

use crate::error::MediaResult;

/// List every regular file below `dir`, recursively, in sorted order.
pub async fn list_files_recursive(dir: impl AsRef<Path>) -> MediaResult<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut pending = vec![dir.as_ref().to_path_buf()];

    while let Some(current) = pending.pop() {
        let mut entries = fs::read_dir(&current).await?;
        while let Some(entry) = entries.next_entry().await? {
            let file_type = entry.file_type().await?;
            if file_type.is_dir() {
                pending.push(entry.path());
            } else if file_type.is_file() {
                files.push(entry.path());
            }
        }
    }

    files.sort();
    Ok(files)
}

/// Final path component as UTF-8, if it has one.
pub fn file_name_str(path: &Path) -> Option<&str> {
    path.file_name().and_then(|n| n.to_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_lists_nested_files_sorted() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("b.ts"), b"b").await.unwrap();
        fs::write(dir.path().join("a.ts"), b"a").await.unwrap();
        fs::create_dir(dir.path().join("sub")).await.unwrap();
        fs::write(dir.path().join("sub").join("c.ts"), b"c").await.unwrap();

        let files = list_files_recursive(dir.path()).await.unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.strip_prefix(dir.path()).unwrap().to_path_buf())
            .collect();

        assert_eq!(
            names,
            vec![
                PathBuf::from("a.ts"),
                PathBuf::from("b.ts"),
                PathBuf::from("sub").join("c.ts"),
            ]
        );
    }

    #[tokio::test]
    async fn test_empty_directory() {
        let dir = TempDir::new().unwrap();
        assert!(list_files_recursive(dir.path()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_directory_errors() {
        let dir = TempDir::new().unwrap();
        assert!(list_files_recursive(dir.path().join("nope")).await.is_err());
    }
}
