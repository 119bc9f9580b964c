//! Upload request models.

use std::path::PathBuf;

use bytes::Bytes;

/// Where the uploaded bytes currently live.
#[derive(Debug, Clone)]
pub enum UploadSource {
    /// Fully buffered request body
    Bytes(Bytes),
    /// File already spooled to disk by the caller
    Path(PathBuf),
}

/// A single uploaded video handed to the pipeline.
///
/// Transient: owned by one pipeline run and dropped when it finishes.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    /// File name as declared by the client (unsanitized)
    pub original_file_name: String,
    /// Declared size in bytes
    pub declared_size: u64,
    /// Byte source
    pub source: UploadSource,
}

impl UploadRequest {
    /// Build a request from an in-memory body; the declared size is the body length.
    pub fn from_bytes(original_file_name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        let data = data.into();
        Self {
            original_file_name: original_file_name.into(),
            declared_size: data.len() as u64,
            source: UploadSource::Bytes(data),
        }
    }

    /// Build a request from a file already on disk.
    pub fn from_path(
        original_file_name: impl Into<String>,
        declared_size: u64,
        path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            original_file_name: original_file_name.into(),
            declared_size,
            source: UploadSource::Path(path.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_bytes_declares_length() {
        let req = UploadRequest::from_bytes("clip.mp4", vec![0u8; 42]);
        assert_eq!(req.declared_size, 42);
        assert!(matches!(req.source, UploadSource::Bytes(ref b) if b.len() == 42));
    }
}
