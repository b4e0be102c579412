use std::path::{Path, PathBuf};

/// Failures the upload pipeline, listing and deletion can surface.
///
/// A missing or unreadable capture timestamp is not an error: the
/// resolver degrades to the file's modification time instead of failing.
#[derive(Debug, thiserror::Error)]
pub enum GalleryError {
    /// Disallowed extension/MIME type, oversized file or batch, or an unsafe filename.
    #[error("{0}")]
    InputRejected(String),

    #[error("HEIC conversion failed for {path:?}: {reason}")]
    ConversionFailure { path: PathBuf, reason: String },

    #[error("thumbnail generation failed for {path:?}: {reason}")]
    ThumbnailFailure { path: PathBuf, reason: String },

    #[error("storage error at {path:?}: {source}")]
    StorageFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, GalleryError>;

impl GalleryError {
    pub(crate) fn storage(path: &Path, source: std::io::Error) -> Self {
        GalleryError::StorageFailure {
            path: path.to_path_buf(),
            source,
        }
    }

    pub(crate) fn conversion(path: &Path, reason: impl ToString) -> Self {
        GalleryError::ConversionFailure {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn thumbnail(path: &Path, reason: impl ToString) -> Self {
        GalleryError::ThumbnailFailure {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        }
    }

    /// Stable upper-case tag used in the operation log.
    pub fn kind(&self) -> &'static str {
        match self {
            GalleryError::InputRejected(_) => "INPUT_REJECTED",
            GalleryError::ConversionFailure { .. } => "CONVERSION_FAILURE",
            GalleryError::ThumbnailFailure { .. } => "THUMBNAIL_FAILURE",
            GalleryError::StorageFailure { .. } => "STORAGE_FAILURE",
        }
    }
}
