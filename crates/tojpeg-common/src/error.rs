use std::path::PathBuf;

/// Unified error type for all tojpeg operations
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Invalid file path: {0}")]
    InvalidPath(PathBuf),

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Output folder unusable ({path}): {reason}")]
    OutputDir { path: PathBuf, reason: String },

    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    #[error("Destination already exists: {0}")]
    AlreadyExists(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image processing error: {0}")]
    ImageError(#[from] image::ImageError),

    #[error("Invalid color: {0}")]
    InvalidColor(String),

    #[error("JPEG encoding failed: {0}")]
    Encode(String),

    #[error("No files to convert")]
    EmptyJob,

    #[error("Conversion failed: {0}")]
    ConversionError(String),

    #[error("Conversion cancelled")]
    Cancelled,
}

impl Error {
    /// Whether the input was never a candidate for conversion.
    /// Such files are reported as skipped rather than failed.
    pub fn is_unsupported(&self) -> bool {
        match self {
            Self::UnsupportedFormat(_) => true,
            Self::ImageError(image::ImageError::Unsupported(_)) => true,
            _ => false,
        }
    }

    /// Map an I/O error on `path` to the most specific variant.
    pub fn from_io(err: std::io::Error, path: impl Into<PathBuf>) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::FileNotFound(path.into()),
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.into()),
            std::io::ErrorKind::AlreadyExists => Self::AlreadyExists(path.into()),
            _ => Self::Io(err),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
