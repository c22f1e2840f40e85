//! Error types for media operations.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur at the encoder boundary.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("encoder binary not found: {0}")]
    EncoderNotFound(String),

    #[error("download failed: {message}")]
    DownloadFailed { message: String },

    #[error("operation timed out after {0} seconds")]
    Timeout(u64),

    #[error("file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl MediaError {
    /// Create a download failure error.
    pub fn download_failed(message: impl Into<String>) -> Self {
        Self::DownloadFailed {
            message: message.into(),
        }
    }
}
