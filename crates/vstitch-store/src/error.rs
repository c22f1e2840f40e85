//! Storage error types.

use thiserror::Error;

/// Result type for artifact store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur while persisting or reclaiming artifacts.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to prepare artifact root {root}: {source}")]
    RootUnavailable {
        root: String,
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
