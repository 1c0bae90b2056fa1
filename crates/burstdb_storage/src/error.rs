//! Error types for storage operations.

use std::io;
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// No blob is stored under the requested name.
    #[error("blob not found: {0}")]
    NotFound(String),

    /// A blob is already stored under the requested name.
    #[error("blob already exists: {0}")]
    AlreadyExists(String),

    /// The name cannot be used for a blob.
    #[error("invalid blob name: {0:?}")]
    InvalidName(String),

    /// The store location is missing or unusable.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}
