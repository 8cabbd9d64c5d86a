//! Backing store error types
//!
//! Defines all errors that can occur in the storage layer.

use thiserror::Error;

/// Errors that can occur in the backing store
#[derive(Error, Debug)]
pub enum StorageError {
    /// I/O operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// SQLite reported an error
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Record does not belong to the format the store was created for
    #[error("Record format mismatch: store holds {expected}, got {actual}")]
    FormatMismatch { expected: String, actual: String },

    /// Eviction could not bring the store back under its ceiling
    #[error(
        "Eviction failed: store is {size_bytes} bytes after draining, threshold is {threshold_bytes} bytes. Raise the memory budget"
    )]
    EvictionExhausted {
        size_bytes: u64,
        threshold_bytes: u64,
    },
}

/// Result type alias for storage operations
pub type StorageResult<T> = Result<T, StorageError>;
