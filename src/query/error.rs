//! Query error types
//!
//! Defines the error conditions of loading query definitions and running
//! them against the store.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during query operations
#[derive(Error, Debug)]
pub enum QueryError {
    /// Query definition file could not be read
    #[error("Cannot read query file {path:?}: {error}. See the documentation for the query file format")]
    Definitions { path: PathBuf, error: String },

    /// Storage layer error
    #[error("Storage error: {0}")]
    Storage(#[from] crate::storage::StorageError),

    /// A query failed twice in a row
    #[error("Query {index} failed: {source}")]
    Execution {
        index: usize,
        #[source]
        source: crate::storage::StorageError,
    },

    /// Output file could not be written
    #[error("Cannot write query output {path:?}: {error}")]
    Output { path: PathBuf, error: String },
}

/// Result type for query operations
pub type QueryResult<T> = Result<T, QueryError>;
