//! Log file index
//!
//! Cheap, approximate time coverage for a corpus of closed log files:
//!
//! - **FileIndexer**: samples the head and tail of each file for min/max timestamps
//! - **IndexStore**: the persisted CSV table of per-file summaries
//! - **select_files**: time window + sample fraction → ordered replay list
//!
//! # Architecture
//!
//! ```text
//! Index pass (once):
//!   directory → FileIndexer (size, line count, head/tail sample) → IndexStore → index.csv
//!
//! Historical run:
//!   index.csv → IndexStore::load → select_files(window) → [a.log, b.log, ...]
//! ```

pub(crate) mod indexer;
mod selector;
mod store;
mod summary;
pub mod tail;

pub use indexer::{count_lines, FileIndexer, IndexReport, DEFAULT_SAMPLE_LINES};
pub use selector::{select_files, SelectionWindow};
pub use store::IndexStore;
pub use summary::FileSummary;
pub use tail::ReverseBlockReader;

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while building or loading an index
#[derive(Error, Debug)]
pub enum IndexError {
    /// I/O operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Index file could not be opened
    #[error("Cannot open index file {path:?}: {error}. Build one with `logservatory index`")]
    Open {
        path: PathBuf,
        error: std::io::Error,
    },

    /// Index file is not valid CSV
    #[error("Malformed index file: {0}")]
    Csv(#[from] csv::Error),

    /// Input path does not exist
    #[error("Input path {0:?} does not exist")]
    NotFound(PathBuf),

    /// The same file appears twice in one index
    #[error("Duplicate index entry for {0:?}")]
    DuplicatePath(PathBuf),
}
