//! Logservatory Ingestion
//!
//! Moves log lines into the bounded backing store:
//!
//! - **buffer**: Parsed records waiting for the next flush
//! - **pipeline**: Decode, parse, flush, evict and query scheduling
//! - **historical**: Replay of indexed files chosen by a selection window
//! - **live**: Stream from standard input with a query timer
//!
//! # Data Flow
//!
//! ```text
//! historical: index rows → select_files → read lines ─┐
//!                                                      ├→ Pipeline → BackingStore
//! live:       stdin lines ────────────────────────────┘        ↓
//!                                                          query<i>.csv
//! ```

pub mod buffer;
pub mod historical;
pub mod live;
pub mod pipeline;

pub use buffer::{FlushTrigger, IngestBuffer};
pub use historical::{replay_files, run_historical};
pub use live::{run_live, END_OF_TRANSMISSION};
pub use pipeline::{Pipeline, QueryCadence, RunSchedule};

use crate::parser::ParserError;
use crate::query::QueryError;
use crate::storage::StorageError;
use thiserror::Error;

/// Errors that end an ingestion run
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Query error: {0}")]
    Query(#[from] QueryError),

    #[error("Parser error: {0}")]
    Parser(#[from] ParserError),

    /// The same batch failed to insert twice
    #[error("Insert of {records} records failed after retry: {source}")]
    InsertFailed {
        records: usize,
        #[source]
        source: StorageError,
    },
}

/// Counters reported at the end of a run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunStats {
    pub files_selected: u64,
    pub files_replayed: u64,
    pub files_skipped: u64,
    pub lines_read: u64,
    pub bytes_read: u64,
    /// Lines that did not match the format
    pub lines_skipped: u64,
    pub records_inserted: u64,
    pub flushes: u64,
    pub evictions: u64,
    pub query_runs: u64,
    /// Query runs fired by the live timer
    pub periodic_query_runs: u64,
    /// Wall-clock time from pipeline creation to the end of the run
    pub elapsed: std::time::Duration,
}

impl std::fmt::Display for RunStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.files_selected > 0 {
            write!(
                f,
                "{} of {} files replayed ({} skipped), ",
                self.files_replayed, self.files_selected, self.files_skipped
            )?;
        }
        write!(
            f,
            "{} lines read ({} unparsed), {} records inserted in {} flushes, {} evictions, {} query runs",
            self.lines_read,
            self.lines_skipped,
            self.records_inserted,
            self.flushes,
            self.evictions,
            self.query_runs
        )?;
        if !self.elapsed.is_zero() {
            write!(f, " in {:.1}s", self.elapsed.as_secs_f64())?;
        }
        Ok(())
    }
}
