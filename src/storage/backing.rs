//! Backing store capability
//!
//! The run loop only talks to the store through [`BackingStore`], so the
//! SQLite working set can be swapped for any engine that can insert, report
//! its size, drop its oldest data and answer queries.

use crate::parser::{FieldValue, LogRecord};
use crate::parser::timestamp::format_epoch;
use crate::storage::error::StorageResult;
use crate::storage::eviction::EvictionPolicy;

/// One result row, each cell rendered as text (SQL NULL as empty)
pub type QueryRow = Vec<String>;

/// Downstream record sink and query substrate
pub trait BackingStore {
    /// Insert a batch of records; all or nothing
    fn insert(&mut self, records: &[LogRecord]) -> StorageResult<usize>;

    /// Estimated memory footprint of the stored data
    fn estimated_size_bytes(&self) -> StorageResult<u64>;

    /// Delete the oldest stored records, returning the bytes reclaimed
    fn delete_oldest(&mut self, policy: EvictionPolicy) -> StorageResult<u64>;

    /// Run a query, binding `params` positionally
    fn execute_query(&self, sql: &str, params: &[FieldValue]) -> StorageResult<Vec<QueryRow>>;

    /// Row count, time span and size, for progress reporting
    fn stats(&self) -> StorageResult<StoreStats>;
}

/// Snapshot of the store contents
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub rows: u64,
    pub min_ts: Option<i64>,
    pub max_ts: Option<i64>,
    pub size_bytes: u64,
}

impl std::fmt::Display for StoreStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Store spans {} to {} ({} rows), memory used ~= {:.2} MB",
            self.min_ts.map(format_epoch).unwrap_or_default(),
            self.max_ts.map(format_epoch).unwrap_or_default(),
            self.rows,
            self.size_bytes as f64 / (1024.0 * 1024.0)
        )
    }
}
