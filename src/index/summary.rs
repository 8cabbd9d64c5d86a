//! Per-file index row

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Cheap summary of one log file
///
/// Only produced for files where at least one sampled line matched the
/// format, so `min_ts <= max_ts` always holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSummary {
    #[serde(rename = "file")]
    pub path: PathBuf,
    pub size_bytes: u64,
    #[serde(rename = "n_lines")]
    pub line_count: u64,
    pub min_ts: i64,
    pub max_ts: i64,
}

impl FileSummary {
    /// Whether this file lies entirely inside `[start, end]`
    ///
    /// Absent bounds are unbounded. A file straddling a bound does not
    /// qualify.
    pub fn is_covered_by(&self, start: Option<i64>, end: Option<i64>) -> bool {
        start.map_or(true, |s| self.min_ts >= s) && end.map_or(true, |e| self.max_ts <= e)
    }

    /// Ordering key used for replay: `(min_ts, max_ts, path)`
    pub fn replay_key(&self) -> (i64, i64, &PathBuf) {
        (self.min_ts, self.max_ts, &self.path)
    }
}
