//! Query Scheduler
//!
//! Runs every loaded query against the backing store and writes the rows of
//! query `i` to `<output_dir>/query<i>.csv`, without a header.

use crate::storage::{BackingStore, QueryRow};
use crate::query::error::{QueryError, QueryResult};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

/// How a run treats existing output files
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Replace the file; the output is a running snapshot (live runs)
    Overwrite,
    /// Add rows to the end of the file (historical runs)
    Append,
}

/// Loaded queries plus the directory their results go to
#[derive(Debug, Clone)]
pub struct QueryScheduler {
    queries: Vec<String>,
    output_dir: PathBuf,
    runs: u64,
}

impl QueryScheduler {
    pub fn new(queries: Vec<String>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            queries,
            output_dir: output_dir.into(),
            runs: 0,
        }
    }

    pub fn queries(&self) -> &[String] {
        &self.queries
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Number of completed runs
    pub fn runs(&self) -> u64 {
        self.runs
    }

    /// Output file of query `index`
    pub fn output_path(&self, index: usize) -> PathBuf {
        self.output_dir.join(format!("query{}.csv", index))
    }

    /// Run all queries once, in file order
    pub fn run<S: BackingStore + ?Sized>(&mut self, store: &S, mode: WriteMode) -> QueryResult<()> {
        for index in 0..self.queries.len() {
            let rows = self.execute_with_retry(store, index)?;
            self.write_rows(index, &rows, mode)?;
        }

        self.runs += 1;
        tracing::debug!("Query run {} complete ({} queries)", self.runs, self.queries.len());
        Ok(())
    }

    fn execute_with_retry<S: BackingStore + ?Sized>(
        &self,
        store: &S,
        index: usize,
    ) -> QueryResult<Vec<QueryRow>> {
        let sql = &self.queries[index];
        match store.execute_query(sql, &[]) {
            Ok(rows) => Ok(rows),
            Err(e) => {
                tracing::warn!("Query {} failed, retrying: {}", index, e);
                store
                    .execute_query(sql, &[])
                    .map_err(|source| QueryError::Execution { index, source })
            }
        }
    }

    fn write_rows(&self, index: usize, rows: &[QueryRow], mode: WriteMode) -> QueryResult<()> {
        let path = self.output_path(index);
        let output_error = |e: &dyn std::fmt::Display| QueryError::Output {
            path: path.clone(),
            error: e.to_string(),
        };

        let mut options = OpenOptions::new();
        match mode {
            WriteMode::Overwrite => options.write(true).create(true).truncate(true),
            WriteMode::Append => options.append(true).create(true),
        };
        let file = options.open(&path).map_err(|e| output_error(&e))?;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_writer(file);

        for row in rows {
            writer.write_record(row).map_err(|e| output_error(&e))?;
        }
        writer.flush().map_err(|e| output_error(&e))?;

        Ok(())
    }
}
