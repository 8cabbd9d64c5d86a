//! Index Store
//!
//! The persisted table of [`FileSummary`] rows, kept as CSV with the header
//! `file,size_bytes,n_lines,min_ts,max_ts`. Built once by an indexing pass
//! and loaded verbatim at the start of each historical run; rows are never
//! updated in place.

use crate::index::summary::FileSummary;
use crate::index::IndexError;
use std::collections::HashSet;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

/// Ordered collection of file summaries, unique by path
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexStore {
    rows: Vec<FileSummary>,
    paths: HashSet<PathBuf>,
}

impl IndexStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a row; a path can only appear once
    pub fn push(&mut self, summary: FileSummary) -> Result<(), IndexError> {
        if !self.paths.insert(summary.path.clone()) {
            return Err(IndexError::DuplicatePath(summary.path));
        }
        self.rows.push(summary);
        Ok(())
    }

    pub fn rows(&self) -> &[FileSummary] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Earliest and latest timestamps covered by the index
    pub fn time_bounds(&self) -> Option<(i64, i64)> {
        let min = self.rows.iter().map(|r| r.min_ts).min()?;
        let max = self.rows.iter().map(|r| r.max_ts).max()?;
        Some((min, max))
    }

    /// Load an index file
    pub fn load(path: &Path) -> Result<Self, IndexError> {
        let file = std::fs::File::open(path).map_err(|e| IndexError::Open {
            path: path.to_path_buf(),
            error: e,
        })?;
        Self::read_from(file)
    }

    /// Read rows from CSV
    pub fn read_from<R: Read>(reader: R) -> Result<Self, IndexError> {
        let mut reader = csv::ReaderBuilder::new().has_headers(true).from_reader(reader);
        let mut store = Self::new();

        for result in reader.deserialize() {
            let summary: FileSummary = result?;
            store.push(summary)?;
        }

        Ok(store)
    }

    /// Write the index to a file, replacing it
    pub fn save(&self, path: &Path) -> Result<(), IndexError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let file = std::fs::File::create(path)?;
        self.write_to(file)
    }

    /// Write rows as CSV, header first
    pub fn write_to<W: Write>(&self, writer: W) -> Result<(), IndexError> {
        let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(writer);

        // explicit header so an empty index still carries it
        writer.write_record(["file", "size_bytes", "n_lines", "min_ts", "max_ts"])?;
        for row in &self.rows {
            writer.serialize(row)?;
        }

        writer.flush()?;
        Ok(())
    }
}
