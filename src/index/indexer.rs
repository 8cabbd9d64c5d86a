//! File Indexer
//!
//! Summarizes log files without parsing them end to end. Only the line
//! count needs a full pass; the time bounds come from the first and last
//! few lines of the file.
//!
//! Files whose sampled edges contain no matching line are left out of the
//! index. That is an approximation: a file whose matching lines all sit in
//! the middle is missed.

use crate::index::store::IndexStore;
use crate::index::summary::FileSummary;
use crate::index::tail::ReverseBlockReader;
use crate::index::IndexError;
use crate::parser::{LineDecoder, RecordParser};
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::Path;
use walkdir::WalkDir;

/// Default number of lines sampled from each end of a file
pub const DEFAULT_SAMPLE_LINES: usize = 20;

const COUNT_CHUNK_SIZE: usize = 1024 * 1024;

/// Outcome of an indexing pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexReport {
    /// Files that produced a summary row
    pub files_indexed: usize,
    /// Files with no matching line among the sampled edges
    pub files_skipped: usize,
    /// Entries that could not be read (permissions, symlink loops, ...)
    pub entries_failed: usize,
}

/// Builds [`FileSummary`] rows for files and directory trees
pub struct FileIndexer {
    parser: RecordParser,
    decoder: LineDecoder,
    sample_lines: usize,
}

impl FileIndexer {
    pub fn new(parser: RecordParser, decoder: LineDecoder) -> Self {
        Self {
            parser,
            decoder,
            sample_lines: DEFAULT_SAMPLE_LINES,
        }
    }

    /// Builder method: lines sampled from each end of a file
    pub fn sample_lines(mut self, n: usize) -> Self {
        self.sample_lines = n.max(1);
        self
    }

    /// Summarize a single file
    ///
    /// Returns `Ok(None)` when no sampled line matches the format.
    pub fn summarize(&self, path: &Path) -> Result<Option<FileSummary>, IndexError> {
        let size_bytes = std::fs::metadata(path)?.len();
        let line_count = count_lines(path)?;

        let mut sample = ReverseBlockReader::new(File::open(path)?).last_lines(self.sample_lines)?;
        sample.extend(head_lines(path, self.sample_lines)?);

        let mut bounds: Option<(i64, i64)> = None;
        for raw in &sample {
            let line = self.decoder.decode(raw);
            let Some(ts) = self.parser.parse(&line).and_then(|r| r.timestamp()) else {
                continue;
            };

            bounds = Some(match bounds {
                Some((min, max)) => (min.min(ts), max.max(ts)),
                None => (ts, ts),
            });
        }

        Ok(bounds.map(|(min_ts, max_ts)| FileSummary {
            path: path.to_path_buf(),
            size_bytes,
            line_count,
            min_ts,
            max_ts,
        }))
    }

    /// Index a file or a directory tree into a fresh store
    pub fn index_path(&self, root: &Path) -> Result<(IndexStore, IndexReport), IndexError> {
        let mut store = IndexStore::new();
        let report = self.index_into(root, &mut store)?;
        Ok((store, report))
    }

    /// Index a file or a directory tree, appending rows to `store`
    ///
    /// Directories are walked depth-first with entries sorted by name, so
    /// the same tree always yields the same row order. Symlinks are
    /// followed; a link back to one of its own ancestors is reported and
    /// skipped.
    pub fn index_into(&self, root: &Path, store: &mut IndexStore) -> Result<IndexReport, IndexError> {
        if !root.exists() {
            return Err(IndexError::NotFound(root.to_path_buf()));
        }

        let mut report = IndexReport::default();

        for entry in WalkDir::new(root).follow_links(true).sort_by_file_name() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    if let Some(ancestor) = e.loop_ancestor() {
                        tracing::warn!(
                            "Skipping symlink loop at {:?} (points back to {:?})",
                            e.path(),
                            ancestor
                        );
                    } else {
                        tracing::warn!("Skipping unreadable entry: {}", e);
                    }
                    report.entries_failed += 1;
                    continue;
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }

            match self.summarize(entry.path()) {
                Ok(Some(summary)) => {
                    tracing::debug!(
                        "Indexed {:?}: {} lines, {}..{}",
                        summary.path,
                        summary.line_count,
                        summary.min_ts,
                        summary.max_ts
                    );
                    store.push(summary)?;
                    report.files_indexed += 1;
                }
                Ok(None) => {
                    tracing::debug!("Skipping {:?}: no matching lines at file edges", entry.path());
                    report.files_skipped += 1;
                }
                Err(IndexError::Io(e)) => {
                    tracing::warn!("Skipping {:?}: {}", entry.path(), e);
                    report.entries_failed += 1;
                }
                Err(e) => return Err(e),
            }
        }

        tracing::info!(
            "Indexed {} files ({} without matching lines, {} unreadable)",
            report.files_indexed,
            report.files_skipped,
            report.entries_failed
        );

        Ok(report)
    }
}

/// Count `\n` bytes in a file
pub fn count_lines(path: &Path) -> io::Result<u64> {
    let mut file = File::open(path)?;
    let mut buf = vec![0u8; COUNT_CHUNK_SIZE];
    let mut lines = 0u64;

    loop {
        let read = file.read(&mut buf)?;
        if read == 0 {
            break;
        }
        lines += buf[..read].iter().filter(|&&b| b == b'\n').count() as u64;
    }

    Ok(lines)
}

/// First `n` lines of a file, without terminators
fn head_lines(path: &Path, n: usize) -> io::Result<Vec<Vec<u8>>> {
    let mut reader = BufReader::new(File::open(path)?);
    let mut lines = Vec::with_capacity(n);

    for _ in 0..n {
        let mut line = Vec::new();
        if reader.read_until(b'\n', &mut line)? == 0 {
            break;
        }
        while matches!(line.last(), Some(b'\n' | b'\r')) {
            line.pop();
        }
        lines.push(line);
    }

    Ok(lines)
}
