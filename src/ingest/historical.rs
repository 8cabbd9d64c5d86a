//! Historical replay
//!
//! Reads the files a [`SelectionWindow`] picks out of the index, in
//! selection order, and pushes every line through the pipeline.

use crate::index::{select_files, FileSummary, SelectionWindow};
use crate::ingest::pipeline::Pipeline;
use crate::ingest::IngestError;
use crate::parser::timestamp::format_epoch;
use crate::storage::BackingStore;
use rand::Rng;
use std::fs::File;
use std::io::{BufRead, BufReader};

/// Select files from `rows`, replay them and finish the run
pub fn run_historical<S, R>(
    pipeline: &mut Pipeline<S>,
    rows: &[FileSummary],
    window: &SelectionWindow,
    rng: &mut R,
) -> Result<(), IngestError>
where
    S: BackingStore,
    R: Rng + ?Sized,
{
    let files = select_files(rows, window, rng);
    match (files.first(), files.last()) {
        (Some(first), Some(last)) => tracing::info!(
            "Selected {} of {} files spanning {} to {}",
            files.len(),
            rows.len(),
            format_epoch(first.min_ts),
            format_epoch(last.max_ts)
        ),
        _ => tracing::info!("No indexed files fall inside the selection window"),
    }

    replay_files(pipeline, &files)?;
    pipeline.finish()
}

/// Push every line of `files` through the pipeline, in order
///
/// A file that cannot be opened or read is logged and skipped.
pub fn replay_files<S: BackingStore>(
    pipeline: &mut Pipeline<S>,
    files: &[FileSummary],
) -> Result<(), IngestError> {
    let mut line = Vec::new();

    for summary in files {
        pipeline.stats_mut().files_selected += 1;

        let file = match File::open(&summary.path) {
            Ok(file) => file,
            Err(e) => {
                tracing::warn!("Skipping {:?}: {}", summary.path, e);
                pipeline.stats_mut().files_skipped += 1;
                continue;
            }
        };

        tracing::debug!("Replaying {:?} ({} lines)", summary.path, summary.line_count);
        let mut reader = BufReader::new(file);

        loop {
            line.clear();
            match reader.read_until(b'\n', &mut line) {
                Ok(0) => {
                    pipeline.stats_mut().files_replayed += 1;
                    break;
                }
                Ok(_) => pipeline.push_line(&line)?,
                Err(e) => {
                    tracing::warn!("Stopped reading {:?}: {}", summary.path, e);
                    pipeline.stats_mut().files_skipped += 1;
                    break;
                }
            }
        }
    }

    Ok(())
}
