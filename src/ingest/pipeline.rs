//! Ingest Pipeline
//!
//! The single-threaded path every line takes: decode, parse, buffer,
//! flush into the store, evict, and run queries when the schedule says so.
//! Historical and live runs drive the same pipeline from different inputs.

use crate::ingest::buffer::{FlushTrigger, IngestBuffer};
use crate::ingest::{IngestError, RunStats};
use crate::parser::{LineDecoder, RecordParser};
use crate::query::{QueryScheduler, WriteMode};
use crate::storage::{BackingStore, Evictor};
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// When historical runs execute their queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryCadence {
    /// After every flush
    #[default]
    EveryFlush,
    /// Only right before an eviction drops data
    BeforeEviction,
}

impl std::str::FromStr for QueryCadence {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "every_flush" => Ok(QueryCadence::EveryFlush),
            "before_eviction" => Ok(QueryCadence::BeforeEviction),
            other => Err(format!(
                "unknown query cadence {:?}: must be \"every_flush\" or \"before_eviction\"",
                other
            )),
        }
    }
}

/// Which loop drives the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunSchedule {
    /// Queries on a timer, output overwritten
    Live,
    /// Queries tied to flushes, output appended
    Historical(QueryCadence),
}

impl RunSchedule {
    pub fn write_mode(&self) -> WriteMode {
        match self {
            RunSchedule::Live => WriteMode::Overwrite,
            RunSchedule::Historical(_) => WriteMode::Append,
        }
    }
}

pub struct Pipeline<S: BackingStore> {
    store: S,
    parser: RecordParser,
    decoder: LineDecoder,
    buffer: IngestBuffer,
    evictor: Evictor,
    scheduler: QueryScheduler,
    schedule: RunSchedule,
    stats: RunStats,
    started: Instant,
    // queries have seen every inserted record
    queries_current: bool,
}

impl<S: BackingStore> Pipeline<S> {
    pub fn new(
        store: S,
        parser: RecordParser,
        decoder: LineDecoder,
        trigger: FlushTrigger,
        evictor: Evictor,
        scheduler: QueryScheduler,
        schedule: RunSchedule,
    ) -> Self {
        Self {
            store,
            parser,
            decoder,
            buffer: IngestBuffer::new(trigger),
            evictor,
            scheduler,
            schedule,
            stats: RunStats::default(),
            started: Instant::now(),
            queries_current: false,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn stats(&self) -> &RunStats {
        &self.stats
    }

    pub(crate) fn stats_mut(&mut self) -> &mut RunStats {
        &mut self.stats
    }

    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Feed one raw line (newline included) and flush if the trigger fired
    pub fn push_line(&mut self, raw: &[u8]) -> Result<(), IngestError> {
        self.stats.lines_read += 1;
        self.stats.bytes_read += raw.len() as u64;

        let line = self.decoder.decode(raw);
        let record = self.parser.parse(&line);
        if record.is_none() {
            self.stats.lines_skipped += 1;
        }
        self.buffer.push(record, raw.len());

        if self.buffer.should_flush() {
            self.flush()?;
        }
        Ok(())
    }

    /// Insert the buffered records, then evict and run queries as scheduled
    ///
    /// Returns `false` when there was nothing to insert.
    pub fn flush(&mut self) -> Result<bool, IngestError> {
        if self.buffer.is_empty() {
            self.buffer.clear();
            return Ok(false);
        }

        let inserted = self.insert_with_retry()?;
        self.buffer.clear();
        self.queries_current = false;

        self.stats.flushes += 1;
        self.stats.records_inserted += inserted as u64;
        tracing::debug!("Flush {}: {} records", self.stats.flushes, inserted);

        if let RunSchedule::Historical(cadence) = self.schedule {
            let due = match cadence {
                QueryCadence::EveryFlush => true,
                QueryCadence::BeforeEviction => self.evictor.needs_eviction(&self.store)?,
            };
            if due {
                self.run_queries()?;
            }
        }

        if let Some(outcome) = self.evictor.enforce(&mut self.store)? {
            self.stats.evictions += 1;
            tracing::info!(
                "Evicted {} ({} passes): {} -> {} bytes, {} reclaimed",
                self.evictor.policy(),
                outcome.passes,
                outcome.size_before,
                outcome.size_after,
                outcome.bytes_reclaimed()
            );
        }

        Ok(true)
    }

    fn insert_with_retry(&mut self) -> Result<usize, IngestError> {
        let records = self.buffer.len();
        match self.store.insert(self.buffer.records()) {
            Ok(n) => Ok(n),
            Err(e) => {
                tracing::warn!("Insert of {} records failed, retrying: {}", records, e);
                self.store
                    .insert(self.buffer.records())
                    .map_err(|source| IngestError::InsertFailed { records, source })
            }
        }
    }

    /// Run every query once with the schedule's write mode
    pub fn run_queries(&mut self) -> Result<(), IngestError> {
        self.scheduler.run(&self.store, self.schedule.write_mode())?;
        self.stats.query_runs += 1;
        self.queries_current = true;
        Ok(())
    }

    /// Timer-driven query run of a live loop
    pub fn run_periodic_queries(&mut self) -> Result<(), IngestError> {
        self.run_queries()?;
        self.stats.periodic_query_runs += 1;
        self.log_store_stats();
        Ok(())
    }

    /// Final flush and final query run
    ///
    /// Historical runs skip the final query run when the last flush already
    /// queried the same store contents.
    pub fn finish(&mut self) -> Result<(), IngestError> {
        self.flush()?;
        let historical = matches!(self.schedule, RunSchedule::Historical(_));
        if !(historical && self.queries_current) {
            self.run_queries()?;
        }
        self.stats.elapsed = self.started.elapsed();
        self.log_store_stats();
        Ok(())
    }

    fn log_store_stats(&self) {
        match self.store.stats() {
            Ok(stats) => tracing::info!("{}", stats),
            Err(e) => tracing::warn!("Cannot read store stats: {}", e),
        }
    }
}
