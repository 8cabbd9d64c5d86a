//! Ingest Buffer
//!
//! Parsed records waiting for the next flush, plus the byte count the
//! historical trigger looks at.

use crate::parser::LogRecord;

/// When a buffer is due for a flush
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushTrigger {
    /// Buffered record count reached (live runs)
    Lines(usize),
    /// Raw bytes read since the last flush reached (historical runs)
    Bytes(u64),
}

#[derive(Debug)]
pub struct IngestBuffer {
    records: Vec<LogRecord>,
    bytes_read: u64,
    trigger: FlushTrigger,
}

impl IngestBuffer {
    pub fn new(trigger: FlushTrigger) -> Self {
        let capacity = match trigger {
            FlushTrigger::Lines(n) => n,
            FlushTrigger::Bytes(_) => 0,
        };

        Self {
            records: Vec::with_capacity(capacity),
            bytes_read: 0,
            trigger,
        }
    }

    /// Account for one raw line, keeping its record if it parsed
    pub fn push(&mut self, record: Option<LogRecord>, raw_len: usize) {
        self.bytes_read += raw_len as u64;
        if let Some(record) = record {
            self.records.push(record);
        }
    }

    pub fn should_flush(&self) -> bool {
        match self.trigger {
            FlushTrigger::Lines(n) => self.records.len() >= n,
            FlushTrigger::Bytes(n) => self.bytes_read >= n,
        }
    }

    pub fn records(&self) -> &[LogRecord] {
        &self.records
    }

    /// Drop the flushed records and release their storage
    pub fn clear(&mut self) -> Vec<LogRecord> {
        self.bytes_read = 0;
        std::mem::take(&mut self.records)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }
}
