//! # Logservatory
//!
//! Run a fixed set of SQL queries over web access logs while keeping the
//! working set inside a memory budget.
//!
//! ## Features
//!
//! - **Four log formats**: AWS ELB classic and application, NCSA common and combined
//! - **Cheap file index**: per-file time bounds sampled from head and tail
//! - **Historical replay**: time window and sampling over indexed files
//! - **Live streaming**: standard input with a wall-clock query timer
//! - **Bounded memory**: oldest-first eviction from an in-memory SQLite store
//!
//! ## Modules
//!
//! - [`parser`]: Line patterns, records and timestamps
//! - [`index`]: File indexing, the index CSV and file selection
//! - [`storage`]: Backing store capability, SQLite store and eviction
//! - [`query`]: Query definitions and scheduled runs
//! - [`ingest`]: Buffering, flushing and the historical/live loops
//! - [`config`]: TOML configuration and run validation
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use logservatory::index::IndexStore;
//! use logservatory::ingest::run_historical;
//! use logservatory::{Config, RunContext};
//! use std::path::Path;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::default();
//!     let ctx = RunContext::historical(&config, Path::new("queries.sql"), Path::new("out"))?;
//!     let window = config.selection_window(Some("2018-07-01"), Some("2018-07-31"))?;
//!
//!     let index = IndexStore::load(Path::new("index.csv"))?;
//!     let mut pipeline = ctx.pipeline()?;
//!     run_historical(&mut pipeline, index.rows(), &window, &mut rand::rng())?;
//!
//!     println!("{}", pipeline.stats());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod index;
pub mod ingest;
pub mod parser;
pub mod query;
pub mod storage;

// Re-export top-level types for convenience
pub use config::{generate_default_config, Config, ConfigError, RunContext};

pub use index::{
    select_files, FileIndexer, FileSummary, IndexError, IndexReport, IndexStore, SelectionWindow,
};

pub use ingest::{
    FlushTrigger, IngestError, Pipeline, QueryCadence, RunSchedule, RunStats,
};

pub use parser::{FieldValue, LineDecoder, LogFormat, LogRecord, RecordParser};

pub use query::{QueryError, QueryScheduler, WriteMode};

pub use storage::{
    BackingStore, EvictionPolicy, Evictor, SqliteStore, StorageError, StorageResult, StoreStats,
};
