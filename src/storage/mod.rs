//! Logservatory Backing Store
//!
//! The bounded working set parsed records are flushed into:
//!
//! - **backing**: the [`BackingStore`] capability the run loop depends on
//! - **sqlite**: in-memory SQLite implementation (`logs` table per format)
//! - **eviction**: ceiling check and oldest-first deletion
//! - **error**: Error types
//!
//! # Architecture
//!
//! ```text
//! Flush:
//!   IngestBuffer → insert (one transaction) → logs table
//!
//! After every flush:
//!   page_size * page_count >= ceiling * budget → delete_oldest → VACUUM
//! ```

pub mod backing;
pub mod error;
pub mod eviction;
pub mod sqlite;

// Re-export commonly used types
pub use backing::{BackingStore, QueryRow, StoreStats};
pub use error::{StorageError, StorageResult};
pub use eviction::{EvictionOutcome, EvictionPolicy, Evictor, DEFAULT_CEILING_FRACTION};
pub use sqlite::SqliteStore;
