//! Logservatory Query Runs
//!
//! User-supplied SQL run against the backing store on a cadence:
//!
//! - **definitions**: Load `##########`-separated query files
//! - **scheduler**: Execute each query and write `query<i>.csv`
//!
//! # Query File
//!
//! ```text
//! # lines starting with '#' are comments
//! SELECT request_status_code, COUNT(*) FROM logs GROUP BY 1
//! ##########
//! SELECT MIN(timestamp), MAX(timestamp) FROM logs
//! ```
//!
//! Live runs overwrite their output every period; historical runs append.

mod definitions;
mod error;
mod scheduler;

pub use definitions::{load_definitions, parse_definitions, QUERY_SEPARATOR};
pub use error::{QueryError, QueryResult};
pub use scheduler::{QueryScheduler, WriteMode};
