//! In-memory SQLite working set
//!
//! Holds the records of the current window in a single `logs` table whose
//! columns mirror the format's field list. The store's footprint is read
//! from SQLite itself (`page_size * page_count`).

use crate::parser::{FieldValue, LogFormat, LogRecord, TIMESTAMP_FIELD};
use crate::storage::backing::{BackingStore, QueryRow, StoreStats};
use crate::storage::error::{StorageError, StorageResult};
use crate::storage::eviction::EvictionPolicy;
use rusqlite::types::{ToSqlOutput, ValueRef};
use rusqlite::{params, params_from_iter, Connection, ToSql};

impl ToSql for FieldValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            FieldValue::Text(s) => ToSqlOutput::from(s.as_str()),
            FieldValue::Epoch(secs) => ToSqlOutput::from(*secs),
        })
    }
}

/// SQLite-backed [`BackingStore`]
pub struct SqliteStore {
    conn: Connection,
    format: LogFormat,
    insert_sql: String,
}

impl SqliteStore {
    /// Create an empty in-memory store for `format`
    pub fn open_in_memory(format: LogFormat) -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;

        // auto_vacuum must be set before the first table exists
        conn.execute_batch(
            "
            PRAGMA auto_vacuum = FULL;
            PRAGMA temp_store = MEMORY;
            ",
        )?;

        conn.execute_batch(&create_table_sql(format))?;

        Ok(Self {
            conn,
            format,
            insert_sql: insert_sql(format),
        })
    }

    pub fn format(&self) -> LogFormat {
        self.format
    }

    fn pragma(&self, name: &str) -> StorageResult<u64> {
        let value: i64 = self
            .conn
            .query_row(&format!("PRAGMA {}", name), [], |row| row.get(0))?;
        Ok(value.max(0) as u64)
    }
}

fn create_table_sql(format: LogFormat) -> String {
    let columns: Vec<String> = format
        .fields()
        .iter()
        .map(|f| format!("{} {}", f.name, f.kind.sql_type()))
        .collect();

    format!(
        "CREATE TABLE IF NOT EXISTS logs ({});
         CREATE INDEX IF NOT EXISTS timestamp_idx ON logs ({});",
        columns.join(", "),
        TIMESTAMP_FIELD
    )
}

fn insert_sql(format: LogFormat) -> String {
    let fields = format.fields();
    let columns: Vec<&str> = fields.iter().map(|f| f.name).collect();

    // AWS timestamps arrive as ISO-8601 text and are converted here
    let values: Vec<String> = fields
        .iter()
        .enumerate()
        .map(|(idx, f)| {
            if f.name == TIMESTAMP_FIELD && format.has_iso_timestamp() {
                format!("CAST(strftime('%s', ?{}) AS INTEGER)", idx + 1)
            } else {
                format!("?{}", idx + 1)
            }
        })
        .collect();

    format!(
        "INSERT INTO logs ({}) VALUES ({})",
        columns.join(", "),
        values.join(", ")
    )
}

fn render_cell(value: ValueRef<'_>) -> String {
    match value {
        ValueRef::Null => String::new(),
        ValueRef::Integer(i) => i.to_string(),
        ValueRef::Real(f) => f.to_string(),
        ValueRef::Text(t) | ValueRef::Blob(t) => String::from_utf8_lossy(t).into_owned(),
    }
}

impl BackingStore for SqliteStore {
    fn insert(&mut self, records: &[LogRecord]) -> StorageResult<usize> {
        if let Some(other) = records.iter().find(|r| r.format() != self.format) {
            return Err(StorageError::FormatMismatch {
                expected: self.format.to_string(),
                actual: other.format().to_string(),
            });
        }

        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(&self.insert_sql)?;
            for record in records {
                stmt.execute(params_from_iter(record.values().iter()))?;
            }
        }
        tx.commit()?;

        Ok(records.len())
    }

    fn estimated_size_bytes(&self) -> StorageResult<u64> {
        Ok(self.pragma("page_size")? * self.pragma("page_count")?)
    }

    fn delete_oldest(&mut self, policy: EvictionPolicy) -> StorageResult<u64> {
        let before = self.estimated_size_bytes()?;

        let deleted = match policy {
            EvictionPolicy::Drain => self.conn.execute("DELETE FROM logs", [])?,
            EvictionPolicy::OldestQuartile => {
                let (min, avg): (Option<i64>, Option<f64>) = self.conn.query_row(
                    "SELECT MIN(timestamp), AVG(timestamp) FROM logs",
                    [],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )?;

                match (min, avg) {
                    (Some(min), Some(avg)) => {
                        let target = ((avg + min as f64) / 2.0).round() as i64;
                        self.conn
                            .execute("DELETE FROM logs WHERE timestamp < ?1", params![target])?
                    }
                    _ => 0,
                }
            }
        };

        self.conn.execute_batch("VACUUM")?;

        let after = self.estimated_size_bytes()?;
        tracing::debug!(
            "Deleted {} rows ({}), store {} -> {} bytes",
            deleted,
            policy,
            before,
            after
        );

        Ok(before.saturating_sub(after))
    }

    fn execute_query(&self, sql: &str, params: &[FieldValue]) -> StorageResult<Vec<QueryRow>> {
        let mut stmt = self.conn.prepare(sql)?;
        let columns = stmt.column_count();
        let mut rows = stmt.query(params_from_iter(params.iter()))?;

        let mut results = Vec::new();
        while let Some(row) = rows.next()? {
            let mut cells = Vec::with_capacity(columns);
            for idx in 0..columns {
                cells.push(render_cell(row.get_ref(idx)?));
            }
            results.push(cells);
        }

        Ok(results)
    }

    fn stats(&self) -> StorageResult<StoreStats> {
        let (rows, min_ts, max_ts): (i64, Option<i64>, Option<i64>) = self.conn.query_row(
            "SELECT COUNT(*), MIN(timestamp), MAX(timestamp) FROM logs",
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )?;

        Ok(StoreStats {
            rows: rows.max(0) as u64,
            min_ts,
            max_ts,
            size_bytes: self.estimated_size_bytes()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::indexer::tests::ncsa_line;
    use crate::parser::tests::{APPLICATION_LINE, CLASSIC_LINE};
    use crate::parser::RecordParser;

    fn ncsa_records(from: i64, count: i64) -> Vec<LogRecord> {
        let parser = RecordParser::new(LogFormat::NcsaCommon).unwrap();
        (from..from + count)
            .map(|ts| parser.parse(&ncsa_line(ts)).unwrap())
            .collect()
    }

    fn count(store: &SqliteStore) -> String {
        store.execute_query("SELECT COUNT(*) FROM logs", &[]).unwrap()[0][0].clone()
    }

    #[test]
    fn test_schema_per_format() {
        for format in LogFormat::all() {
            let store = SqliteStore::open_in_memory(*format).unwrap();
            assert_eq!(count(&store), "0");
            assert!(store.estimated_size_bytes().unwrap() > 0);
        }
    }

    #[test]
    fn test_insert_converts_iso_timestamp() {
        let parser = RecordParser::new(LogFormat::AwsElbClassic).unwrap();
        let mut store = SqliteStore::open_in_memory(LogFormat::AwsElbClassic).unwrap();

        let record = parser.parse(CLASSIC_LINE).unwrap();
        assert_eq!(store.insert(&[record]).unwrap(), 1);

        let rows = store
            .execute_query("SELECT timestamp, request_port, user_agent FROM logs", &[])
            .unwrap();
        assert_eq!(rows, vec![vec!["1431560383", "2817", "\"curl/7.38.0\""]]);
    }

    #[test]
    fn test_insert_application_format() {
        let parser = RecordParser::new(LogFormat::AwsElbApplication).unwrap();
        let mut store = SqliteStore::open_in_memory(LogFormat::AwsElbApplication).unwrap();

        store.insert(&[parser.parse(APPLICATION_LINE).unwrap()]).unwrap();
        let stats = store.stats().unwrap();
        assert_eq!(stats.rows, 1);
        assert_eq!(stats.min_ts, Some(1530570180));
    }

    #[test]
    fn test_insert_rejects_other_format() {
        let mut store = SqliteStore::open_in_memory(LogFormat::NcsaCombined).unwrap();
        let result = store.insert(&ncsa_records(0, 1));
        assert!(matches!(result, Err(StorageError::FormatMismatch { .. })));
        assert_eq!(count(&store), "0");
    }

    #[test]
    fn test_query_params() {
        let mut store = SqliteStore::open_in_memory(LogFormat::NcsaCommon).unwrap();
        store.insert(&ncsa_records(100, 50)).unwrap();

        let rows = store
            .execute_query(
                "SELECT COUNT(*) FROM logs WHERE timestamp >= ?1 AND request_status_code = ?2",
                &[FieldValue::Epoch(140), FieldValue::Text("200".into())],
            )
            .unwrap();
        assert_eq!(rows[0][0], "10");
    }

    #[test]
    fn test_null_renders_empty() {
        let store = SqliteStore::open_in_memory(LogFormat::NcsaCommon).unwrap();
        let rows = store.execute_query("SELECT MIN(timestamp) FROM logs", &[]).unwrap();
        assert_eq!(rows, vec![vec![String::new()]]);
    }

    #[test]
    fn test_stats() {
        let mut store = SqliteStore::open_in_memory(LogFormat::NcsaCommon).unwrap();
        store.insert(&ncsa_records(1000, 10)).unwrap();

        let stats = store.stats().unwrap();
        assert_eq!(stats.rows, 10);
        assert_eq!(stats.min_ts, Some(1000));
        assert_eq!(stats.max_ts, Some(1009));
        assert_eq!(stats.size_bytes, store.estimated_size_bytes().unwrap());
    }

    #[test]
    fn test_drain_reclaims_space() {
        let mut store = SqliteStore::open_in_memory(LogFormat::NcsaCommon).unwrap();
        let empty = store.estimated_size_bytes().unwrap();

        store.insert(&ncsa_records(0, 5000)).unwrap();
        let full = store.estimated_size_bytes().unwrap();
        assert!(full > empty);

        let reclaimed = store.delete_oldest(EvictionPolicy::Drain).unwrap();
        assert!(reclaimed > 0);
        assert_eq!(count(&store), "0");
        assert!(store.estimated_size_bytes().unwrap() < full);
    }

    #[test]
    fn test_quartile_deletes_oldest_only() {
        let mut store = SqliteStore::open_in_memory(LogFormat::NcsaCommon).unwrap();
        store.insert(&ncsa_records(0, 1000)).unwrap();

        store.delete_oldest(EvictionPolicy::OldestQuartile).unwrap();

        // min 0, avg 499.5 -> everything before 250 goes
        let stats = store.stats().unwrap();
        assert_eq!(stats.min_ts, Some(250));
        assert_eq!(stats.max_ts, Some(999));
        assert_eq!(stats.rows, 750);
    }

    #[test]
    fn test_eviction_brings_store_under_threshold() {
        use crate::storage::eviction::Evictor;

        let mut store = SqliteStore::open_in_memory(LogFormat::NcsaCommon).unwrap();
        store.insert(&ncsa_records(0, 5000)).unwrap();
        let full = store.estimated_size_bytes().unwrap();

        // budget such that the full store is over the 0.9 ceiling
        let evictor = Evictor::new(full, 0.9, EvictionPolicy::OldestQuartile);
        assert!(evictor.needs_eviction(&store).unwrap());

        let outcome = evictor.enforce(&mut store).unwrap().unwrap();
        assert!(outcome.size_after < evictor.threshold_bytes());
        assert!(store.estimated_size_bytes().unwrap() < evictor.threshold_bytes());
        assert_eq!(store.stats().unwrap().max_ts, Some(4999));
    }
}
