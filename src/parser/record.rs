//! Parsed log records

use crate::parser::format::LogFormat;
use crate::parser::timestamp;

/// One field value as captured from a raw line
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Captured text, untouched
    Text(String),
    /// Timestamp already converted to epoch seconds
    Epoch(i64),
}

impl FieldValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            FieldValue::Epoch(_) => None,
        }
    }
}

impl std::fmt::Display for FieldValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldValue::Text(s) => f.write_str(s),
            FieldValue::Epoch(secs) => write!(f, "{}", secs),
        }
    }
}

/// A single parsed line, aligned 1:1 with its format's field list
#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord {
    format: LogFormat,
    values: Vec<FieldValue>,
}

impl LogRecord {
    pub(crate) fn new(format: LogFormat, values: Vec<FieldValue>) -> Self {
        Self { format, values }
    }

    pub fn format(&self) -> LogFormat {
        self.format
    }

    pub fn values(&self) -> &[FieldValue] {
        &self.values
    }

    /// Look up a field by name
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.format
            .fields()
            .iter()
            .position(|f| f.name == name)
            .and_then(|idx| self.values.get(idx))
    }

    /// Timestamp of this record in epoch seconds
    ///
    /// NCSA records already carry epoch seconds; AWS records keep ISO-8601
    /// text, which is converted here.
    pub fn timestamp(&self) -> Option<i64> {
        match self.values.get(self.format.timestamp_index())? {
            FieldValue::Epoch(secs) => Some(*secs),
            FieldValue::Text(raw) => timestamp::parse_iso(raw),
        }
    }
}
