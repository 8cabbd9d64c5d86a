//! Supported access log formats
//!
//! Each format carries its ordered field list (which doubles as the
//! column list of the `logs` table) and the pattern that extracts the
//! fields from one raw line.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Declared destination type of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Text,
    Integer,
    Float,
    /// Epoch seconds
    Timestamp,
}

impl FieldType {
    /// SQL column type used for the `logs` table
    pub fn sql_type(&self) -> &'static str {
        match self {
            FieldType::Text => "TEXT",
            FieldType::Integer | FieldType::Timestamp => "INTEGER",
            FieldType::Float => "REAL",
        }
    }
}

/// A named, typed field of a log format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    pub name: &'static str,
    pub kind: FieldType,
}

const fn text(name: &'static str) -> Field {
    Field {
        name,
        kind: FieldType::Text,
    }
}

const fn int(name: &'static str) -> Field {
    Field {
        name,
        kind: FieldType::Integer,
    }
}

const fn float(name: &'static str) -> Field {
    Field {
        name,
        kind: FieldType::Float,
    }
}

const fn ts(name: &'static str) -> Field {
    Field {
        name,
        kind: FieldType::Timestamp,
    }
}

/// Name of the field every format carries its time in
pub const TIMESTAMP_FIELD: &str = "timestamp";

const AWS_ELB_CLASSIC_FIELDS: &[Field] = &[
    ts("timestamp"),
    text("elb_name"),
    text("request_ip"),
    int("request_port"),
    text("backend_ip"),
    int("backend_port"),
    float("request_processing_time"),
    float("backend_processing_time"),
    float("client_response_time"),
    text("request_status_code"),
    text("backend_status_code"),
    int("received_bytes"),
    int("sent_bytes"),
    text("request_verb"),
    text("request_url"),
    text("request_protocol"),
    text("user_agent"),
    text("ssl_cipher"),
    text("ssl_protocol"),
];

const AWS_ELB_APPLICATION_FIELDS: &[Field] = &[
    text("request_type"),
    ts("timestamp"),
    text("elb_name"),
    text("request_ip"),
    int("request_port"),
    text("backend_ip"),
    int("backend_port"),
    float("request_processing_time"),
    float("backend_processing_time"),
    float("client_response_time"),
    text("request_status_code"),
    text("backend_status_code"),
    int("received_bytes"),
    int("sent_bytes"),
    text("request_verb"),
    text("request_url"),
    text("request_protocol"),
    text("user_agent"),
    text("ssl_cipher"),
    text("ssl_protocol"),
    text("target_group_arn"),
    text("trace_id"),
    text("domain_name"),
    text("chosen_cert_arn"),
    text("matched_rule_priority"),
    text("request_creation_time"),
    text("actions_executed"),
    text("redirect_url"),
    text("error_reason"),
    text("target_port_list"),
    text("target_status_code_list"),
    text("classification"),
    text("classification_reason"),
];

const NCSA_COMMON_FIELDS: &[Field] = &[
    text("request_ip"),
    text("auth_user"),
    ts("timestamp"),
    text("request_verb"),
    text("request_url"),
    text("request_protocol"),
    text("request_status_code"),
    int("sent_bytes"),
];

const NCSA_COMBINED_FIELDS: &[Field] = &[
    text("request_ip"),
    text("auth_user"),
    ts("timestamp"),
    text("request_verb"),
    text("request_url"),
    text("request_protocol"),
    text("request_status_code"),
    int("sent_bytes"),
    text("referrer"),
    text("user_agent"),
];

// https://docs.aws.amazon.com/athena/latest/ug/application-load-balancer-logs.html
const AWS_ELB_CLASSIC_PATTERN: &str = r#"([^ ]*) ([^ ]*) ([^ ]*):([0-9]*) ([^ ]*)[:-]([0-9]*) ([-.0-9]*) ([-.0-9]*) ([-.0-9]*) (|[-0-9]*) (-|[-0-9]*) ([-0-9]*) ([-0-9]*) "([^ ]*) ([^ ]*) (- |[^ ]*)" ("[^"]*") ([A-Z0-9-]+) ([A-Za-z0-9.-]*)$"#;

const AWS_ELB_APPLICATION_PATTERN: &str = r#"([^ ]*) ([^ ]*) ([^ ]*) ([^ ]*):([0-9]*) ([^ ]*)[:-]([0-9]*) ([-.0-9]*) ([-.0-9]*) ([-.0-9]*) (|[-0-9]*) (-|[-0-9]*) ([-0-9]*) ([-0-9]*) "([^ ]*) ([^ ]*) (- |[^ ]*)" "([^"]*)" ([A-Z0-9-]+) ([A-Za-z0-9.-]*) ([^ ]*) "([^"]*)" "([^"]*)" "([^"]*)" ([-.0-9]*) ([^ ]*) "([^"]*)" "([^"]*)" "([^ ]*)" "([^\s]+?)" "([^\s]+)" "([^ ]*)" "([^ ]*)""#;

const NCSA_COMMON_PATTERN: &str = r#"([(\d\.)]+) - (.*?) \[(.*?)\] "(.*?) (.*?) (.*?)" (\d+) (\d+)"#;

const NCSA_COMBINED_PATTERN: &str =
    r#"([(\d\.)]+) - (.*?) \[(.*?)\] "(.*?) (.*?) (.*?)" (\d+) (\d+) "(.*?)" "(.*?)""#;

/// Access log layout a run ingests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LogFormat {
    AwsElbClassic,
    AwsElbApplication,
    NcsaCommon,
    NcsaCombined,
}

impl LogFormat {
    /// Get all formats for iteration
    pub fn all() -> &'static [LogFormat] {
        &[
            LogFormat::AwsElbClassic,
            LogFormat::AwsElbApplication,
            LogFormat::NcsaCommon,
            LogFormat::NcsaCombined,
        ]
    }

    /// Ordered field list; capture group `i + 1` fills field `i`
    pub fn fields(&self) -> &'static [Field] {
        match self {
            LogFormat::AwsElbClassic => AWS_ELB_CLASSIC_FIELDS,
            LogFormat::AwsElbApplication => AWS_ELB_APPLICATION_FIELDS,
            LogFormat::NcsaCommon => NCSA_COMMON_FIELDS,
            LogFormat::NcsaCombined => NCSA_COMBINED_FIELDS,
        }
    }

    pub fn pattern(&self) -> &'static str {
        match self {
            LogFormat::AwsElbClassic => AWS_ELB_CLASSIC_PATTERN,
            LogFormat::AwsElbApplication => AWS_ELB_APPLICATION_PATTERN,
            LogFormat::NcsaCommon => NCSA_COMMON_PATTERN,
            LogFormat::NcsaCombined => NCSA_COMBINED_PATTERN,
        }
    }

    /// Position of the timestamp field in [`LogFormat::fields`]
    pub fn timestamp_index(&self) -> usize {
        self.fields()
            .iter()
            .position(|f| f.name == TIMESTAMP_FIELD)
            .unwrap_or(0)
    }

    /// NCSA formats use the bracketed `dd/Mon/yyyy:HH:mm:ss zone` layout;
    /// AWS formats carry ISO-8601 text.
    pub fn has_iso_timestamp(&self) -> bool {
        matches!(self, LogFormat::AwsElbClassic | LogFormat::AwsElbApplication)
    }

    pub fn name(&self) -> &'static str {
        match self {
            LogFormat::AwsElbClassic => "aws-elb-classic",
            LogFormat::AwsElbApplication => "aws-elb-application",
            LogFormat::NcsaCommon => "ncsa-common",
            LogFormat::NcsaCombined => "ncsa-combined",
        }
    }
}

impl Default for LogFormat {
    fn default() -> Self {
        LogFormat::AwsElbClassic
    }
}

impl std::fmt::Display for LogFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when a format name is not recognized
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error(
    "unknown log format {0:?}: must be one of \"aws-elb-classic\", \"aws-elb-application\", \"ncsa-common\", \"ncsa-combined\""
)]
pub struct UnknownFormat(pub String);

impl FromStr for LogFormat {
    type Err = UnknownFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LogFormat::all()
            .iter()
            .copied()
            .find(|f| f.name() == s.trim().to_lowercase())
            .ok_or_else(|| UnknownFormat(s.to_string()))
    }
}
