//! Record Parser
//!
//! Turns one raw access log line into a [`LogRecord`] for a selected
//! [`LogFormat`]. Lines that do not match the format's pattern are not an
//! error: blank and partial lines are expected, and callers skip them.
//!
//! Values are kept exactly as captured. The only conversion performed is
//! for NCSA timestamps, which are turned into epoch seconds; AWS formats
//! keep their ISO-8601 text and leave the conversion to the store.

mod decode;
mod format;
mod record;
pub mod timestamp;

pub use decode::LineDecoder;
pub use format::{Field, FieldType, LogFormat, UnknownFormat, TIMESTAMP_FIELD};
pub use record::{FieldValue, LogRecord};

use regex::Regex;

/// Errors building a parser
#[derive(Debug, thiserror::Error)]
pub enum ParserError {
    #[error("Invalid pattern for format {format}: {source}")]
    Pattern {
        format: LogFormat,
        #[source]
        source: regex::Error,
    },
}

/// Line parser for one log format
#[derive(Debug, Clone)]
pub struct RecordParser {
    format: LogFormat,
    regex: Regex,
    timestamp_idx: usize,
}

impl RecordParser {
    /// Compile the pattern for `format`
    pub fn new(format: LogFormat) -> Result<Self, ParserError> {
        let regex =
            Regex::new(format.pattern()).map_err(|source| ParserError::Pattern { format, source })?;

        Ok(Self {
            format,
            regex,
            timestamp_idx: format.timestamp_index(),
        })
    }

    pub fn format(&self) -> LogFormat {
        self.format
    }

    /// Parse one line, returning `None` when it does not match
    pub fn parse(&self, line: &str) -> Option<LogRecord> {
        let caps = self.regex.captures(line.trim())?;
        let fields = self.format.fields();
        let mut values = Vec::with_capacity(fields.len());

        for idx in 0..fields.len() {
            let raw = caps.get(idx + 1).map(|m| m.as_str()).unwrap_or("");

            if idx == self.timestamp_idx && !self.format.has_iso_timestamp() {
                values.push(FieldValue::Epoch(timestamp::parse_ncsa(raw)?));
            } else {
                values.push(FieldValue::Text(raw.to_string()));
            }
        }

        Some(LogRecord::new(self.format, values))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub const CLASSIC_LINE: &str = r#"2015-05-13T23:39:43.945958Z my-loadbalancer 192.168.131.39:2817 10.0.0.1:80 0.000073 0.001048 0.000057 200 200 0 29 "GET http://www.example.com:80/ HTTP/1.1" "curl/7.38.0" - -"#;

    pub const APPLICATION_LINE: &str = r#"http 2018-07-02T22:23:00.186641Z app/my-loadbalancer/50dc6c495c0c9188 192.168.131.39:2817 10.0.0.1:80 0.000 0.001 0.000 200 200 34 366 "GET http://www.example.com:80/ HTTP/1.1" "curl/7.46.0" - - arn:aws:elasticloadbalancing:us-east-2:123456789012:targetgroup/my-targets/73e2d6bc24d8a067 "Root=1-58337262-36d228ad5d99923122bbe354" "-" "-" 0 2018-07-02T22:22:48.364000Z "forward" "-" "-" "10.0.0.1:80" "200" "-" "-""#;

    pub const COMBINED_LINE: &str = r#"127.0.0.1 - frank [10/Oct/2000:13:55:36 -0700] "GET /apache_pb.gif HTTP/1.0" 200 2326 "http://www.example.com/start.html" "Mozilla/4.08 [en] (Win98; I ;Nav)""#;

    pub const COMMON_LINE: &str =
        r#"127.0.0.1 - frank [10/Oct/2000:13:55:36 -0700] "GET /apache_pb.gif HTTP/1.0" 200 2326"#;

    #[test]
    fn test_parse_classic() {
        let parser = RecordParser::new(LogFormat::AwsElbClassic).unwrap();
        let record = parser.parse(CLASSIC_LINE).unwrap();

        assert_eq!(record.values().len(), 19);
        assert_eq!(
            record.get("timestamp"),
            Some(&FieldValue::Text("2015-05-13T23:39:43.945958Z".into()))
        );
        assert_eq!(record.get("request_port").unwrap().as_text(), Some("2817"));
        // quotes are kept, no trimming is applied
        assert_eq!(
            record.get("user_agent").unwrap().as_text(),
            Some("\"curl/7.38.0\"")
        );
        assert_eq!(record.timestamp(), Some(1431560383));
    }

    #[test]
    fn test_parse_application() {
        let parser = RecordParser::new(LogFormat::AwsElbApplication).unwrap();
        let record = parser.parse(APPLICATION_LINE).unwrap();

        assert_eq!(record.values().len(), 33);
        assert_eq!(record.get("request_type").unwrap().as_text(), Some("http"));
        assert_eq!(record.get("user_agent").unwrap().as_text(), Some("curl/7.46.0"));
        assert_eq!(
            record.get("actions_executed").unwrap().as_text(),
            Some("forward")
        );
        assert!(record.timestamp().is_some());
    }

    #[test]
    fn test_parse_ncsa_converts_timestamp() {
        let parser = RecordParser::new(LogFormat::NcsaCombined).unwrap();
        let record = parser.parse(COMBINED_LINE).unwrap();

        assert_eq!(record.get("timestamp"), Some(&FieldValue::Epoch(971211336)));
        assert_eq!(record.get("auth_user").unwrap().as_text(), Some("frank"));
        assert_eq!(record.get("sent_bytes").unwrap().as_text(), Some("2326"));
        assert_eq!(
            record.get("referrer").unwrap().as_text(),
            Some("http://www.example.com/start.html")
        );
        assert_eq!(record.timestamp(), Some(971211336));
    }

    #[test]
    fn test_parse_common() {
        let parser = RecordParser::new(LogFormat::NcsaCommon).unwrap();
        let record = parser.parse(COMMON_LINE).unwrap();
        assert_eq!(record.values().len(), 8);
        assert_eq!(record.get("request_status_code").unwrap().as_text(), Some("200"));
    }

    #[test]
    fn test_non_matching_lines() {
        let parser = RecordParser::new(LogFormat::NcsaCommon).unwrap();
        assert!(parser.parse("").is_none());
        assert!(parser.parse("garbage line").is_none());
        // truncated line from the edge of a sampled block
        assert!(parser.parse("0.0.1 - frank [10/Oct/2000:13:55").is_none());
    }

    #[test]
    fn test_bad_ncsa_timestamp_is_no_match() {
        let parser = RecordParser::new(LogFormat::NcsaCommon).unwrap();
        let line = r#"127.0.0.1 - frank [sometime] "GET / HTTP/1.0" 200 10"#;
        assert!(parser.parse(line).is_none());
    }

    #[test]
    fn test_trailing_newline_is_ignored() {
        let parser = RecordParser::new(LogFormat::AwsElbClassic).unwrap();
        let line = format!("{}\r\n", CLASSIC_LINE);
        assert!(parser.parse(&line).is_some());
    }
}
