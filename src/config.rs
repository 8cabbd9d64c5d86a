//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and `LOGSERVATORY_` environment overrides;
//! command-line flags are applied on top by the binary. A loaded
//! [`Config`] is validated into a [`RunContext`] before any input is read.

use crate::index::SelectionWindow;
use crate::ingest::{FlushTrigger, IngestError, Pipeline, QueryCadence, RunSchedule};
use crate::parser::timestamp::parse_date_arg;
use crate::parser::{LineDecoder, LogFormat, RecordParser};
use crate::query::{load_definitions, QueryScheduler};
use crate::storage::{EvictionPolicy, Evictor, SqliteStore};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub ingest: IngestConfig,

    #[serde(default)]
    pub queries: QueriesConfig,

    #[serde(default)]
    pub historical: HistoricalConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Parsing, buffering and memory settings shared by every run
#[derive(Debug, Clone, Deserialize)]
pub struct IngestConfig {
    #[serde(default)]
    pub format: LogFormat,

    #[serde(default = "default_encoding")]
    pub encoding: String,

    #[serde(default = "default_buffer_lines")]
    pub buffer_lines: usize,

    #[serde(default = "default_flush_bytes")]
    pub flush_bytes: u64,

    #[serde(default = "default_memory_bytes")]
    pub memory_bytes: u64,

    #[serde(default = "default_eviction_ceiling")]
    pub eviction_ceiling: f64,

    /// Unset picks `drain` for historical runs and `oldest-quartile` for live runs
    #[serde(default)]
    pub eviction_policy: Option<EvictionPolicy>,

    #[serde(default = "default_sample_lines")]
    pub sample_lines: usize,
}

fn default_encoding() -> String {
    "utf-8".to_string()
}

fn default_buffer_lines() -> usize {
    100
}

fn default_flush_bytes() -> u64 {
    10_000_000 // a tenth of the default memory budget
}

fn default_memory_bytes() -> u64 {
    100_000_000
}

fn default_eviction_ceiling() -> f64 {
    crate::storage::DEFAULT_CEILING_FRACTION
}

fn default_sample_lines() -> usize {
    crate::index::DEFAULT_SAMPLE_LINES
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            encoding: default_encoding(),
            buffer_lines: default_buffer_lines(),
            flush_bytes: default_flush_bytes(),
            memory_bytes: default_memory_bytes(),
            eviction_ceiling: default_eviction_ceiling(),
            eviction_policy: None,
            sample_lines: default_sample_lines(),
        }
    }
}

/// Query scheduling
#[derive(Debug, Clone, Deserialize)]
pub struct QueriesConfig {
    #[serde(default = "default_period_secs")]
    pub period_secs: u64,
}

fn default_period_secs() -> u64 {
    60
}

impl Default for QueriesConfig {
    fn default() -> Self {
        Self {
            period_secs: default_period_secs(),
        }
    }
}

/// Historical replay settings
#[derive(Debug, Clone, Deserialize)]
pub struct HistoricalConfig {
    #[serde(default = "default_sample")]
    pub sample: f64,

    #[serde(default)]
    pub query_cadence: QueryCadence,
}

fn default_sample() -> f64 {
    1.0
}

impl Default for HistoricalConfig {
    fn default() -> Self {
        Self {
            sample: default_sample(),
            query_cadence: QueryCadence::default(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Ok(config)
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from the first default location that exists, or fall back to
    /// defaults with environment overrides
    ///
    /// A default file that exists but cannot be loaded is an error. The
    /// returned path is the file that was loaded, if any.
    pub fn load_default() -> Result<(Self, Option<PathBuf>), ConfigError> {
        let candidates = [
            dirs::config_dir().map(|p| p.join("logservatory").join("config.toml")),
            Some(PathBuf::from("/etc/logservatory/config.toml")),
            Some(PathBuf::from("./config.toml")),
        ];
        Self::load_first(candidates.into_iter().flatten())
    }

    fn load_first(
        candidates: impl IntoIterator<Item = PathBuf>,
    ) -> Result<(Self, Option<PathBuf>), ConfigError> {
        match candidates.into_iter().find(|path| path.exists()) {
            Some(path) => Ok((Self::load_with_env(&path)?, Some(path))),
            None => Ok((Self::from_env(), None)),
        }
    }

    /// Apply `LOGSERVATORY_*` environment variables to an existing config
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        // Ingest overrides
        if let Some(format) = parse_var(&lookup, "LOGSERVATORY_FORMAT") {
            self.ingest.format = format;
        }
        if let Some(encoding) = lookup("LOGSERVATORY_ENCODING") {
            self.ingest.encoding = encoding;
        }
        if let Some(n) = parse_var(&lookup, "LOGSERVATORY_BUFFER_LINES") {
            self.ingest.buffer_lines = n;
        }
        if let Some(n) = parse_var(&lookup, "LOGSERVATORY_FLUSH_BYTES") {
            self.ingest.flush_bytes = n;
        }
        if let Some(n) = parse_var(&lookup, "LOGSERVATORY_MEMORY_BYTES") {
            self.ingest.memory_bytes = n;
        }
        if let Some(f) = parse_var(&lookup, "LOGSERVATORY_EVICTION_CEILING") {
            self.ingest.eviction_ceiling = f;
        }
        if let Some(policy) = parse_var(&lookup, "LOGSERVATORY_EVICTION_POLICY") {
            self.ingest.eviction_policy = Some(policy);
        }

        // Query and historical overrides
        if let Some(n) = parse_var(&lookup, "LOGSERVATORY_PERIOD_SECS") {
            self.queries.period_secs = n;
        }
        if let Some(f) = parse_var(&lookup, "LOGSERVATORY_SAMPLE") {
            self.historical.sample = f;
        }

        // Logging overrides
        if let Some(level) = lookup("LOGSERVATORY_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = lookup("LOGSERVATORY_LOG_FORMAT") {
            self.logging.format = format;
        }
    }

    /// Check every setting a run depends on
    pub fn validate(&self) -> Result<(), ConfigError> {
        let ingest = &self.ingest;

        if ingest.buffer_lines == 0 {
            return Err(invalid("buffer", "must be a positive number of lines"));
        }
        if ingest.flush_bytes == 0 {
            return Err(invalid("flush-bytes", "must be a positive number of bytes"));
        }
        if ingest.memory_bytes == 0 {
            return Err(invalid(
                "memory",
                "must be a positive number of bytes available to the backing store",
            ));
        }
        if !(ingest.eviction_ceiling > 0.0 && ingest.eviction_ceiling <= 1.0) {
            return Err(invalid(
                "ceiling",
                "must be a fraction of the memory budget between 0 (exclusive) and 1",
            ));
        }
        if ingest.sample_lines == 0 {
            return Err(invalid("sample-lines", "must be at least 1"));
        }
        if LineDecoder::for_label(&ingest.encoding).is_none() {
            return Err(invalid(
                "encoding",
                format!(
                    "{:?} is not a supported encoding. Use an ASCII-compatible label such as \"utf-8\" or \"latin1\"",
                    ingest.encoding
                ),
            ));
        }
        if self.queries.period_secs == 0 {
            return Err(invalid("period", "must be a positive number of seconds"));
        }
        let sample = self.historical.sample;
        if !(sample > 0.0 && sample <= 1.0) {
            return Err(invalid(
                "sample",
                "must be a number between 0 and 1. To query over all logs, leave it at 1.0",
            ));
        }
        if !matches!(self.logging.format.as_str(), "pretty" | "json") {
            return Err(invalid("log format", "must be \"pretty\" or \"json\""));
        }

        Ok(())
    }

    pub fn decoder(&self) -> Result<LineDecoder, ConfigError> {
        LineDecoder::for_label(&self.ingest.encoding)
            .ok_or_else(|| invalid("encoding", format!("unknown label {:?}", self.ingest.encoding)))
    }

    /// Selection window from the `--start`/`--end` arguments and the sample setting
    pub fn selection_window(
        &self,
        start: Option<&str>,
        end: Option<&str>,
    ) -> Result<SelectionWindow, ConfigError> {
        const DATE_HELP: &str =
            "must be epoch seconds or a date such as \"2018-07-02\" or \"2018-07-02 22:23:00\"";

        let start = start
            .map(|s| parse_date_arg(s).ok_or_else(|| invalid("start", DATE_HELP)))
            .transpose()?;
        let end = end
            .map(|s| parse_date_arg(s).ok_or_else(|| invalid("end", DATE_HELP)))
            .transpose()?;

        if let (Some(s), Some(e)) = (start, end) {
            if s > e {
                return Err(invalid("start", "must not be later than end"));
            }
        }

        Ok(SelectionWindow::new(start, end).sample(self.historical.sample))
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },

    #[error("Invalid {option}: {message}")]
    Invalid { option: String, message: String },
}

fn invalid(option: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        option: option.to_string(),
        message: message.into(),
    }
}

/// Look up and parse one variable; unparsable values are logged and ignored
fn parse_var<T, F>(lookup: &F, name: &str) -> Option<T>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    let value = lookup(name)?;
    match value.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!("Ignoring {}={:?}: not a valid value", name, value);
            None
        }
    }
}

/// Validated settings for one historical or live run
#[derive(Debug, Clone)]
pub struct RunContext {
    pub format: LogFormat,
    pub decoder: LineDecoder,
    pub trigger: FlushTrigger,
    pub evictor: Evictor,
    pub schedule: RunSchedule,
    pub period: Duration,
    pub queries: Vec<String>,
    pub output_dir: PathBuf,
}

impl RunContext {
    pub fn historical(config: &Config, queries: &Path, output: &Path) -> Result<Self, ConfigError> {
        Self::build(
            config,
            queries,
            output,
            FlushTrigger::Bytes(config.ingest.flush_bytes),
            RunSchedule::Historical(config.historical.query_cadence),
            EvictionPolicy::Drain,
        )
    }

    pub fn live(config: &Config, queries: &Path, output: &Path) -> Result<Self, ConfigError> {
        Self::build(
            config,
            queries,
            output,
            FlushTrigger::Lines(config.ingest.buffer_lines),
            RunSchedule::Live,
            EvictionPolicy::OldestQuartile,
        )
    }

    fn build(
        config: &Config,
        queries: &Path,
        output: &Path,
        trigger: FlushTrigger,
        schedule: RunSchedule,
        default_policy: EvictionPolicy,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let queries = load_definitions(queries).map_err(|e| invalid("queries", e.to_string()))?;

        if !output.is_dir() {
            return Err(invalid(
                "output",
                format!(
                    "{:?} must be an existing directory. Query results are written there, one CSV file per query",
                    output
                ),
            ));
        }

        let policy = config.ingest.eviction_policy.unwrap_or(default_policy);

        Ok(Self {
            format: config.ingest.format,
            decoder: config.decoder()?,
            trigger,
            evictor: Evictor::new(config.ingest.memory_bytes, config.ingest.eviction_ceiling, policy),
            schedule,
            period: Duration::from_secs(config.queries.period_secs),
            queries,
            output_dir: output.to_path_buf(),
        })
    }

    /// Assemble the pipeline over a fresh in-memory store
    pub fn pipeline(&self) -> Result<Pipeline<SqliteStore>, IngestError> {
        Ok(Pipeline::new(
            SqliteStore::open_in_memory(self.format)?,
            RecordParser::new(self.format)?,
            self.decoder.clone(),
            self.trigger,
            self.evictor,
            QueryScheduler::new(self.queries.clone(), &self.output_dir),
            self.schedule,
        ))
    }
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# Logservatory Configuration
#
# Environment variables override these settings:
# - LOGSERVATORY_FORMAT
# - LOGSERVATORY_ENCODING
# - LOGSERVATORY_BUFFER_LINES
# - LOGSERVATORY_FLUSH_BYTES
# - LOGSERVATORY_MEMORY_BYTES
# - LOGSERVATORY_EVICTION_CEILING
# - LOGSERVATORY_EVICTION_POLICY
# - LOGSERVATORY_PERIOD_SECS
# - LOGSERVATORY_SAMPLE
# - LOGSERVATORY_LOG_LEVEL
# - LOGSERVATORY_LOG_FORMAT
#
# Command-line flags override both.

[ingest]
# Log format: aws-elb-classic, aws-elb-application, ncsa-common, ncsa-combined
format = "aws-elb-classic"

# Text encoding of the log files (ASCII-compatible labels only)
encoding = "utf-8"

# Live runs flush after this many parsed lines
buffer_lines = 100

# Historical runs flush after reading this many bytes
flush_bytes = 10000000

# Memory available to the backing store (bytes)
memory_bytes = 100000000

# Evict once the store reaches this fraction of memory_bytes
eviction_ceiling = 0.9

# Eviction policy: drain or oldest-quartile
# Unset: drain for historical runs, oldest-quartile for live runs
# eviction_policy = "oldest-quartile"

# Lines sampled from each end of a file when indexing
sample_lines = 20

[queries]
# Seconds between query runs in live mode
period_secs = 60

[historical]
# Fraction of the selected files to replay
sample = 1.0

# When to run queries: every_flush or before_eviction
query_cadence = "every_flush"

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"
"#
    .to_string()
}
