//! Logservatory CLI
//!
//! Command-line interface for Logservatory operations:
//! - Index a directory of closed log files
//! - Replay a time window of indexed files through the queries
//! - Stream live logs from standard input
//! - Print a default configuration file

use anyhow::Context;
use clap::{Parser, Subcommand};
use logservatory::config::{generate_default_config, Config, RunContext};
use logservatory::index::{FileIndexer, IndexStore};
use logservatory::ingest::{run_historical, run_live};
use logservatory::parser::timestamp::format_epoch;
use logservatory::parser::{LogFormat, RecordParser};
use logservatory::storage::EvictionPolicy;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "logservatory")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Run SQL over web access logs in bounded memory")]
#[command(long_about = "Logservatory indexes, replays and streams web access logs into an in-memory \
SQL store and runs a fixed set of queries over them, keeping memory below a budget by evicting the oldest data.")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (default: searched in the user config dir, /etc/logservatory, ./config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log format (aws-elb-classic, aws-elb-application, ncsa-common, ncsa-combined)
    #[arg(long, global = true)]
    format: Option<LogFormat>,

    /// Text encoding of the logs
    #[arg(long, global = true)]
    encoding: Option<String>,

    /// Lines buffered per flush in live mode
    #[arg(long, global = true)]
    buffer: Option<usize>,

    /// Bytes read per flush in historical mode
    #[arg(long, global = true)]
    flush_bytes: Option<u64>,

    /// Memory available to the backing store, in bytes
    #[arg(long, global = true)]
    memory: Option<u64>,

    /// Fraction of the memory budget that triggers eviction
    #[arg(long, global = true)]
    ceiling: Option<f64>,

    /// Eviction policy (drain, oldest-quartile)
    #[arg(long, global = true)]
    eviction: Option<EvictionPolicy>,

    /// Seconds between query runs in live mode
    #[arg(long, global = true)]
    period: Option<u64>,

    /// Lines sampled from each end of a file when indexing
    #[arg(long, global = true)]
    sample_lines: Option<usize>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    log_level: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the file index of a log directory
    Index {
        /// Directory to scan (recursively)
        #[arg(long)]
        input: PathBuf,
        /// Index CSV to write (default: stdout)
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Replay indexed files inside a time window
    Historical {
        /// Index CSV built by `index`
        #[arg(long)]
        index: PathBuf,
        /// Window start: epoch seconds, RFC 3339, "YYYY-MM-DD[ HH:MM:SS]"
        #[arg(long)]
        start: Option<String>,
        /// Window end, same formats as --start
        #[arg(long)]
        end: Option<String>,
        /// Fraction of the qualifying files to replay
        #[arg(long)]
        sample: Option<f64>,
        /// Query definition file
        #[arg(long)]
        queries: PathBuf,
        /// Directory for query<i>.csv output
        #[arg(long)]
        output: PathBuf,
    },

    /// Ingest logs from standard input until EOF or a line holding only 0x04
    Live {
        /// Query definition file
        #[arg(long)]
        queries: PathBuf,
        /// Directory for query<i>.csv output
        #[arg(long)]
        output: PathBuf,
    },

    /// Print a default configuration file
    Config,
}

impl Cli {
    /// Effective config plus the file it came from, if any
    fn load_config(&self) -> anyhow::Result<(Config, Option<PathBuf>)> {
        let (mut config, source) = match &self.config {
            Some(path) => (Config::load_with_env(path)?, Some(path.clone())),
            None => Config::load_default()?,
        };

        if let Some(format) = self.format {
            config.ingest.format = format;
        }
        if let Some(encoding) = &self.encoding {
            config.ingest.encoding = encoding.clone();
        }
        if let Some(n) = self.buffer {
            config.ingest.buffer_lines = n;
        }
        if let Some(n) = self.flush_bytes {
            config.ingest.flush_bytes = n;
        }
        if let Some(n) = self.memory {
            config.ingest.memory_bytes = n;
        }
        if let Some(f) = self.ceiling {
            config.ingest.eviction_ceiling = f;
        }
        if let Some(policy) = self.eviction {
            config.ingest.eviction_policy = Some(policy);
        }
        if let Some(n) = self.period {
            config.queries.period_secs = n;
        }
        if let Some(n) = self.sample_lines {
            config.ingest.sample_lines = n;
        }
        if let Some(level) = &self.log_level {
            config.logging.level = level.clone();
        }
        if let Commands::Historical {
            sample: Some(f), ..
        } = &self.command
        {
            config.historical.sample = *f;
        }

        Ok((config, source))
    }
}

fn init_logging(config: &Config, level_flag: bool) {
    // --log-level beats RUST_LOG, which beats the config file
    let filter = match std::env::var("RUST_LOG") {
        Ok(directives) if !level_flag => tracing_subscriber::EnvFilter::new(directives),
        _ => tracing_subscriber::EnvFilter::new(format!("logservatory={}", config.logging.level)),
    };

    let json = config.logging.format == "json";
    tracing_subscriber::registry()
        .with(filter)
        .with((!json).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr)))
        .with(json.then(|| {
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr)
        }))
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if matches!(cli.command, Commands::Config) {
        print!("{}", generate_default_config());
        return Ok(());
    }

    let (config, source) = cli.load_config()?;
    config.validate()?;
    init_logging(&config, cli.log_level.is_some());

    tracing::info!("Logservatory v{}", env!("CARGO_PKG_VERSION"));
    match &source {
        Some(path) => tracing::info!("Loaded config from {:?}", path),
        None => tracing::debug!("Using default config with environment overrides"),
    }
    tracing::debug!(?config, "Effective configuration");

    match cli.command {
        Commands::Index { input, output } => {
            let parser = RecordParser::new(config.ingest.format)?;
            let indexer = FileIndexer::new(parser, config.decoder()?)
                .sample_lines(config.ingest.sample_lines);

            let (store, _report) =
                tokio::task::spawn_blocking(move || indexer.index_path(&input)).await??;

            if let Some((min, max)) = store.time_bounds() {
                tracing::info!("Index spans {} to {}", format_epoch(min), format_epoch(max));
            }

            match output {
                Some(path) => {
                    store
                        .save(&path)
                        .with_context(|| format!("writing index to {:?}", path))?;
                    tracing::info!("Index written to {:?}", path);
                }
                None => store.write_to(std::io::stdout().lock())?,
            }
        }

        Commands::Historical {
            index,
            start,
            end,
            queries,
            output,
            ..
        } => {
            let ctx = RunContext::historical(&config, &queries, &output)?;
            let window = config.selection_window(start.as_deref(), end.as_deref())?;
            let index = IndexStore::load(&index)?;
            tracing::info!(
                indexed = index.len(),
                policy = %ctx.evictor.policy(),
                threshold_bytes = ctx.evictor.threshold_bytes(),
                "Starting historical run"
            );

            let stats = tokio::task::spawn_blocking(move || -> anyhow::Result<_> {
                let mut pipeline = ctx.pipeline()?;
                let mut rng = rand::rng();
                run_historical(&mut pipeline, index.rows(), &window, &mut rng)?;
                Ok(pipeline.stats().clone())
            })
            .await??;

            tracing::info!("Historical run complete: {}", stats);
        }

        Commands::Live { queries, output } => {
            let ctx = RunContext::live(&config, &queries, &output)?;
            let mut pipeline = ctx.pipeline()?;
            tracing::info!(
                policy = %ctx.evictor.policy(),
                threshold_bytes = ctx.evictor.threshold_bytes(),
                "Reading logs from stdin"
            );

            let stdin = tokio::io::BufReader::new(tokio::io::stdin());
            run_live(&mut pipeline, stdin, ctx.period).await?;

            tracing::info!("Live run complete: {}", pipeline.stats());
        }

        Commands::Config => {}
    }

    Ok(())
}
