//! logtriaged - CI log triage worker
//!
//! Scans the results database for failed builds and tests with attached
//! logs, runs each log through the classification engine and spools
//! deduplicated issue/incident envelopes for the downstream ingester.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use logtriage_core::EligibilityConfig;
use logtriaged::{CommandClassifier, LogCache, PgResultSource, ProcessedSet, Spool, Worker};

const DRY_RUN_INTERVAL_SECS: u64 = 6 * 60 * 60;

#[derive(Parser)]
#[command(name = "logtriaged")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "CI log triage worker", long_about = None)]
struct Cli {
    /// Spool directory where issue/incident envelopes are published
    #[arg(long)]
    spool_dir: PathBuf,

    /// Eligibility configuration file (origin -> rules)
    #[arg(long, default_value = "config/logtriage.yaml")]
    config_file: PathBuf,

    /// Local state directory holding the processed-result ledger
    #[arg(long, default_value = "state")]
    state_dir: PathBuf,

    /// Log cache directory
    #[arg(long, default_value = "cache")]
    cache_dir: PathBuf,

    /// Results database connection string
    #[arg(long, env = "PG_DSN")]
    database_url: String,

    /// Classification engine command; receives `--parser <name>` and
    /// the log on stdin, answers with JSON on stdout
    #[arg(long, default_value = "logspec")]
    engine_command: String,

    /// Spool filename prefix
    #[arg(long, default_value = "logspec")]
    spool_prefix: String,

    /// Processing window in hours
    #[arg(long, default_value_t = 24)]
    window_hours: i64,

    /// Seconds to sleep between passes
    #[arg(long, default_value_t = 60)]
    interval_secs: u64,

    /// Derive and log instead of publishing; results are not marked
    /// processed, so the idle interval is stretched to avoid expensive
    /// reprocessing
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();
    info!("starting log triage worker");

    if cli.dry_run {
        warn!("running in dry run mode, not publishing envelopes");
        warn!("dry run does not mark results processed; passes are spaced out accordingly");
    }

    // Startup failures are fatal: no partial state, no silent retries.
    let eligibility =
        EligibilityConfig::load(&cli.config_file).context("loading eligibility config")?;
    if eligibility.is_empty() {
        warn!("eligibility config is empty, no results will be processed");
    }

    for dir in [&cli.spool_dir, &cli.state_dir, &cli.cache_dir] {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("creating directory {}", dir.display()))?;
    }

    let tracker = ProcessedSet::open(&cli.state_dir).context("opening processed-set tracker")?;
    let source = PgResultSource::connect(&cli.database_url)
        .await
        .context("connecting to results database")?;
    info!("connected to results database");
    let classifier =
        CommandClassifier::new(&cli.engine_command).context("configuring classification engine")?;

    let worker = Worker::new(
        Arc::new(source),
        Arc::new(classifier),
        LogCache::new(cli.cache_dir),
        tracker,
        Spool::new(cli.spool_dir, cli.spool_prefix),
        eligibility,
        chrono::Duration::hours(cli.window_hours),
        cli.dry_run,
    );

    worker
        .run(
            Duration::from_secs(cli.interval_secs),
            Duration::from_secs(DRY_RUN_INTERVAL_SECS),
        )
        .await
}
