//! album-harvest main entry point
//!
//! This is the command-line interface for the album-review ingestion crawler.

use album_harvest::config::{load_config_with_hash, validate, Config};
use album_harvest::crawler::{run_ingestion, DedupFilter};
use album_harvest::output::{load_statistics, print_run_summary, print_statistics};
use album_harvest::prepare::run_cleaning;
use album_harvest::source::SourceIdentifier;
use album_harvest::storage::{CheckpointStore, JsonlCheckpoint, RunLedger};
use anyhow::{Context, Result};
use clap::Parser;
use std::collections::HashSet;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// album-harvest: a resumable album-review ingestion crawler
///
/// Fetches the review page of every identifier in a range with a bounded
/// worker pool, extracts album records and merges them into a crash-safe
/// JSON Lines dataset. Identifiers already in the dataset are skipped, so
/// re-running a range only retries what is still missing.
#[derive(Parser, Debug)]
#[command(name = "album-harvest")]
#[command(version)]
#[command(about = "A resumable album-review ingestion crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Override the first identifier (inclusive)
    #[arg(long, value_name = "ID")]
    start_id: Option<u64>,

    /// Override the end of the range (exclusive)
    #[arg(long, value_name = "ID")]
    end_id: Option<u64>,

    /// Override the number of concurrent fetch workers
    #[arg(long, value_name = "N")]
    workers: Option<u32>,

    /// Validate config and show what would be fetched without fetching
    #[arg(long, conflicts_with_all = ["stats", "clean"])]
    dry_run: bool,

    /// Show dataset and ledger statistics and exit
    #[arg(long, conflicts_with_all = ["dry_run", "clean"])]
    stats: bool,

    /// Write the cleaned dataset for the text encoder and exit
    #[arg(long, conflicts_with_all = ["dry_run", "stats"])]
    clean: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (mut config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    apply_overrides(&mut config, &cli)?;

    if cli.dry_run {
        handle_dry_run(&config)
    } else if cli.stats {
        handle_stats(&config)
    } else if cli.clean {
        handle_clean(&config)
    } else {
        handle_ingest(config, config_hash).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
///
/// Logs go to stderr so stdout stays free for reports.
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("album_harvest=info,warn"),
            1 => EnvFilter::new("album_harvest=debug,info"),
            2 => EnvFilter::new("album_harvest=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Applies command-line overrides and re-validates the result
fn apply_overrides(config: &mut Config, cli: &Cli) -> Result<()> {
    if let Some(start) = cli.start_id {
        config.source.start_id = start;
    }
    if let Some(end) = cli.end_id {
        config.source.end_id = end;
    }
    if let Some(workers) = cli.workers {
        config.crawler.worker_count = workers;
    }
    validate(config).context("Invalid command-line override")?;
    Ok(())
}

/// Handles the --dry-run mode: validates config and shows what would be fetched
fn handle_dry_run(config: &Config) -> Result<()> {
    println!("=== album-harvest Dry Run ===\n");

    println!("Source:");
    let template = config.template()?;
    println!("  Template: {}", template.as_str());
    println!(
        "  First URL: {}",
        template.render(SourceIdentifier::new(config.source.start_id))
    );
    println!(
        "  Range: [{}, {})",
        config.source.start_id, config.source.end_id
    );

    println!("\nCrawler Configuration:");
    println!("  Workers: {}", config.crawler.worker_count);
    println!("  Request timeout: {}ms", config.crawler.request_timeout);
    println!(
        "  Request delay: {}ms (+ up to {}ms jitter)",
        config.crawler.request_delay, config.crawler.request_jitter
    );
    println!("  Flush interval: {} records", config.crawler.flush_interval);
    match config.crawler.tombstone_after {
        Some(n) => println!("  Tombstone after: {} not-found answers", n),
        None => println!("  Tombstone after: never (retry forever)"),
    }

    println!("\nUser Agent:");
    println!("  {}", config.user_agent.header_value());

    println!("\nOutput:");
    println!("  Dataset: {}", config.output.dataset_path);
    println!("  Ledger: {}", config.output.ledger_path);

    let store = JsonlCheckpoint::new(config.output.dataset_path());
    let present = store.read_keys()?;

    // Only read tombstones from an existing ledger; a dry run creates nothing
    let tombstoned = match config.crawler.tombstone_after {
        Some(threshold) if config.output.ledger_path().exists() => {
            RunLedger::open(config.output.ledger_path())?.tombstoned_keys(threshold)?
        }
        _ => HashSet::new(),
    };

    let work = DedupFilter::new(present, tombstoned).pending(config.range()?, &template);

    println!("\n✓ Configuration is valid");
    println!(
        "✓ Would fetch {} identifiers ({} already stored, {} tombstoned)",
        work.len(),
        work.already_present,
        work.tombstoned
    );

    Ok(())
}

/// Handles the --stats mode: shows dataset and ledger statistics
fn handle_stats(config: &Config) -> Result<()> {
    println!("Dataset: {}", config.output.dataset_path);
    println!("Ledger: {}\n", config.output.ledger_path);

    let store = JsonlCheckpoint::new(config.output.dataset_path());
    let ledger = RunLedger::open(config.output.ledger_path())?;

    let stats = load_statistics(&store, &ledger)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the --clean mode: writes the encoder-ready dataset
fn handle_clean(config: &Config) -> Result<()> {
    let store = JsonlCheckpoint::new(config.output.dataset_path());
    let report = run_cleaning(&store, &config.cleaning)?;

    println!("=== Cleaning Report ===\n");
    println!("  Read: {}", report.read);
    println!("  Written: {}", report.written);
    println!("  Too short: {}", report.too_short);
    println!("  Duplicates: {}", report.duplicate);
    println!("  Invalid: {}", report.invalid);
    println!("\n✓ Cleaned dataset written to: {}", report.output_path.display());

    Ok(())
}

/// Handles the main ingestion run
async fn handle_ingest(config: Config, config_hash: String) -> Result<()> {
    tracing::info!(
        "Starting ingestion of [{}, {}) with {} workers",
        config.source.start_id,
        config.source.end_id,
        config.crawler.worker_count
    );

    match run_ingestion(config, config_hash).await {
        Ok(summary) => {
            print_run_summary(&summary);
            Ok(())
        }
        Err(e) => {
            tracing::error!("Ingestion failed: {}", e);
            Err(e.into())
        }
    }
}
