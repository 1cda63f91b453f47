//! Catalog-Sync main entry point
//!
//! This is the command-line interface for the catalog synchronizer.

use anyhow::Context;
use catalog_sync::config::{load_config_with_hash, Config};
use catalog_sync::cover::NoCoverLookup;
use catalog_sync::output::{load_statistics, print_history, print_statistics};
use catalog_sync::storage::{CatalogStore, SqliteStorage};
use catalog_sync::sync::{SyncMode, SyncOrchestrator, SyncService};
use clap::{Parser, ValueEnum};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Catalog-Sync: incremental catalog ingestion
///
/// Crawls the configured catalog origin, discovers entries missing from the
/// local store, extracts the credential pairs on their pages, and records
/// everything without duplicates.
#[derive(Parser, Debug)]
#[command(name = "catalog-sync")]
#[command(version = "1.0.0")]
#[command(about = "Incremental catalog synchronizer", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Sync mode
    #[arg(long, value_enum, default_value_t = ModeArg::Fast)]
    mode: ModeArg,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show the crawl plan without touching the network
    #[arg(long, conflicts_with_all = ["stats", "history"])]
    dry_run: bool,

    /// Show statistics from the database and exit
    #[arg(long, conflicts_with_all = ["dry_run", "history"])]
    stats: bool,

    /// Show the last N sync runs and exit
    #[arg(long, value_name = "N", conflicts_with_all = ["dry_run", "stats"])]
    history: Option<usize>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ModeArg {
    Fast,
    Full,
}

impl From<ModeArg> for SyncMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Fast => SyncMode::Fast,
            ModeArg::Full => SyncMode::Full,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            (cfg, hash)
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    if cli.dry_run {
        handle_dry_run(&config);
    } else if cli.stats {
        handle_stats(&config)?;
    } else if let Some(limit) = cli.history {
        handle_history(&config, limit)?;
    } else {
        handle_sync(config, config_hash, cli.mode.into()).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("catalog_sync=info,warn"),
            1 => EnvFilter::new("catalog_sync=debug,info"),
            2 => EnvFilter::new("catalog_sync=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

fn open_store(config: &Config) -> anyhow::Result<SqliteStorage> {
    let path = Path::new(&config.output.database_path);
    SqliteStorage::new(path).with_context(|| format!("opening database {}", path.display()))
}

/// Handles --dry-run: prints the configuration and what a sync would crawl
fn handle_dry_run(config: &Config) {
    println!("=== Catalog-Sync Dry Run ===\n");

    let origin = &config.origin;
    println!("Origin:");
    println!("  Root: {}", origin.root_url);
    println!("  Category pattern: {}", origin.category_pattern);
    println!("  Page template: {}", origin.page_path_template);
    println!("  Entry links: {}", origin.entry_link_selector);
    println!("  Max pages per source: {}", origin.max_pages_per_source);
    println!("  Page delay: {}ms", origin.page_delay_ms);
    println!("  Blind increment: {}", origin.blind_increment);
    println!("  Excluded paths: {}", origin.excluded_paths.join(", "));

    println!("\nFetcher:");
    println!("  User agent: {}", config.fetcher.user_agent);
    println!("  Timeout: {}s", config.fetcher.timeout_secs);
    println!("  Max attempts: {}", config.fetcher.max_attempts);

    let sync = &config.sync;
    println!("\nSync:");
    println!("  Batch size: {}", sync.batch_size);
    println!("  Concurrency: {}", sync.concurrency);
    println!("  Entry delay: {}ms", sync.entry_delay_ms);
    println!("  Batch delay: {}ms", sync.batch_delay_ms);

    println!("\nExtraction:");
    println!(
        "  Container selectors ({}):",
        config.extraction.container_selectors.len()
    );
    for selector in &config.extraction.container_selectors {
        println!("    * {}", selector);
    }
    println!("  Login lookahead: {}", config.extraction.login_lookahead);

    println!("\nOutput:");
    println!("  Database: {}", config.output.database_path);

    println!("\n✓ Configuration is valid");
    println!(
        "✓ Fast mode reads page 1 of {}; full mode walks the root and every category page",
        origin.root_url
    );
}

/// Handles --stats: shows statistics from the database
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    println!("Database: {}\n", config.output.database_path);

    let store = open_store(config)?;
    let stats = load_statistics(&store, 5)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles --history: prints the latest audit rows
fn handle_history(config: &Config, limit: usize) -> anyhow::Result<()> {
    let store = open_store(config)?;
    let runs = store.list_sync_runs(limit)?;

    if runs.is_empty() {
        println!("No sync runs recorded");
    } else {
        print_history(&runs);
    }

    Ok(())
}

/// Runs one sync to completion and prints its final progress
async fn handle_sync(config: Config, config_hash: String, mode: SyncMode) -> anyhow::Result<()> {
    let store: Arc<dyn CatalogStore> = Arc::new(open_store(&config)?);
    let orchestrator = SyncOrchestrator::new(&config, Arc::clone(&store), Arc::new(NoCoverLookup))?;
    let service = Arc::new(SyncService::new(
        orchestrator,
        store,
        config_hash,
        Duration::from_secs(config.sync.progress_retention_secs),
    ));

    let ack = service.trigger(mode);
    if !ack.accepted {
        anyhow::bail!("sync not started: {}", ack.message);
    }

    let interrupt = Arc::clone(&service);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, cancelling sync");
            interrupt.cancel();
        }
    });

    let outcome = service.wait().await;
    println!("{}", serde_json::to_string_pretty(&service.progress())?);

    match outcome {
        Some(Ok(report)) => {
            tracing::info!(
                "Sync {} finished: {} added, {} failed",
                report.run_id,
                report.added,
                report.failed
            );
            Ok(())
        }
        Some(Err(e)) => {
            tracing::error!("Sync failed: {}", e);
            Err(e.into())
        }
        None => Ok(()),
    }
}
