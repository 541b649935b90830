//! HTTPS-Parity main entry point
//!
//! This is the command-line interface for the paired HTTP/HTTPS crawler and
//! its divergence report.

use anyhow::Context;
use clap::Parser;
use https_parity::config::{load_config_with_overrides, Config, ConfigOverrides};
use https_parity::crawler::run_crawl;
use https_parity::output::{
    load_exception_sets, load_statistics, print_statistics, run_report, ExceptionSet,
};
use https_parity::storage::open_store;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// HTTPS-Parity: does the secure site match the insecure one?
///
/// Fetches every domain of a ranked list over both HTTP and HTTPS, stores
/// the paired transcripts, and reports domains whose HTTPS variant is broken
/// or lands somewhere else.
#[derive(Parser, Debug)]
#[command(name = "https-parity")]
#[command(version)]
#[command(about = "Paired HTTP/HTTPS crawler and divergence report", long_about = None)]
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

    /// Fetch every domain but persist nothing
    #[arg(long, conflicts_with_all = ["stats", "report"])]
    dry_run: bool,

    /// Show statistics from the result store and exit
    #[arg(long, conflicts_with_all = ["dry_run", "report"])]
    stats: bool,

    /// Report suspicious domains from the result store and exit
    #[arg(long, conflicts_with_all = ["dry_run", "stats"])]
    report: bool,

    /// Extra exception list for --report (repeatable)
    #[arg(long, value_name = "FILE", requires = "report")]
    exceptions: Vec<PathBuf>,

    /// Maximum number of domains tested at once
    #[arg(long, value_name = "N")]
    concurrency: Option<usize>,

    /// Domains per fetch session
    #[arg(long, value_name = "N")]
    batch_size: Option<usize>,

    /// Store name; the database file is <NAME>.db
    #[arg(long, value_name = "NAME")]
    name: Option<String>,

    /// Ranked domain list, overriding the configured one
    #[arg(long, value_name = "FILE")]
    domains: Option<PathBuf>,

    /// Stop after this many domain list entries
    #[arg(long, value_name = "N")]
    limit: Option<usize>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load configuration; command-line overrides are merged before validation
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_overrides(&cli.config, &overrides(&cli))
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    // Handle different modes
    if cli.stats {
        handle_stats(&config)
    } else if cli.report {
        handle_report(&config, &cli.exceptions)
    } else {
        handle_crawl(config, cli.limit).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("https_parity=info,warn"),
            1 => EnvFilter::new("https_parity=debug,info"),
            2 => EnvFilter::new("https_parity=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Collects the command-line settings that replace file values
fn overrides(cli: &Cli) -> ConfigOverrides {
    ConfigOverrides {
        concurrency: cli.concurrency,
        batch_size: cli.batch_size,
        store_name: cli.name.clone(),
        domain_list: cli.domains.clone(),
        dry_run: cli.dry_run,
    }
}

/// Handles the --stats mode: shows statistics from the result store
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    let path = config.store.path();
    println!("Store: {}\n", path.display());

    let store = open_store(&path).with_context(|| format!("failed to open {}", path.display()))?;
    let stats = load_statistics(&store)?;
    print_statistics(&stats);

    store.close()?;
    Ok(())
}

/// Handles the --report mode: prints one line per suspicious domain
fn handle_report(config: &Config, extra: &[PathBuf]) -> anyhow::Result<()> {
    let lists: Vec<PathBuf> = config
        .report
        .exception_lists
        .iter()
        .chain(extra)
        .cloned()
        .collect();
    let exceptions: Vec<ExceptionSet> =
        load_exception_sets(&lists).context("failed to load exception lists")?;

    let path = config.store.path();
    let store = open_store(&path).with_context(|| format!("failed to open {}", path.display()))?;

    let summary = run_report(&store, &exceptions, |finding| println!("{}", finding));
    println!("{}", summary);

    store.close()?;
    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config, limit: Option<usize>) -> anyhow::Result<()> {
    tracing::info!(
        "Crawling {} into {}",
        config.crawler.domain_list.display(),
        config.store.path().display()
    );

    let summary = run_crawl(config, limit).await.context("crawl failed")?;

    println!(
        "Tested: {} Stored: {} Skipped: {} Write failures: {} Batches: {} Peak in flight: {} Elapsed: {:.1}s",
        summary.completed,
        summary.persisted,
        summary.skipped,
        summary.write_failures,
        summary.batches,
        summary.peak_in_flight,
        summary.elapsed.as_secs_f64()
    );
    Ok(())
}
