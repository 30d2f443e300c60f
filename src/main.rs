//! Edu-Sweep main entry point
//!
//! This is the command-line interface for the Edu-Sweep program scraper. Each invocation
//! performs at most one scrape cycle; cron or a systemd timer provides the schedule.

use anyhow::Context;
use clap::Parser;
use edu_sweep::config::{load_config_with_hash, Config};
use edu_sweep::crawler::{page_url, run_scrape_cycle_with_hash};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Edu-Sweep: a scheduled scraper for education program listings
///
/// Edu-Sweep walks every configured category of the portal, visits each program page for
/// its tuition fee, and replaces the program dataset with the fresh results.
#[derive(Parser, Debug)]
#[command(name = "edu-sweep")]
#[command(version)]
#[command(about = "A scheduled scraper for education program listings", long_about = None)]
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

    /// Validate config and show what would be scraped without scraping
    #[arg(long, conflicts_with_all = ["stats", "export_summary"])]
    dry_run: bool,

    /// Show statistics from the database and exit
    #[arg(long, conflicts_with_all = ["dry_run", "export_summary"])]
    stats: bool,

    /// Generate markdown summary from existing data and exit
    #[arg(long, conflicts_with_all = ["dry_run", "stats"])]
    export_summary: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.dry_run {
        handle_dry_run(&config)
    } else if cli.stats {
        handle_stats(&config)
    } else if cli.export_summary {
        handle_export_summary(&config)
    } else {
        handle_scrape(config, &config_hash).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("edu_sweep=info,warn"),
            1 => EnvFilter::new("edu_sweep=debug,info"),
            2 => EnvFilter::new("edu_sweep=trace,debug"),
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

/// Handles the --dry-run mode: validates config and shows what would be scraped
fn handle_dry_run(config: &Config) -> anyhow::Result<()> {
    println!("=== Edu-Sweep Dry Run ===\n");

    let crawler = &config.crawler;
    println!("Crawler Configuration:");
    println!("  Concurrent sessions: {}", crawler.max_concurrent_sessions);
    println!("  Wait timeout: {}s", crawler.wait_timeout_secs);
    println!("  Run deadline: {}s", crawler.run_deadline_secs);
    println!("  Retries per page: {}", crawler.page_retries);
    println!("  Shutdown grace: {}s", crawler.shutdown_grace_secs);

    println!("\nRenderer:");
    println!("  User agent: {}", config.renderer.user_agent);
    println!("  Request timeout: {}s", config.renderer.request_timeout_secs);

    println!("\nOutput:");
    println!("  Database: {}", config.output.database_path);
    println!("  Summary: {}", config.output.summary_path);

    println!("\nCategories ({}):", config.categories.len());
    for entry in &config.categories {
        let first = page_url(&entry.url, 1)
            .map(|url| url.to_string())
            .unwrap_or_else(|_| entry.url.clone());
        println!("  - {}: {}", entry.name, first);
    }

    println!("\n✓ Configuration is valid");
    println!(
        "✓ Would scrape {} categories with up to {} sessions",
        config.categories.len(),
        crawler.max_concurrent_sessions
    );

    Ok(())
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    use edu_sweep::output::{load_statistics, print_statistics};
    use edu_sweep::storage::SqliteStorage;

    println!("Database: {}\n", config.output.database_path);

    let storage = SqliteStorage::new(Path::new(&config.output.database_path))?;
    let stats = load_statistics(&storage)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the --export-summary mode: generates markdown summary
fn handle_export_summary(config: &Config) -> anyhow::Result<()> {
    println!("=== Exporting Run Summary ===\n");
    println!("Database: {}", config.output.database_path);
    println!("Output: {}", config.output.summary_path);
    println!();

    write_summary(config)?;

    println!("✓ Summary exported to: {}", config.output.summary_path);

    Ok(())
}

fn write_summary(config: &Config) -> anyhow::Result<()> {
    use edu_sweep::output::{generate_markdown_summary, generate_summary};
    use edu_sweep::storage::SqliteStorage;

    let storage = SqliteStorage::new(Path::new(&config.output.database_path))?;

    tracing::info!("Loading run data from database...");
    let summary = generate_summary(&storage)?;

    tracing::info!("Generating markdown summary...");
    generate_markdown_summary(&summary, Path::new(&config.output.summary_path))?;

    Ok(())
}

/// Handles the main operation: one scrape cycle followed by the summary
async fn handle_scrape(config: Config, config_hash: &str) -> anyhow::Result<()> {
    tracing::info!(
        "Scraping {} categories: {}",
        config.categories.len(),
        config
            .categories
            .iter()
            .map(|c| c.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    );

    let report = run_scrape_cycle_with_hash(config.clone(), config_hash)
        .await
        .context("scrape cycle aborted")?;

    if report.is_complete() {
        tracing::info!("Scrape cycle completed");
    } else {
        tracing::warn!("Scrape cycle finished with unfinished categories");
    }

    if let Err(e) = write_summary(&config) {
        tracing::warn!("Failed to write summary: {:#}", e);
    }

    Ok(())
}
