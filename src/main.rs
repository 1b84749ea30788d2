//! link-ledger main entry point
//!
//! This is the command-line interface for the link-ledger site inventory crawler.

use anyhow::Context;
use clap::Parser;
use link_ledger::config::{load_config_with_hash, validate, Config};
use link_ledger::crawler::crawl;
use link_ledger::output::{print_findings, print_statistics, CrawlStatistics, CsvReportSink, ReportSink};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// link-ledger: authenticated site inventory crawler
///
/// link-ledger logs into a site, crawls every reachable page on its domain,
/// checks every image, and writes CSV reports of visited, broken and
/// skipped links.
#[derive(Parser, Debug)]
#[command(name = "link-ledger")]
#[command(version)]
#[command(about = "Authenticated site-wide link and image crawler", long_about = None)]
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

    /// Override the number of concurrent workers
    #[arg(short, long)]
    workers: Option<u32>,

    /// Override the directory the CSV reports are written to
    #[arg(short, long, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (mut config, hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", hash);

    if let Some(workers) = cli.workers {
        config.crawler.workers = workers;
    }
    if let Some(dir) = cli.output_dir {
        config.output.directory = dir;
    }
    validate(&config).context("invalid command-line override")?;

    if cli.dry_run {
        handle_dry_run(&config);
        return Ok(());
    }

    handle_crawl(&config).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("link_ledger=info,warn"),
            1 => EnvFilter::new("link_ledger=debug,info"),
            2 => EnvFilter::new("link_ledger=trace,debug"),
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

/// Handles the --dry-run mode: shows the effective configuration
fn handle_dry_run(config: &Config) {
    println!("=== link-ledger Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Start URL: {}", config.crawler.start_url);
    println!("  Domain: {}", config.domain());
    println!("  Workers: {}", config.crawler.workers);
    println!("  Page timeout: {}s", config.crawler.page_timeout_secs);

    println!(
        "\nExclude Patterns ({}):",
        config.crawler.exclude_patterns.len()
    );
    for pattern in &config.crawler.exclude_patterns {
        println!("  - {}", pattern);
    }

    println!("\nUser Agent:");
    println!("  Name: {}", config.user_agent.crawler_name);
    println!("  Version: {}", config.user_agent.crawler_version);

    match &config.auth {
        Some(auth) => {
            println!("\nLogin:");
            println!("  URL: {}", auth.login_url);
            println!("  User: {}", auth.username);
        }
        None => println!("\nLogin: none (anonymous crawl)"),
    }

    println!("\nOutput:");
    let out = &config.output;
    for name in [
        &out.visited_pages,
        &out.visited_images,
        &out.broken,
        &out.skipped,
    ] {
        println!("  {}", out.directory.join(name).display());
    }

    println!("\n✓ Configuration is valid");
}

/// Handles the main crawl operation
async fn handle_crawl(config: &Config) -> anyhow::Result<()> {
    let report = match crawl(config).await {
        Ok(report) => report,
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            return Err(e.into());
        }
    };

    CsvReportSink::new(&config.output)
        .write_report(&report)
        .context("failed to write CSV reports")?;

    let stats = CrawlStatistics::from_report(&report);
    tracing::info!(
        "Crawl finished: {} pages, {} images, {} broken, {} skipped",
        stats.pages_ok + stats.pages_broken,
        stats.images_ok + stats.images_broken,
        stats.broken_entries,
        stats.skipped_external + stats.skipped_excluded
    );
    print_statistics(&stats);
    print_findings(&report);

    Ok(())
}
