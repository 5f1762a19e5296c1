//! Job-Trawler main entry point
//!
//! This is the command-line interface for the Job-Trawler listing crawler.

use anyhow::Context;
use clap::Parser;
use job_trawler::config::{load_config_with_hash, Config};
use job_trawler::crawler::{Coordinator, Endpoints};
use job_trawler::listing::CrawlCursor;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Job-Trawler: a rotating-identity job listing crawler
///
/// Job-Trawler walks a paginated job search, stores every listing it has not
/// seen before with a bounded, annotated description, and can rotate its
/// public IP through a VPN client between pages.
#[derive(Parser, Debug)]
#[command(name = "job-trawler")]
#[command(version = "1.0.0")]
#[command(about = "A rotating-identity job listing crawler", long_about = None)]
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

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show statistics from the database and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.dry_run {
        handle_dry_run(&config)
    } else if cli.stats {
        handle_stats(&config)
    } else {
        handle_crawl(config, config_hash).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("job_trawler=info,warn"),
            1 => EnvFilter::new("job_trawler=debug,info"),
            2 => EnvFilter::new("job_trawler=trace,debug"),
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

/// Handles the --dry-run mode: validates config and shows what would be crawled
fn handle_dry_run(config: &Config) -> anyhow::Result<()> {
    let endpoints = Endpoints::from_config(&config.api).context("Invalid API endpoint")?;
    let search = &config.search;

    println!("=== Job-Trawler Dry Run ===\n");

    println!("Search:");
    println!("  Experience filter: {}", search.experience);
    println!("  Timespan: {}", search.timespan);
    println!("  Work type: {}", search.work_type);
    println!("  Max pages per search: {}", search.max_pages);
    println!("  Page size: {}", search.page_size);

    println!("\nRequests:");
    println!("  User agent: {}", config.requests.user_agent);
    println!(
        "  Courtesy delay: {}-{}ms",
        config.requests.min_delay_ms, config.requests.max_delay_ms
    );
    println!("  Attempt timeout: {}ms", config.requests.timeout_ms);

    println!("\nVPN:");
    if config.vpn.enable {
        println!("  Client: {}", config.vpn.path);
        println!(
            "  Servers: {} ({})",
            config.vpn.pool_size,
            PathBuf::from(&config.vpn.config_dir)
                .join(&config.vpn.config_pattern)
                .display()
        );
        println!("  Rotate every {} pages", config.vpn.rotation_cadence);
    } else {
        println!("  Disabled");
    }

    println!("\nOutput:");
    println!("  Database: {}", config.output.database_path);
    match &config.output.logo_dir {
        Some(dir) => println!("  Logos: {}", dir),
        None => println!("  Logos: not saved"),
    }
    println!(
        "  Description processing: {}",
        if config.processing.enable { "on" } else { "off" }
    );

    let pairs = search.keywords.len() * search.locations.len();
    println!("\nSearches ({}):", pairs);
    for keyword in &search.keywords {
        for location in &search.locations {
            let cursor = CrawlCursor::new(keyword.as_str(), location.clone());
            println!("  - '{}' in {}", keyword, location.name);
            println!("    {}", endpoints.search_url(search, &cursor));
        }
    }

    println!("\n✓ Configuration is valid");
    println!(
        "✓ Would fetch up to {} search pages",
        pairs as u64 * search.max_pages as u64
    );

    Ok(())
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    use job_trawler::output::{load_statistics, print_statistics};
    use job_trawler::storage::open_storage;
    use std::path::Path;

    println!("Database: {}\n", config.output.database_path);

    let storage = open_storage(Path::new(&config.output.database_path))
        .with_context(|| format!("Failed to open {}", config.output.database_path))?;

    let stats = load_statistics(&storage)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config, config_hash: String) -> anyhow::Result<()> {
    tracing::info!(
        "Keywords: {}, Locations: {}, VPN: {}",
        config.search.keywords.len(),
        config.search.locations.len(),
        if config.vpn.enable { "enabled" } else { "disabled" }
    );

    let coordinator = Coordinator::new(config)
        .context("Failed to initialize crawler")?
        .with_config_hash(config_hash);

    let cancel = CancellationToken::new();
    tokio::spawn(cancel_on_shutdown_signal(cancel.clone()));

    match coordinator.run(&cancel).await {
        Ok(summary) => {
            tracing::info!(
                "Crawl completed successfully: {} searches ({} abandoned), {} listings found, {} inserted, {} skipped",
                summary.pairs,
                summary.pairs_aborted,
                summary.listings_found,
                summary.listings_inserted,
                summary.listings_skipped
            );
            Ok(())
        }
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            Err(e.into())
        }
    }
}

/// Cancels the crawl on Ctrl+C, or SIGTERM on unix
async fn cancel_on_shutdown_signal(cancel: CancellationToken) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = terminate.recv() => {}
                }
            }
            Err(e) => {
                tracing::warn!("Cannot listen for SIGTERM: {}", e);
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }

    tracing::warn!("Shutdown requested, releasing the VPN connection and stopping");
    cancel.cancel();
}
