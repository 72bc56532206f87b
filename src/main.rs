//! Asset Harvester main entry point
//!
//! Command-line interface for the recursive image crawler.

use anyhow::Context;
use asset_harvester::config::{load_config_with_hash, Config};
use asset_harvester::crawler::{CrawlUnit, Dispatcher};
use asset_harvester::output::print_summary;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Asset Harvester: a recursive image crawler
///
/// Walks the configured target pages to a bounded depth, collects image
/// links and downloads them into a local cache keyed by URL. Each unit of
/// the workload file runs independently.
#[derive(Parser, Debug)]
#[command(name = "asset-harvester")]
#[command(version)]
#[command(about = "A recursive image crawler", long_about = None)]
struct Cli {
    /// Path to TOML workload file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate the workload and show what would be crawled without crawling
    #[arg(long)]
    dry_run: bool,

    /// Override the output directory from the workload file
    #[arg(short, long, value_name = "DIR")]
    output: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (mut config, hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", hash);

    if let Some(output) = &cli.output {
        config.output.directory = output.to_string_lossy().into_owned();
    }

    if cli.dry_run {
        handle_dry_run(&config);
        return Ok(());
    }

    handle_harvest(&config).await
}

/// Sets up the logging/tracing subscriber
///
/// `RUST_LOG` takes precedence over the verbosity flags when set.
fn setup_logging(verbose: u8, quiet: bool) {
    let fallback = if quiet {
        "error"
    } else {
        match verbose {
            0 => "asset_harvester=info,warn",
            1 => "asset_harvester=debug,info",
            2 => "asset_harvester=trace,debug",
            _ => "trace",
        }
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: validates every unit and lists its targets
fn handle_dry_run(config: &Config) {
    println!("=== Asset Harvester Dry Run ===\n");

    println!("Output directory: {}", config.output.directory);
    match config.dispatcher.concurrency {
        Some(n) => println!("Concurrency: {}", n),
        None => println!("Concurrency: {} (CPU count)", num_cpus::get()),
    }
    println!(
        "HTTP: timeout {}s, connect timeout {}s, {} user agents",
        config.http.timeout,
        config.http.connect_timeout,
        config.http.user_agents.len()
    );

    println!("\nUnits ({}):", config.units.len());
    let mut valid = 0;
    for unit in &config.units {
        match CrawlUnit::from_config(unit) {
            Ok(built) => {
                valid += 1;
                println!(
                    "  ✓ {} [{}] depth {}, think {}s, render {}",
                    built.name,
                    built.profile,
                    built.max_depth,
                    built.think_time.as_secs(),
                    built.render
                );
                for target in &built.targets {
                    println!("    * {}", target);
                }
            }
            Err(e) => println!("  ✗ {}: {}", unit.name, e),
        }
    }

    println!(
        "\n{} of {} units would be crawled",
        valid,
        config.units.len()
    );
}

/// Runs every unit and prints the report
async fn handle_harvest(config: &Config) -> anyhow::Result<()> {
    let dispatcher = Dispatcher::from_config(config);

    std::fs::create_dir_all(dispatcher.output()).with_context(|| {
        format!(
            "cannot create output directory {}",
            dispatcher.output().display()
        )
    })?;

    tracing::info!(
        "Harvesting {} units into {}",
        config.units.len(),
        dispatcher.output().display()
    );

    let summary = dispatcher.run_configs(&config.units).await;
    print_summary(&summary);

    Ok(())
}
