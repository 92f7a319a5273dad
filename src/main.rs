//! Starheat - GitHub stargazer location heatmaps
//!
//! A CLI tool that enumerates the stargazers of a repository, resolves
//! their profile locations, geocodes them and writes heatmap points,
//! resuming from a snapshot of an earlier run when one is given.
//!
//! Exit codes:
//!   0 - Success (converged or done)
//!   1 - Runtime error (bad config, unreachable repository, write failure, etc.)

mod cli;
mod config;
mod error;
mod geocoder;
mod github;
mod models;
mod pipeline;
mod progress;
mod render;
mod scheduler;
mod snapshot;

use anyhow::{Context, Result};
use cli::Args;
use config::{Config, CONFIG_FILE};
use geocoder::Provider;
use github::GitHubClient;
use indicatif::ProgressBar;
use pipeline::{Aggregator, AggregatorConfig, EventSink, Phase};
use progress::ProgressReporter;
use render::HeatmapFile;
use std::time::Instant;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Initialize logging
    init_logging(&args)?;

    info!("Starheat v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    match run_aggregation(args).await {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Aggregation failed: {}", e);
            eprintln!("\n❌ Error: {}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .starheat.toml.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(CONFIG_FILE);

    if path.exists() {
        eprintln!("⚠️  {} already exists. Remove it first or edit it manually.", CONFIG_FILE);
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content).with_context(|| format!("Failed to write {}", CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE);
    println!("   Edit it to customize the geocoder, rate limits and output.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args) -> Result<()> {
    let level = args.log_level();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")
}

/// Run one aggregation. Returns the process exit code.
async fn run_aggregation(args: Args) -> Result<i32> {
    let start_time = Instant::now();

    let mut config = load_config(&args)?;
    config.merge_with_args(&args);

    let target = args
        .target()
        .context("Repository must be given as owner/name")?;

    let github = GitHubClient::new(&config.github_config())?;
    let provider = Provider::new(
        config.geocoder.provider,
        github.http().clone(),
        config.geocoder.url.as_deref(),
        config.geocoder.api_key.clone(),
    );
    let heatmap = HeatmapFile::new(config.output.points.clone(), config.output.format);

    println!("🔭 Aggregating stargazers of {}", target);
    if let Some(ref snapshot) = args.snapshot {
        println!("   Snapshot: {}", snapshot);
    }
    println!("   Geocoder: {:?}", config.geocoder.provider);
    println!("   Output: {}", config.output.points.display());

    let (events, reporter) = if args.quiet {
        (EventSink::default(), None)
    } else {
        let (events, receiver) = EventSink::channel();
        let reporter = ProgressReporter::new(ProgressBar::new(0)).spawn(receiver);
        (events, Some(reporter))
    };

    let aggregator_config = AggregatorConfig {
        snapshot_location: args.snapshot.clone(),
        page_size: config.github.page_size,
        location_throttle: config.throttle.location_throttle(),
        geocode_throttle: config.throttle.geocode_throttle(),
        ..AggregatorConfig::new(target)
    };

    let mut aggregator = Aggregator::new(aggregator_config, github, provider, heatmap, events);
    let phase = aggregator.run().await;

    let final_snapshot = aggregator.snapshot();
    let state = aggregator.state().clone();
    let renders = aggregator.renderer().renders();
    let points_path = aggregator.renderer().path().to_path_buf();

    // Dropping the aggregator closes the event channel so the reporter can finish.
    drop(aggregator);
    if let Some(reporter) = reporter {
        if let Err(e) = reporter.await {
            warn!("Progress display failed: {}", e);
        }
    }

    if phase == Phase::Halted {
        anyhow::bail!("Could not load repository metadata; nothing was written");
    }

    if let Some(ref path) = config.output.save_snapshot {
        snapshot::save(&final_snapshot, path)
            .with_context(|| format!("Failed to save snapshot to {}", path.display()))?;
    }

    let duration = start_time.elapsed().as_secs_f64();
    let stats = &state.stats;

    println!("\n📊 Aggregation Summary:");
    println!("   Outcome: {}", phase);
    println!(
        "   Stargazers: {} known of {} ({} new, {} pages)",
        state.known_stargazers, state.total_known_stargazers, stats.new_stargazers, stats.pages_fetched
    );
    println!(
        "   Profiles: {} without location | {} failed | {} reused a cached geocode",
        stats.without_location, stats.profiles_failed, stats.locations_reused
    );
    println!(
        "   Geocoding: {} requested | {} added | {} unmatched | {} failed",
        stats.geocode_requests, stats.geocodes_added, stats.geocodes_unmatched, stats.geocodes_failed
    );
    if stats.points_capped > 0 {
        println!("   Points dropped at the stargazer cap: {}", stats.points_capped);
    }
    println!("   Points: {} ({} renders)", state.points.len(), renders);
    println!("   Duration: {:.1}s", duration);
    println!("\n✅ Heatmap saved to: {}", points_path.display());
    if let Some(ref path) = config.output.save_snapshot {
        println!("   Snapshot saved to: {}", path.display());
    }

    Ok(0)
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from {}", CONFIG_FILE);
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {}", e);
            Ok(Config::default())
        }
    }
}
