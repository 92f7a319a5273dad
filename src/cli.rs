//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::geocoder::ProviderKind;
use crate::github::RepoTarget;
use crate::render::OutputFormat;
use clap::Parser;
use std::path::PathBuf;

/// Starheat - map where a GitHub repository's stargazers live
///
/// Enumerates the stargazers of a repository, looks up each profile's
/// location, geocodes it and writes heatmap points. A snapshot from a
/// previous run avoids repeating work.
///
/// Examples:
///   starheat --repo rust-lang/rust
///   starheat --repo rviscomi/red-dwarf --snapshot cache.json --save-snapshot cache.json
///   starheat --repo owner/name --geocoder nominatim --format csv -o points.csv
///   starheat --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Repository to aggregate, as owner/name
    #[arg(short, long, value_name = "OWNER/NAME", required_unless_present = "init_config")]
    pub repo: Option<String>,

    /// Snapshot from a previous run (file path or http(s) URL)
    #[arg(short, long, value_name = "PATH|URL")]
    pub snapshot: Option<String>,

    /// Write the final aggregation snapshot to this file
    #[arg(long, value_name = "FILE")]
    pub save_snapshot: Option<PathBuf>,

    /// Output file for heatmap points
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output format (geojson, json, csv)
    #[arg(long, value_name = "FORMAT")]
    pub format: Option<OutputFormat>,

    /// GitHub API base URL
    #[arg(long, value_name = "URL", env = "STARHEAT_API_URL")]
    pub api_url: Option<String>,

    /// Geocoding provider (google, nominatim)
    #[arg(long, value_name = "PROVIDER")]
    pub geocoder: Option<ProviderKind>,

    /// Geocoding endpoint override
    #[arg(long, value_name = "URL")]
    pub geocoder_url: Option<String>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .starheat.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output, no progress bars)
    #[arg(short, long)]
    pub quiet: bool,

    /// Generate a default .starheat.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// The target repository. Only valid after [`Args::validate`].
    pub fn target(&self) -> Option<RepoTarget> {
        self.repo.as_deref().and_then(RepoTarget::parse)
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        let repo = self.repo.as_deref().unwrap_or("");
        if RepoTarget::parse(repo).is_none() {
            return Err(format!("Repository must be given as owner/name, got '{}'", repo));
        }

        for url in [&self.api_url, &self.geocoder_url].into_iter().flatten() {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(format!("URL must start with 'http://' or 'https://': {}", url));
            }
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}
