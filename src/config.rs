//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.starheat.toml` files.

use crate::geocoder::ProviderKind;
use crate::github::GitHubConfig;
use crate::render::OutputFormat;
use crate::scheduler::Throttle;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default configuration file name.
pub const CONFIG_FILE: &str = ".starheat.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// GitHub API settings.
    #[serde(default)]
    pub github: GitHubSection,

    /// Geocoding provider settings.
    #[serde(default)]
    pub geocoder: GeocoderSection,

    /// Rate limits for outbound calls.
    #[serde(default)]
    pub throttle: ThrottleSection,

    /// Output settings.
    #[serde(default)]
    pub output: OutputSection,
}

/// GitHub API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubSection {
    /// API base URL.
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Stargazers per page (GitHub caps this at 100).
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// User-Agent header sent with every request.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl Default for GitHubSection {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            page_size: default_page_size(),
            user_agent: default_user_agent(),
            timeout_seconds: default_timeout(),
        }
    }
}

fn default_api_url() -> String {
    "https://api.github.com".to_string()
}

fn default_page_size() -> usize {
    100
}

fn default_user_agent() -> String {
    concat!("starheat/", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_timeout() -> u64 {
    30
}

/// Geocoding provider settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeocoderSection {
    /// Which provider to query.
    #[serde(default)]
    pub provider: ProviderKind,

    /// Endpoint override; the provider's public endpoint when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Passed through as the `key` query parameter when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

/// Rate limits, in milliseconds and items per tick.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThrottleSection {
    /// Delay between profile lookup ticks.
    #[serde(default = "default_location_interval")]
    pub location_interval_ms: u64,

    /// Profile lookups per tick.
    #[serde(default = "default_location_batch")]
    pub location_batch: usize,

    /// Delay between geocoding ticks.
    #[serde(default = "default_geocode_interval")]
    pub geocode_interval_ms: u64,

    /// Geocoding requests per tick.
    #[serde(default = "default_geocode_batch")]
    pub geocode_batch: usize,

    /// Wall-clock slice one tick may spend dispatching.
    #[serde(default = "default_tick_budget")]
    pub tick_budget_ms: u64,

    /// Delay before the first tick.
    #[serde(default = "default_start_delay")]
    pub start_delay_ms: u64,
}

impl Default for ThrottleSection {
    fn default() -> Self {
        Self {
            location_interval_ms: default_location_interval(),
            location_batch: default_location_batch(),
            geocode_interval_ms: default_geocode_interval(),
            geocode_batch: default_geocode_batch(),
            tick_budget_ms: default_tick_budget(),
            start_delay_ms: default_start_delay(),
        }
    }
}

fn default_location_interval() -> u64 {
    700
}

fn default_location_batch() -> usize {
    1
}

fn default_geocode_interval() -> u64 {
    15_000
}

fn default_geocode_batch() -> usize {
    10
}

fn default_tick_budget() -> u64 {
    50
}

fn default_start_delay() -> u64 {
    25
}

impl ThrottleSection {
    pub fn location_throttle(&self) -> Throttle {
        self.throttle(self.location_interval_ms, self.location_batch)
    }

    pub fn geocode_throttle(&self) -> Throttle {
        self.throttle(self.geocode_interval_ms, self.geocode_batch)
    }

    fn throttle(&self, interval_ms: u64, batch: usize) -> Throttle {
        Throttle::new(Duration::from_millis(interval_ms), batch)
            .with_tick_budget(Duration::from_millis(self.tick_budget_ms))
            .with_start_delay(Duration::from_millis(self.start_delay_ms))
    }
}

/// Output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputSection {
    /// Heatmap point file.
    #[serde(default = "default_points")]
    pub points: PathBuf,

    /// Point file format.
    #[serde(default)]
    pub format: OutputFormat,

    /// Where to write the final snapshot, if anywhere.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub save_snapshot: Option<PathBuf>,
}

impl Default for OutputSection {
    fn default() -> Self {
        Self {
            points: default_points(),
            format: OutputFormat::default(),
            save_snapshot: None,
        }
    }
}

fn default_points() -> PathBuf {
    PathBuf::from("stargazers.geojson")
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings, but only
    /// when they were actually given.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref api_url) = args.api_url {
            self.github.api_url = api_url.clone();
        }
        if let Some(provider) = args.geocoder {
            self.geocoder.provider = provider;
        }
        if let Some(ref url) = args.geocoder_url {
            self.geocoder.url = Some(url.clone());
        }
        if let Some(ref points) = args.output {
            self.output.points = points.clone();
        }
        if let Some(format) = args.format {
            self.output.format = format;
        }
        if let Some(ref path) = args.save_snapshot {
            self.output.save_snapshot = Some(path.clone());
        }
    }

    pub fn github_config(&self) -> GitHubConfig {
        GitHubConfig {
            api_url: self.github.api_url.clone(),
            user_agent: self.github.user_agent.clone(),
            timeout_seconds: self.github.timeout_seconds,
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.github.api_url, "https://api.github.com");
        assert_eq!(config.github.page_size, 100);
        assert_eq!(config.geocoder.provider, ProviderKind::Google);
        assert_eq!(config.throttle.location_interval_ms, 700);
        assert_eq!(config.throttle.geocode_batch, 10);
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[github]
api_url = "http://localhost:8080"
page_size = 50

[geocoder]
provider = "nominatim"

[throttle]
geocode_interval_ms = 1000

[output]
format = "csv"
points = "points.csv"
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert_eq!(config.github.api_url, "http://localhost:8080");
        assert_eq!(config.github.page_size, 50);
        assert_eq!(config.geocoder.provider, ProviderKind::Nominatim);
        assert_eq!(config.throttle.geocode_interval_ms, 1000);
        assert_eq!(config.throttle.location_batch, 1);
        assert_eq!(config.output.format, OutputFormat::Csv);
        assert_eq!(config.output.points, PathBuf::from("points.csv"));
    }

    #[test]
    fn test_throttles_from_config() {
        let throttle = ThrottleSection::default();

        let location = throttle.location_throttle();
        assert_eq!(location.delay, Duration::from_millis(700));
        assert_eq!(location.max_items_per_tick, 1);

        let geocode = throttle.geocode_throttle();
        assert_eq!(geocode.delay, Duration::from_secs(15));
        assert_eq!(geocode.tick_budget, Duration::from_millis(50));
    }

    #[test]
    fn test_merge_only_given_args() {
        let mut config = Config::default();
        config.output.points = PathBuf::from("from-file.geojson");

        let args = crate::cli::Args::try_parse_from([
            "starheat",
            "--repo",
            "octo/cat",
            "--geocoder-url",
            "http://localhost:9000/geocode",
        ])
        .unwrap();
        config.merge_with_args(&args);

        assert_eq!(config.output.points, PathBuf::from("from-file.geojson"));
        assert_eq!(
            config.geocoder.url.as_deref(),
            Some("http://localhost:9000/geocode")
        );
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "[github]\npage_size = 10\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.github.page_size, 10);
        assert!(Config::load(&dir.path().join("missing.toml")).is_err());
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(toml_str.contains("[github]"));
        assert!(toml_str.contains("[throttle]"));
        assert!(toml_str.contains("[output]"));
    }
}
