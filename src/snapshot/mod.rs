//! Loading and persisting aggregation snapshots.
//!
//! A snapshot is read once at startup from a local file or an http(s) URL.
//! Any failure to retrieve or parse it yields an empty snapshot: a missing
//! cache only costs extra network calls.

pub mod legacy;

use crate::error::{Result, StarheatError};
use crate::models::{Snapshot, Stargazer};
use crate::render::write_atomic;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Keys under which the stargazer count has been persisted.
const COUNT_KEYS: &[&str] = &["totalKnownStargazers", "total_known_stargazers", "num_stargazers"];

/// Where a snapshot lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnapshotSource {
    File(PathBuf),
    Url(String),
}

impl SnapshotSource {
    pub fn parse(location: &str) -> Self {
        if location.starts_with("http://") || location.starts_with("https://") {
            SnapshotSource::Url(location.to_string())
        } else {
            SnapshotSource::File(PathBuf::from(location))
        }
    }
}

/// Reads a persisted snapshot and normalizes it to the current model.
pub struct SnapshotStore {
    source: SnapshotSource,
    http: reqwest::Client,
}

impl SnapshotStore {
    pub fn new(location: &str, http: reqwest::Client) -> Self {
        Self {
            source: SnapshotSource::parse(location),
            http,
        }
    }

    /// Load the snapshot, falling back to an empty one on any failure.
    pub async fn load(&self) -> Snapshot {
        match self.fetch().await {
            Ok(value) => {
                let snapshot = normalize(&value);
                info!(
                    "Loaded snapshot: {} stargazers, {} geocodes",
                    snapshot.stargazers.len(),
                    snapshot.geocodes.len()
                );
                snapshot
            }
            Err(e) => {
                debug!("No usable snapshot at {:?}: {}", self.source, e);
                Snapshot::default()
            }
        }
    }

    async fn fetch(&self) -> Result<Value> {
        match &self.source {
            SnapshotSource::File(path) => {
                let content = tokio::fs::read_to_string(path).await?;
                Ok(serde_json::from_str(&content)?)
            }
            SnapshotSource::Url(url) => {
                let response = self.http.get(url).send().await?;
                let status = response.status();
                if !status.is_success() {
                    return Err(StarheatError::Api {
                        status: status.as_u16(),
                        message: format!("snapshot fetch from {} failed", url),
                    });
                }
                Ok(response.json().await?)
            }
        }
    }
}

/// Normalize a raw snapshot document.
///
/// Entries that cannot be understood are dropped; the load never fails.
/// The count is never lower than the number of stargazers actually held,
/// and location keys are trimmed the same way profile locations are.
pub fn normalize(value: &Value) -> Snapshot {
    let mut snapshot = Snapshot {
        total_known_stargazers: COUNT_KEYS
            .iter()
            .find_map(|key| value.get(*key).and_then(Value::as_u64))
            .unwrap_or(0) as usize,
        ..Default::default()
    };

    if let Some(stargazers) = value.get("stargazers").and_then(Value::as_object) {
        for (login, entry) in stargazers {
            match serde_json::from_value::<Stargazer>(entry.clone()) {
                Ok(stargazer) => {
                    snapshot.stargazers.insert(login.clone(), stargazer);
                }
                Err(e) => debug!("Skipping cached stargazer {}: {}", login, e),
            }
        }
    }

    if let Some(geocodes) = value.get("geocodes").and_then(Value::as_object) {
        for (location, entry) in geocodes {
            match legacy::match_geocode(entry) {
                Some(geocode) => {
                    debug!(
                        "Geocode for {:?} read as {}",
                        location,
                        legacy::shape_name(entry).unwrap_or("unknown")
                    );
                    let key = location.trim();
                    if key.is_empty() {
                        continue;
                    }
                    snapshot.geocodes.entry(key.to_string()).or_insert(geocode);
                }
                None => debug!("Skipping unrecognized geocode for {:?}", location),
            }
        }
    }

    if snapshot.total_known_stargazers < snapshot.stargazers.len() {
        debug!(
            "Snapshot count {} below {} cached stargazers",
            snapshot.total_known_stargazers,
            snapshot.stargazers.len()
        );
        snapshot.total_known_stargazers = snapshot.stargazers.len();
    }

    snapshot
}

/// Write a snapshot in canonical form, replacing `path` atomically.
pub fn save(snapshot: &Snapshot, path: &Path) -> Result<()> {
    write_atomic(path, snapshot.to_json()?.as_bytes())?;
    info!("Saved snapshot to {}", path.display());
    Ok(())
}
