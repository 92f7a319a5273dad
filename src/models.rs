//! Data models for the stargazer aggregation.
//!
//! This module contains the core data structures shared by every phase:
//! stargazers, geocodes, heatmap points and the persisted snapshot.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// A user who starred the target repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stargazer {
    /// GitHub login (unique key).
    pub login: String,
    /// API URL of the user's profile.
    #[serde(rename = "profileUrl", alias = "profile_url", alias = "url", default)]
    pub profile_url: String,
}

impl Stargazer {
    #[cfg(test)]
    pub fn new(login: impl Into<String>, profile_url: impl Into<String>) -> Self {
        Self {
            login: login.into(),
            profile_url: profile_url.into(),
        }
    }
}

/// Resolved coordinates for a free-text location string.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Geocode {
    pub latitude: f64,
    pub longitude: f64,
}

impl Geocode {
    /// Creates a geocode, rejecting coordinates outside the valid ranges.
    pub fn new(latitude: f64, longitude: f64) -> Option<Self> {
        let valid = latitude.is_finite()
            && longitude.is_finite()
            && (-90.0..=90.0).contains(&latitude)
            && (-180.0..=180.0).contains(&longitude);

        valid.then_some(Self {
            latitude,
            longitude,
        })
    }
}

impl fmt::Display for Geocode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.4}, {:.4})", self.latitude, self.longitude)
    }
}

/// One plotted coordinate contributed by one stargazer.
///
/// Stargazers sharing a location produce identical points; the duplicates
/// carry the density weighting of the heatmap.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub latitude: f64,
    pub longitude: f64,
}

impl From<Geocode> for Point {
    fn from(geocode: Geocode) -> Self {
        Self {
            latitude: geocode.latitude,
            longitude: geocode.longitude,
        }
    }
}

/// Persisted aggregation result, reused by the next run.
///
/// Serializes as `{totalKnownStargazers, stargazers, geocodes}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    /// Stargazer count of the repository when the snapshot was taken.
    pub total_known_stargazers: usize,
    /// Known stargazers keyed by login.
    pub stargazers: BTreeMap<String, Stargazer>,
    /// Resolved geocodes keyed by location string.
    pub geocodes: BTreeMap<String, Geocode>,
}

impl Snapshot {
    /// Serialize to the canonical JSON shape.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Points restored from cached geocodes, one per entry.
    pub fn cached_points(&self) -> Vec<Point> {
        self.geocodes.values().copied().map(Point::from).collect()
    }
}

/// Repository metadata as returned by the GitHub API.
#[derive(Debug, Clone)]
pub struct RepositoryInfo {
    /// Live stargazer count, the termination bound for enumeration.
    pub stargazers: usize,
    /// The full metadata payload.
    pub payload: Value,
}

impl RepositoryInfo {
    /// Extract the stargazer count from a metadata payload.
    ///
    /// Older payloads only carried the `watchers` counters, which GitHub
    /// keeps equal to the stargazer count.
    pub fn from_payload(payload: Value) -> Option<Self> {
        let stargazers = ["stargazers_count", "watchers_count", "watchers"]
            .iter()
            .find_map(|key| payload.get(*key).and_then(Value::as_u64))?;

        Some(Self {
            stargazers: stargazers as usize,
            payload,
        })
    }

    /// `owner/name` of the repository, if present in the payload.
    pub fn full_name(&self) -> Option<&str> {
        self.payload.get("full_name").and_then(Value::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_geocode_rejects_out_of_range() {
        assert!(Geocode::new(40.7, -74.0).is_some());
        assert!(Geocode::new(91.0, 0.0).is_none());
        assert!(Geocode::new(0.0, -181.0).is_none());
        assert!(Geocode::new(f64::NAN, 0.0).is_none());
    }

    #[test]
    fn test_stargazer_profile_url_spellings() {
        for key in ["profileUrl", "profile_url", "url"] {
            let mut entry = json!({"login": "octocat"});
            entry[key] = json!("https://x/users/octocat");
            let stargazer: Stargazer = serde_json::from_value(entry).unwrap();
            assert_eq!(stargazer.profile_url, "https://x/users/octocat", "key {key}");
        }
    }

    #[test]
    fn test_repository_info_count_fallback() {
        let info = RepositoryInfo::from_payload(json!({"stargazers_count": 42})).unwrap();
        assert_eq!(info.stargazers, 42);

        let legacy = RepositoryInfo::from_payload(json!({"watchers": 7, "full_name": "a/b"}))
            .unwrap();
        assert_eq!(legacy.stargazers, 7);
        assert_eq!(legacy.full_name(), Some("a/b"));

        assert!(RepositoryInfo::from_payload(json!({"name": "b"})).is_none());
    }

    #[test]
    fn test_snapshot_canonical_shape() {
        let mut snapshot = Snapshot {
            total_known_stargazers: 1,
            ..Default::default()
        };
        snapshot
            .stargazers
            .insert("octocat".into(), Stargazer::new("octocat", "u"));
        snapshot
            .geocodes
            .insert("NYC".into(), Geocode::new(40.7, -74.0).unwrap());

        let value: Value = serde_json::from_str(&snapshot.to_json().unwrap()).unwrap();
        assert_eq!(value["totalKnownStargazers"], 1);
        assert_eq!(value["stargazers"]["octocat"]["login"], "octocat");
        assert_eq!(value["stargazers"]["octocat"]["profileUrl"], "u");
        assert_eq!(value["geocodes"]["NYC"]["latitude"], 40.7);
        assert_eq!(snapshot.cached_points().len(), 1);
    }
}
