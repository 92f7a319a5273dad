//! Heatmap point output formats.

use crate::models::Point;
use chrono::{DateTime, Utc};
use serde_json::{json, Value};

/// Output format for the point file.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// GeoJSON FeatureCollection (default)
    #[default]
    Geojson,
    /// Plain JSON array of [lat, lng] pairs
    Json,
    /// CSV with a latitude,longitude header
    Csv,
}

impl OutputFormat {
    pub fn render(&self, points: &[Point], generated_at: DateTime<Utc>) -> String {
        match self {
            OutputFormat::Geojson => generate_geojson(points, generated_at),
            OutputFormat::Json => generate_json(points),
            OutputFormat::Csv => generate_csv(points),
        }
    }
}

/// One `Point` feature per stargazer, each with weight 1.
///
/// GeoJSON positions are `[longitude, latitude]`.
pub fn generate_geojson(points: &[Point], generated_at: DateTime<Utc>) -> String {
    let features: Vec<Value> = points
        .iter()
        .map(|p| {
            json!({
                "type": "Feature",
                "geometry": {"type": "Point", "coordinates": [p.longitude, p.latitude]},
                "properties": {"weight": 1}
            })
        })
        .collect();

    let collection = json!({
        "type": "FeatureCollection",
        "generated_at": generated_at.to_rfc3339(),
        "features": features,
    });

    serde_json::to_string_pretty(&collection).unwrap_or_default()
}

pub fn generate_json(points: &[Point]) -> String {
    let pairs: Vec<[f64; 2]> = points.iter().map(|p| [p.latitude, p.longitude]).collect();
    serde_json::to_string(&pairs).unwrap_or_default()
}

pub fn generate_csv(points: &[Point]) -> String {
    let mut output = String::from("latitude,longitude\n");
    for p in points {
        output.push_str(&format!("{},{}\n", p.latitude, p.longitude));
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    fn points() -> Vec<Point> {
        vec![
            Point {
                latitude: 40.7,
                longitude: -74.0,
            },
            Point {
                latitude: 40.7,
                longitude: -74.0,
            },
        ]
    }

    #[test]
    fn test_geojson_positions_are_lng_lat() {
        let output = generate_geojson(&points(), Utc::now());
        let value: Value = serde_json::from_str(&output).unwrap();

        assert_eq!(value["type"], "FeatureCollection");
        assert_eq!(value["features"].as_array().unwrap().len(), 2);
        assert_eq!(value["features"][0]["geometry"]["coordinates"][0], -74.0);
        assert_eq!(value["features"][0]["geometry"]["coordinates"][1], 40.7);
    }

    #[test]
    fn test_json_pairs() {
        assert_eq!(generate_json(&points()), "[[40.7,-74.0],[40.7,-74.0]]");
        assert_eq!(generate_json(&[]), "[]");
    }

    #[test]
    fn test_csv() {
        let csv = generate_csv(&points());
        assert_eq!(csv.lines().count(), 3);
        assert!(csv.starts_with("latitude,longitude\n40.7,-74\n"));
    }
}
