//! Geocode entry shapes found in snapshots written by older releases.
//!
//! Each matcher either produces a canonical [`Geocode`] or declines. They are
//! tried in order; supporting a new historical format means adding one entry
//! to [`SHAPES`].

use crate::models::Geocode;
use serde_json::Value;

type ShapeMatcher = fn(&Value) -> Option<Geocode>;

/// Recognized shapes, most specific first.
const SHAPES: &[(&str, ShapeMatcher)] = &[
    ("canonical", canonical),
    ("lat/lng", lat_lng),
    ("lat/lon", lat_lon),
    ("minified LatLng", minified_latlng),
    ("coordinate pair", coordinate_pair),
];

/// Field pairs emitted by minified map-widget `LatLng` objects over the years.
const MINIFIED_FIELDS: &[(&str, &str)] = &[
    ("Xa", "Ya"),
    ("$a", "ab"),
    ("jb", "kb"),
    ("lb", "mb"),
    ("k", "D"),
    ("A", "F"),
    ("G", "K"),
    ("H", "L"),
];

/// Normalize a persisted geocode entry, or `None` if no shape matches.
pub fn match_geocode(value: &Value) -> Option<Geocode> {
    SHAPES.iter().find_map(|(_, matcher)| matcher(value))
}

/// Name of the shape that recognizes `value`.
pub fn shape_name(value: &Value) -> Option<&'static str> {
    SHAPES
        .iter()
        .find(|(_, matcher)| matcher(value).is_some())
        .map(|(name, _)| *name)
}

fn canonical(value: &Value) -> Option<Geocode> {
    fields(value, "latitude", "longitude")
}

fn lat_lng(value: &Value) -> Option<Geocode> {
    fields(value, "lat", "lng")
}

fn lat_lon(value: &Value) -> Option<Geocode> {
    fields(value, "lat", "lon")
}

fn minified_latlng(value: &Value) -> Option<Geocode> {
    MINIFIED_FIELDS
        .iter()
        .find_map(|(lat, lng)| fields(value, lat, lng))
}

fn coordinate_pair(value: &Value) -> Option<Geocode> {
    match value.as_array()?.as_slice() {
        [lat, lng] => Geocode::new(number(lat)?, number(lng)?),
        _ => None,
    }
}

fn fields(value: &Value, lat: &str, lng: &str) -> Option<Geocode> {
    let object = value.as_object()?;
    Geocode::new(number(object.get(lat)?)?, number(object.get(lng)?)?)
}

/// Numbers may have been persisted as strings.
fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
