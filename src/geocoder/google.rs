//! Google Geocoding API backend.

use super::GeocodeProvider;
use crate::error::{Result, StarheatError};
use crate::models::Geocode;
use serde::Deserialize;
use tracing::debug;

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    status: String,
    #[serde(default)]
    results: Vec<GeocodeResult>,
    #[serde(default)]
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeocodeResult {
    geometry: Geometry,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    location: LatLng,
}

#[derive(Debug, Deserialize)]
struct LatLng {
    lat: f64,
    lng: f64,
}

pub struct GoogleGeocoder {
    http: reqwest::Client,
    url: String,
    api_key: Option<String>,
}

impl GoogleGeocoder {
    pub fn new(http: reqwest::Client, url: String, api_key: Option<String>) -> Self {
        Self { http, url, api_key }
    }
}

impl GeocodeProvider for GoogleGeocoder {
    async fn geocode(&self, address: &str) -> Result<Option<Geocode>> {
        let mut request = self.http.get(&self.url).query(&[("address", address)]);
        if let Some(ref key) = self.api_key {
            request = request.query(&[("key", key)]);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(StarheatError::Api {
                status: status.as_u16(),
                message: format!("geocoding {:?} failed", address),
            });
        }

        let body: GeocodeResponse = response.json().await?;
        match body.status.as_str() {
            "OK" => Ok(body
                .results
                .first()
                .and_then(|r| Geocode::new(r.geometry.location.lat, r.geometry.location.lng))),
            "ZERO_RESULTS" => {
                debug!("No geocode match for {:?}", address);
                Ok(None)
            }
            other => Err(StarheatError::InvalidResponse(format!(
                "geocoder status {}: {}",
                other,
                body.error_message.unwrap_or_default()
            ))),
        }
    }
}
