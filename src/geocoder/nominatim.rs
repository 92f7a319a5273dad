//! OpenStreetMap Nominatim backend.

use super::GeocodeProvider;
use crate::error::{Result, StarheatError};
use crate::models::Geocode;
use serde::Deserialize;

/// Nominatim reports coordinates as decimal strings.
#[derive(Debug, Deserialize)]
struct Place {
    lat: String,
    lon: String,
}

pub struct NominatimGeocoder {
    http: reqwest::Client,
    url: String,
}

impl NominatimGeocoder {
    pub fn new(http: reqwest::Client, url: String) -> Self {
        Self { http, url }
    }
}

impl GeocodeProvider for NominatimGeocoder {
    async fn geocode(&self, address: &str) -> Result<Option<Geocode>> {
        let response = self
            .http
            .get(&self.url)
            .query(&[("q", address), ("format", "json"), ("limit", "1")])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(StarheatError::Api {
                status: status.as_u16(),
                message: format!("geocoding {:?} failed", address),
            });
        }

        let places: Vec<Place> = response.json().await?;
        let Some(place) = places.first() else {
            return Ok(None);
        };

        let lat = place.lat.parse::<f64>();
        let lon = place.lon.parse::<f64>();
        match (lat, lon) {
            (Ok(lat), Ok(lon)) => Ok(Geocode::new(lat, lon)),
            _ => Err(StarheatError::InvalidResponse(format!(
                "unparseable coordinates {:?},{:?}",
                place.lat, place.lon
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::{
        matchers::{method, path, query_param},
        Mock, MockServer, ResponseTemplate,
    };

    #[tokio::test]
    async fn test_string_coordinates() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .and(query_param("q", "Oslo"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!([{"lat": "59.91", "lon": "10.75", "display_name": "Oslo"}])),
            )
            .mount(&mock_server)
            .await;

        let geocoder =
            NominatimGeocoder::new(reqwest::Client::new(), format!("{}/search", mock_server.uri()));

        assert_eq!(geocoder.geocode("Oslo").await.unwrap(), Geocode::new(59.91, 10.75));
    }

    #[tokio::test]
    async fn test_empty_list_is_no_match() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&mock_server)
            .await;

        let geocoder =
            NominatimGeocoder::new(reqwest::Client::new(), format!("{}/search", mock_server.uri()));

        assert_eq!(geocoder.geocode("Atlantis").await.unwrap(), None);
    }
}
