//! Geocoding providers.
//!
//! A provider turns a free-text address into coordinates. `Ok(None)` means the
//! provider answered but found no match; errors are transport or protocol
//! failures.

pub mod google;
pub mod nominatim;

pub use google::GoogleGeocoder;
pub use nominatim::NominatimGeocoder;

use crate::error::Result;
use crate::models::Geocode;
use serde::{Deserialize, Serialize};

#[allow(async_fn_in_trait)]
pub trait GeocodeProvider {
    /// Resolve `address` to its best match.
    async fn geocode(&self, address: &str) -> Result<Option<Geocode>>;
}

/// Which backend to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Google Geocoding API
    #[default]
    Google,
    /// OpenStreetMap Nominatim
    Nominatim,
}

impl ProviderKind {
    pub fn default_url(&self) -> &'static str {
        match self {
            ProviderKind::Google => "https://maps.googleapis.com/maps/api/geocode/json",
            ProviderKind::Nominatim => "https://nominatim.openstreetmap.org/search",
        }
    }
}

/// A configured provider of either kind.
pub enum Provider {
    Google(GoogleGeocoder),
    Nominatim(NominatimGeocoder),
}

impl Provider {
    pub fn new(
        kind: ProviderKind,
        http: reqwest::Client,
        url: Option<&str>,
        api_key: Option<String>,
    ) -> Self {
        let url = url.unwrap_or(kind.default_url()).to_string();
        match kind {
            ProviderKind::Google => Provider::Google(GoogleGeocoder::new(http, url, api_key)),
            ProviderKind::Nominatim => Provider::Nominatim(NominatimGeocoder::new(http, url)),
        }
    }
}

impl GeocodeProvider for Provider {
    async fn geocode(&self, address: &str) -> Result<Option<Geocode>> {
        match self {
            Provider::Google(google) => google.geocode(address).await,
            Provider::Nominatim(nominatim) => nominatim.geocode(address).await,
        }
    }
}
