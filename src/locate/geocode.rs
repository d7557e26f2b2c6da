//! External geocoding fallback.
//!
//! The [`Geocoder`] trait is the seam: the resolver only ever asks "which
//! country is this free-text place in". [`NominatimGeocoder`] answers it with
//! an OpenStreetMap Nominatim search.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, instrument};
use url::Url;

use crate::fetch::{RateLimiter, build_http_client};
use crate::user_agent::geocoder_user_agent;

use super::GeocodeError;

/// Public Nominatim endpoint.
pub const DEFAULT_NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org";

/// Per-request timeout for geocoding.
pub const GEOCODE_TIMEOUT: Duration = Duration::from_secs(10);

/// Minimum spacing between geocoding requests (Nominatim allows one per second).
pub const GEOCODE_SPACING: Duration = Duration::from_secs(1);

/// Looks up the country of a free-text place.
///
/// # Object Safety
///
/// Uses `async_trait` so resolvers can hold an `Arc<dyn Geocoder>`.
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Short name reported as the deciding step.
    fn name(&self) -> &'static str;

    /// Returns the country name the service reports, if any.
    async fn country_of(&self, query: &str) -> Result<Option<String>, GeocodeError>;
}

#[derive(Debug, Deserialize)]
struct Place {
    #[serde(default)]
    address: Option<Address>,
}

#[derive(Debug, Deserialize)]
struct Address {
    #[serde(default)]
    country: Option<String>,
}

/// Geocoder backed by a Nominatim `/search` endpoint.
#[derive(Debug, Clone)]
pub struct NominatimGeocoder {
    client: Client,
    search_url: Url,
    pacer: Arc<RateLimiter>,
}

impl NominatimGeocoder {
    /// A geocoder against the public Nominatim service.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError::Client`] if the HTTP client cannot be built.
    pub fn new() -> Result<Self, GeocodeError> {
        Self::with_base_url(DEFAULT_NOMINATIM_URL)
    }

    /// A geocoder against a self-hosted or mock Nominatim instance.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError::InvalidUrl`] for an unusable base URL and
    /// [`GeocodeError::Client`] if the HTTP client cannot be built.
    pub fn with_base_url(base_url: &str) -> Result<Self, GeocodeError> {
        let trimmed = base_url.trim().trim_end_matches('/');
        let search_url = Url::parse(&format!("{trimmed}/search"))
            .map_err(|_| GeocodeError::invalid_url(base_url))?;
        if !matches!(search_url.scheme(), "http" | "https") {
            return Err(GeocodeError::invalid_url(base_url));
        }
        let client = build_http_client(&geocoder_user_agent(), GEOCODE_TIMEOUT)?;
        Ok(Self {
            client,
            search_url,
            pacer: Arc::new(RateLimiter::new(GEOCODE_SPACING)),
        })
    }

    /// Replaces the request spacing (zero disables pacing).
    #[must_use]
    pub fn with_spacing(mut self, spacing: Duration) -> Self {
        self.pacer = Arc::new(RateLimiter::new(spacing));
        self
    }

    fn query_url(&self, query: &str) -> Url {
        let mut url = self.search_url.clone();
        url.query_pairs_mut()
            .append_pair("q", query)
            .append_pair("format", "json")
            .append_pair("addressdetails", "1")
            .append_pair("limit", "1")
            .append_pair("accept-language", "en");
        url
    }
}

#[async_trait]
impl Geocoder for NominatimGeocoder {
    fn name(&self) -> &'static str {
        "nominatim"
    }

    #[instrument(skip(self))]
    async fn country_of(&self, query: &str) -> Result<Option<String>, GeocodeError> {
        let url = self.query_url(query);
        self.pacer.acquire(url.as_str()).await;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| GeocodeError::Request { source })?;

        let status = response.status();
        if !status.is_success() {
            return Err(GeocodeError::Status {
                status: status.as_u16(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|source| GeocodeError::Request { source })?;
        let places: Vec<Place> =
            serde_json::from_slice(&body).map_err(|error| GeocodeError::Decode {
                message: error.to_string(),
            })?;

        let country = places
            .into_iter()
            .next()
            .and_then(|place| place.address)
            .and_then(|address| address.country)
            .filter(|country| !country.trim().is_empty());
        debug!(?country, "geocoder answered");
        Ok(country)
    }
}
