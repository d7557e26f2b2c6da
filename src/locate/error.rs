//! Geocoding error types.

use thiserror::Error;

/// Failures of the geocoding fallback.
///
/// These never reach callers of [`super::LocationResolver::resolve`]; they
/// are logged and turned into an unresolved verdict.
#[derive(Debug, Error)]
pub enum GeocodeError {
    /// The HTTP client could not be built.
    #[error("cannot build geocoder client: {0}")]
    Client(#[from] crate::fetch::FetchError),

    /// The service base URL is unusable.
    #[error("invalid geocoder URL: {url}")]
    InvalidUrl {
        /// The rejected URL.
        url: String,
    },

    /// The request never produced a response.
    #[error("geocoder request failed: {source}")]
    Request {
        /// Underlying transport error.
        #[source]
        source: reqwest::Error,
    },

    /// The service answered with a non-success status.
    #[error("geocoder returned HTTP {status}")]
    Status {
        /// HTTP status code.
        status: u16,
    },

    /// The body was not the expected JSON.
    #[error("cannot decode geocoder response: {message}")]
    Decode {
        /// Parser message.
        message: String,
    },
}

impl GeocodeError {
    /// Creates an invalid-URL error.
    #[must_use]
    pub fn invalid_url(url: impl Into<String>) -> Self {
        Self::InvalidUrl { url: url.into() }
    }

    /// Whether the failure was a timeout.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Request { source } if source.is_timeout())
    }
}
