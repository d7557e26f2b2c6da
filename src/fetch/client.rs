//! Shared HTTP client construction for forge and geocoder traffic.

use std::time::Duration;

use reqwest::Client;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};

use super::FetchError;
use super::constants::{CONNECT_TIMEOUT_SECS, FORGE_ACCEPT};

/// Builds an HTTP client with the crate's timeout, compression and
/// User-Agent policy.
///
/// `request_timeout` bounds each whole request; connection setup is
/// bounded separately.
///
/// # Errors
///
/// Returns [`FetchError::Client`] when the TLS backend cannot be initialised.
pub fn build_http_client(
    user_agent: &str,
    request_timeout: Duration,
) -> Result<Client, FetchError> {
    base_builder(user_agent, request_timeout)
        .build()
        .map_err(FetchError::client)
}

/// Builds the client used against the forge REST API.
///
/// # Errors
///
/// Returns [`FetchError::Client`] when the TLS backend cannot be initialised.
pub fn build_forge_client(
    user_agent: &str,
    request_timeout: Duration,
) -> Result<Client, FetchError> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static(FORGE_ACCEPT));
    base_builder(user_agent, request_timeout)
        .default_headers(headers)
        .build()
        .map_err(FetchError::client)
}

fn base_builder(user_agent: &str, request_timeout: Duration) -> reqwest::ClientBuilder {
    Client::builder()
        .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS).min(request_timeout))
        .timeout(request_timeout)
        .user_agent(user_agent)
        .gzip(true)
}
