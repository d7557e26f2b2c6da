//! Error types for the fetch layer.
//!
//! Two families live here: [`FetchError`] covers construction-time contract
//! violations that must stop a run before any network activity, and
//! [`FetchFailure`] describes why a single request did not produce a payload.
//! Failures travel inside [`super::FetchOutcome`] rather than as `Err`, so a
//! failed unit of work never aborts its siblings.

use thiserror::Error;

/// Misconfiguration detected while building fetch-layer values.
#[derive(Debug, Error)]
pub enum FetchError {
    /// No credentials were supplied.
    #[error("credential pool is empty: at least one API token is required")]
    EmptyCredentialPool,

    /// A credential could not be encoded as an authorization header.
    #[error("credential #{index} is blank or contains characters not allowed in a header")]
    InvalidCredential {
        /// Position of the offending credential in the pool.
        index: usize,
    },

    /// The resource locator is malformed or not http(s).
    #[error("invalid resource locator: {url}")]
    InvalidUrl {
        /// The rejected locator.
        url: String,
    },

    /// The page size is outside what the API accepts.
    #[error("invalid page size {value}: must be between 1 and {max}")]
    InvalidPageSize {
        /// The rejected value.
        value: u32,
        /// Largest accepted value.
        max: u32,
    },

    /// The HTTP client could not be constructed.
    #[error("HTTP client construction failed: {source}")]
    Client {
        /// The underlying builder error.
        #[source]
        source: reqwest::Error,
    },
}

impl FetchError {
    /// Creates an invalid URL error.
    pub fn invalid_url(url: impl Into<String>) -> Self {
        Self::InvalidUrl { url: url.into() }
    }

    /// Creates a client construction error.
    pub fn client(source: reqwest::Error) -> Self {
        Self::Client { source }
    }
}

/// Why a single request failed to yield a payload.
#[derive(Debug, Error)]
pub enum FetchFailure {
    /// Non-success HTTP status that is neither 404 nor a rate limit.
    #[error("HTTP {status} fetching {url}")]
    HttpStatus {
        /// The URL that returned an error status.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// Network-level error (DNS, connection reset, TLS).
    #[error("network error fetching {url}: {source}")]
    Network {
        /// The URL being fetched.
        url: String,
        /// The underlying transport error.
        #[source]
        source: reqwest::Error,
    },

    /// The request exceeded its timeout.
    #[error("timeout fetching {url}")]
    Timeout {
        /// The URL that timed out.
        url: String,
    },

    /// The body could not be read or did not match the expected shape.
    #[error("malformed response body from {url}: {message}")]
    Decode {
        /// The URL whose body was rejected.
        url: String,
        /// Decoder message.
        message: String,
    },
}

impl FetchFailure {
    /// Creates an HTTP status failure.
    pub fn http_status(url: impl Into<String>, status: u16) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
        }
    }

    /// Creates a network failure from a reqwest error.
    pub fn network(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Network {
            url: url.into(),
            source,
        }
    }

    /// Creates a timeout failure.
    pub fn timeout(url: impl Into<String>) -> Self {
        Self::Timeout { url: url.into() }
    }

    /// Creates a decode failure.
    pub fn decode(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Returns the HTTP status if this failure carries one.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_pool_display_mentions_token() {
        let msg = FetchError::EmptyCredentialPool.to_string();
        assert!(msg.contains("empty"), "got: {msg}");
        assert!(msg.contains("token"), "got: {msg}");
    }

    #[test]
    fn test_invalid_credential_display_never_contains_token() {
        let msg = FetchError::InvalidCredential { index: 2 }.to_string();
        assert!(msg.contains("#2"), "got: {msg}");
    }

    #[test]
    fn test_invalid_url_display() {
        let msg = FetchError::invalid_url("ftp://nope").to_string();
        assert!(msg.contains("ftp://nope"));
    }

    #[test]
    fn test_http_status_failure_display_and_status() {
        let failure = FetchFailure::http_status("https://api.example.com/x", 502);
        assert_eq!(failure.status(), Some(502));
        let msg = failure.to_string();
        assert!(msg.contains("502"));
        assert!(msg.contains("https://api.example.com/x"));
    }

    #[test]
    fn test_non_status_failures_have_no_status() {
        assert_eq!(FetchFailure::timeout("https://a").status(), None);
        assert_eq!(FetchFailure::decode("https://a", "eof").status(), None);
    }

    #[test]
    fn test_decode_failure_display() {
        let msg = FetchFailure::decode("https://a/b", "expected array").to_string();
        assert!(msg.contains("malformed"));
        assert!(msg.contains("expected array"));
    }
}
