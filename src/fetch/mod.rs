//! Resilient fetch layer for a token-authenticated REST API.
//!
//! Every request is authenticated with the next credential of a shared
//! round-robin pool. Rate-limited credentials are rotated out immediately;
//! when the whole pool is exhausted the fetcher cools down and starts a new
//! cycle. Transient failures back off exponentially with jitter, and list
//! resources are accumulated page by page.
//!
//! # Features
//!
//! - Round-robin credential rotation safe across concurrent workers
//! - Rate-limit detection from status, body and quota headers
//! - Cooldown honouring `Retry-After` and quota reset times
//! - Bounded exponential backoff for timeouts and 5xx responses
//! - `Link` header pagination with page ceilings
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use forge_harvest::fetch::{
//!     CredentialPool, FetchOutcome, FetchRequest, Fetcher, RateLimiter, RetryPolicy,
//!     build_forge_client,
//! };
//! use secrecy::SecretString;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let pool = CredentialPool::new([SecretString::new("ghp_example".to_string())])?;
//! let client = build_forge_client("forge-harvest/0.1", Duration::from_secs(30))?;
//! let fetcher = Fetcher::new(
//!     client,
//!     pool,
//!     RetryPolicy::default(),
//!     Arc::new(RateLimiter::new(Duration::from_millis(100))),
//! );
//!
//! let request = FetchRequest::new("https://api.github.com", "users/octocat")?;
//! if let FetchOutcome::Success(page) = fetcher.fetch::<serde_json::Value>(&request).await {
//!     println!("{}", page.payload["login"]);
//! }
//! # Ok(())
//! # }
//! ```

mod client;
pub mod constants;
mod credentials;
mod error;
mod fetcher;
mod outcome;
mod pagination;
pub mod rate_limiter;
mod request;
mod retry;
mod stats;

pub use client::{build_forge_client, build_http_client};
pub use constants::DEFAULT_PAGE_SIZE;
pub use credentials::{Credential, CredentialPool};
pub use error::{FetchError, FetchFailure};
pub use fetcher::Fetcher;
pub use outcome::{Exhaustion, ExhaustionCause, FetchOutcome, Page};
pub use pagination::{ListBody, PageCeiling, Paginated, PaginationHint, StopReason};
pub use rate_limiter::{RateLimiter, extract_host, parse_retry_after};
pub use request::FetchRequest;
pub use retry::{
    DEFAULT_MAX_RETRIES, FailureType, RetryDecision, RetryPolicy, classify_failure,
    classify_http_status,
};
pub use stats::FetchStats;
