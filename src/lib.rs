//! Forge Harvest Library
//!
//! Building blocks for harvesting data from a hosted code-forge API under
//! strict per-credential rate limits, and for turning free-text profile
//! locations into canonical countries.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`fetch`] - Credential rotation, rate-limit cooldowns, retries and pagination
//! - [`forge`] - Typed forge records and endpoint builders
//! - [`locate`] - Location-to-country resolution with an optional geocoding fallback
//! - [`harvest`] - Bounded worker pool and the contributor-country harvest
//! - [`config`] - File, environment and CLI configuration

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod fetch;
pub mod forge;
pub mod harvest;
pub mod locate;
#[cfg(test)]
pub(crate) mod test_support;
pub mod user_agent;

// Re-export commonly used types
pub use config::{ConfigError, FileConfig, Settings};
pub use fetch::{
    CredentialPool, FetchError, FetchOutcome, FetchRequest, FetchStats, Fetcher, PageCeiling,
    Paginated, RateLimiter, RetryPolicy, StopReason,
};
pub use forge::{ForgeApi, ForgeError, RepoSlug, repository_from_url};
pub use harvest::{
    ContributorCountry, Harvest, HarvestError, HarvestPool, HarvestStats, UnitOutcome,
    harvest_contributor_countries,
};
pub use locate::{Classification, LocationResolver, NominatimGeocoder, Verdict, normalize_country};
