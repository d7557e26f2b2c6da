//! Shared helpers for integration tests.

#![allow(dead_code)]

pub mod socket_guard;

use std::sync::Arc;
use std::time::Duration;

use forge_harvest::fetch::{CredentialPool, Fetcher, RateLimiter, RetryPolicy, build_forge_client};
use forge_harvest::forge::ForgeApi;
use secrecy::SecretString;

/// Tokens `token-0`, `token-1`, ...
pub fn tokens(count: usize) -> Vec<SecretString> {
    (0..count)
        .map(|i| SecretString::new(format!("token-{i}")))
        .collect()
}

/// A retry policy with no jitter and a zero cooldown, so tests run fast.
pub fn fast_policy(max_attempts: u32) -> RetryPolicy {
    RetryPolicy::new(
        max_attempts,
        Duration::from_millis(10),
        Duration::from_millis(20),
        2.0,
    )
    .with_jitter(Duration::ZERO)
    .with_cooldown(Duration::ZERO)
}

/// A fetcher with `token_count` credentials and no pacing.
pub fn fetcher(token_count: usize, max_attempts: u32) -> Fetcher {
    let client = build_forge_client("forge-harvest-tests", Duration::from_secs(5)).unwrap();
    Fetcher::new(
        client,
        CredentialPool::new(tokens(token_count)).unwrap(),
        fast_policy(max_attempts),
        Arc::new(RateLimiter::disabled()),
    )
}

/// A forge API rooted at a mock server.
pub fn forge_api(base_url: &str, token_count: usize) -> ForgeApi {
    ForgeApi::new(fetcher(token_count, 3), base_url).unwrap()
}
