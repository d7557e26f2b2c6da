//! Fetch statistics shared by every worker.

use std::sync::atomic::{AtomicUsize, Ordering};

/// Counters for one fetcher and all its clones.
#[derive(Debug, Default)]
pub struct FetchStats {
    requests: AtomicUsize,
    rate_limited: AtomicUsize,
    cooldowns: AtomicUsize,
    retries: AtomicUsize,
    not_found: AtomicUsize,
    failed: AtomicUsize,
    exhausted: AtomicUsize,
}

impl FetchStats {
    /// Creates a tracker with zero counts.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// HTTP requests issued.
    #[must_use]
    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    /// Responses classified as rate-limited.
    #[must_use]
    pub fn rate_limited(&self) -> usize {
        self.rate_limited.load(Ordering::SeqCst)
    }

    /// Cooldown sleeps taken after a full rotation stayed rate-limited.
    #[must_use]
    pub fn cooldowns(&self) -> usize {
        self.cooldowns.load(Ordering::SeqCst)
    }

    /// Backoff retries after transient failures.
    #[must_use]
    pub fn retries(&self) -> usize {
        self.retries.load(Ordering::SeqCst)
    }

    /// Fetches that ended in `NotFound`.
    #[must_use]
    pub fn not_found(&self) -> usize {
        self.not_found.load(Ordering::SeqCst)
    }

    /// Fetches that ended in `Failed`.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.failed.load(Ordering::SeqCst)
    }

    /// Fetches that ended in `ExhaustedRetries`.
    #[must_use]
    pub fn exhausted(&self) -> usize {
        self.exhausted.load(Ordering::SeqCst)
    }

    pub(crate) fn record_request(&self) {
        self.requests.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn record_rate_limited(&self) {
        self.rate_limited.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn record_cooldown(&self) {
        self.cooldowns.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn record_retry(&self) {
        self.retries.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn record_not_found(&self) {
        self.not_found.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn record_failed(&self) {
        self.failed.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn record_exhausted(&self) {
        self.exhausted.fetch_add(1, Ordering::SeqCst);
    }
}
