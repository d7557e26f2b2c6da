//! Per-host request pacing and server delay parsing.
//!
//! [`RateLimiter`] enforces a minimum spacing between consecutive requests to
//! the same host. Requests to different hosts never wait on each other, so the
//! forge API and the geocoder each keep their own cadence.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use std::time::Duration;
//! use forge_harvest::fetch::RateLimiter;
//!
//! # async fn example() {
//! let limiter = Arc::new(RateLimiter::new(Duration::from_secs(1)));
//! limiter.acquire("https://nominatim.example.org/search?q=a").await; // immediate
//! limiter.acquire("https://nominatim.example.org/search?q=b").await; // waits ~1s
//! limiter.acquire("https://api.example.com/users/x").await;          // immediate
//! # }
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use dashmap::DashMap;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, instrument, warn};

use super::constants::{CUMULATIVE_DELAY_WARNING_THRESHOLD, MAX_RETRY_AFTER};

/// Per-host pacer shared across workers behind an `Arc`.
#[derive(Debug)]
pub struct RateLimiter {
    /// Minimum delay between requests to the same host.
    spacing: Duration,

    /// Whether pacing is disabled (spacing of zero).
    disabled: bool,

    /// Per-host state. Values are `Arc` so the map shard lock is released
    /// before awaiting on the inner mutex.
    hosts: DashMap<String, Arc<HostState>>,
}

#[derive(Debug)]
struct HostState {
    /// `None` until the first request to this host.
    last_request: Mutex<Option<Instant>>,

    /// Cumulative delay applied to this host, in milliseconds.
    cumulative_delay_ms: AtomicU64,
}

impl HostState {
    fn new() -> Self {
        Self {
            last_request: Mutex::new(None),
            cumulative_delay_ms: AtomicU64::new(0),
        }
    }

    #[allow(clippy::cast_possible_truncation)]
    fn add_cumulative_delay(&self, delay: Duration) -> Duration {
        let delay_ms = delay.as_millis() as u64;
        let total = self
            .cumulative_delay_ms
            .fetch_add(delay_ms, Ordering::SeqCst)
            + delay_ms;
        Duration::from_millis(total)
    }
}

impl RateLimiter {
    /// Creates a pacer with the given spacing; a zero spacing disables it.
    #[must_use]
    #[instrument(skip_all, fields(spacing_ms = spacing.as_millis()))]
    pub fn new(spacing: Duration) -> Self {
        if spacing.is_zero() {
            return Self::disabled();
        }
        debug!("creating request pacer");
        Self {
            spacing,
            disabled: false,
            hosts: DashMap::new(),
        }
    }

    /// Creates a pacer that never delays.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            spacing: Duration::ZERO,
            disabled: true,
            hosts: DashMap::new(),
        }
    }

    /// Returns whether pacing is disabled.
    #[must_use]
    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    /// Returns the configured spacing.
    #[must_use]
    pub fn spacing(&self) -> Duration {
        self.spacing
    }

    /// Waits until a request to `url`'s host respects the spacing, then
    /// records the request time. The first request to a host is immediate.
    #[instrument(skip(self), fields(host))]
    pub async fn acquire(&self, url: &str) {
        if self.disabled {
            return;
        }

        let host = extract_host(url);
        tracing::Span::current().record("host", &host);

        let state = self
            .hosts
            .entry(host.clone())
            .or_insert_with(|| Arc::new(HostState::new()))
            .clone();

        let mut last_request = state.last_request.lock().await;

        if let Some(previous) = *last_request {
            let elapsed = previous.elapsed();
            if elapsed < self.spacing {
                let delay = self.spacing.saturating_sub(elapsed);
                let cumulative = state.add_cumulative_delay(delay);
                debug!(
                    host = %host,
                    delay_ms = delay.as_millis(),
                    cumulative_ms = cumulative.as_millis(),
                    "pacing request"
                );
                if cumulative >= CUMULATIVE_DELAY_WARNING_THRESHOLD {
                    warn!(
                        host = %host,
                        cumulative_delay_secs = cumulative.as_secs(),
                        "heavy pacing - consider fewer workers for this host"
                    );
                }
                tokio::time::sleep(delay).await;
            }
        }

        *last_request = Some(Instant::now());
    }

    /// Records a server-mandated delay (Retry-After or quota reset) for `url`'s host.
    #[instrument(skip(self), fields(host))]
    pub fn record_rate_limit(&self, url: &str, delay: Duration) {
        let host = extract_host(url);
        tracing::Span::current().record("host", &host);

        let state = self
            .hosts
            .entry(host.clone())
            .or_insert_with(|| Arc::new(HostState::new()));
        let cumulative = state.add_cumulative_delay(delay);

        debug!(
            host = %host,
            delay_ms = delay.as_millis(),
            cumulative_ms = cumulative.as_millis(),
            "recorded server rate limit"
        );
        if cumulative >= CUMULATIVE_DELAY_WARNING_THRESHOLD {
            warn!(
                host = %host,
                cumulative_delay_secs = cumulative.as_secs(),
                "repeated server rate limiting - credential pool may be too small"
            );
        }
    }

    /// Cumulative delay recorded for `url`'s host.
    #[must_use]
    pub fn cumulative_delay(&self, url: &str) -> Duration {
        self.hosts
            .get(&extract_host(url))
            .map_or(Duration::ZERO, |state| {
                Duration::from_millis(state.cumulative_delay_ms.load(Ordering::SeqCst))
            })
    }
}

/// Extracts the lowercase host from a URL, or `"unknown"` when unparseable.
///
/// ```
/// use forge_harvest::fetch::rate_limiter::extract_host;
///
/// assert_eq!(extract_host("https://API.Example.com/repos"), "api.example.com");
/// assert_eq!(extract_host("http://127.0.0.1:8080/x"), "127.0.0.1");
/// assert_eq!(extract_host("not a url"), "unknown");
/// ```
#[must_use]
pub fn extract_host(url: &str) -> String {
    url::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_lowercase))
        .unwrap_or_else(|| "unknown".to_string())
}

/// Parses a `Retry-After` header (integer seconds or HTTP-date).
///
/// Negative or unparseable values yield `None`; past dates yield zero;
/// values above one hour are capped.
///
/// ```
/// use std::time::Duration;
/// use forge_harvest::fetch::rate_limiter::parse_retry_after;
///
/// assert_eq!(parse_retry_after("120"), Some(Duration::from_secs(120)));
/// assert_eq!(parse_retry_after("soon"), None);
/// ```
#[must_use]
#[instrument]
pub fn parse_retry_after(header_value: &str) -> Option<Duration> {
    let header_value = header_value.trim();

    if let Ok(seconds) = header_value.parse::<i64>() {
        if seconds < 0 {
            debug!(seconds, "negative Retry-After value, ignoring");
            return None;
        }
        #[allow(clippy::cast_sign_loss)]
        let duration = Duration::from_secs(seconds as u64);
        return Some(cap_server_delay(duration));
    }

    match httpdate::parse_http_date(header_value) {
        Ok(datetime) => Some(
            datetime
                .duration_since(SystemTime::now())
                .map_or(Duration::ZERO, cap_server_delay),
        ),
        Err(_) => {
            debug!(header_value, "unparseable Retry-After value");
            None
        }
    }
}

/// Parses an `x-ratelimit-reset` header (epoch seconds) into the delay until reset.
///
/// ```
/// use std::time::Duration;
/// use forge_harvest::fetch::rate_limiter::parse_rate_limit_reset;
///
/// assert_eq!(parse_rate_limit_reset("0"), Some(Duration::ZERO));
/// assert_eq!(parse_rate_limit_reset("tomorrow"), None);
/// ```
#[must_use]
pub fn parse_rate_limit_reset(header_value: &str) -> Option<Duration> {
    let epoch_secs = header_value.trim().parse::<u64>().ok()?;
    let reset_at = UNIX_EPOCH + Duration::from_secs(epoch_secs);
    Some(
        reset_at
            .duration_since(SystemTime::now())
            .map_or(Duration::ZERO, cap_server_delay),
    )
}

fn cap_server_delay(delay: Duration) -> Duration {
    if delay > MAX_RETRY_AFTER {
        warn!(
            delay_secs = delay.as_secs(),
            max_secs = MAX_RETRY_AFTER.as_secs(),
            "server delay exceeds maximum, capping at 1 hour"
        );
        MAX_RETRY_AFTER
    } else {
        delay
    }
}
