//! Constants for the fetch layer (timeouts, paging, pacing, rate-limit markers).

use std::time::Duration;

/// Default HTTP connect timeout (10 seconds).
pub const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Default per-request timeout (30 seconds).
pub const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Largest page size the forge API accepts for list endpoints.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Default page size for list endpoints.
pub const DEFAULT_PAGE_SIZE: u32 = MAX_PAGE_SIZE;

/// Sleep between rate-limit cycles when the server gives no advice (60 seconds).
pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(60);

/// Default minimum spacing between requests to the forge API host.
pub const DEFAULT_REQUEST_SPACING: Duration = Duration::from_millis(100);

/// Warning threshold for cumulative pacing delay per host (30 seconds).
pub const CUMULATIVE_DELAY_WARNING_THRESHOLD: Duration = Duration::from_secs(30);

/// Maximum Retry-After / reset delay honoured (1 hour).
pub const MAX_RETRY_AFTER: Duration = Duration::from_secs(3600);

/// Case-insensitive body marker the forge uses on rate-limited 403 responses.
pub const RATE_LIMIT_BODY_MARKER: &str = "rate limit";

/// Remaining-quota header; `0` on a 403 means the credential is spent.
pub const RATE_LIMIT_REMAINING_HEADER: &str = "x-ratelimit-remaining";

/// Epoch-seconds header telling when the credential's quota refills.
pub const RATE_LIMIT_RESET_HEADER: &str = "x-ratelimit-reset";

/// Media type requested from the forge REST API.
pub const FORGE_ACCEPT: &str = "application/vnd.github+json";
