//! Typed results of a fetch.

use super::{FetchFailure, PaginationHint};

/// A successfully decoded response.
#[derive(Debug, Clone)]
pub struct Page<T> {
    /// Decoded body.
    pub payload: T,
    /// Where the next page is.
    pub hint: PaginationHint,
}

/// What ran out when a fetch gave up.
#[derive(Debug)]
pub enum ExhaustionCause {
    /// Every credential stayed rate-limited through every cooldown cycle.
    RateLimited,
    /// Transient failures outlasted the backoff budget.
    Transient(FetchFailure),
}

/// Details of a fetch that gave up.
#[derive(Debug)]
pub struct Exhaustion {
    /// The locator that could not be fetched.
    pub url: String,
    /// Attempts (transient) or cycles (rate limit) consumed.
    pub attempts: u32,
    /// What ran out.
    pub cause: ExhaustionCause,
}

impl std::fmt::Display for Exhaustion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.cause {
            ExhaustionCause::RateLimited => write!(
                f,
                "{} still rate-limited after {} cycles",
                self.url, self.attempts
            ),
            ExhaustionCause::Transient(failure) => {
                write!(f, "{failure} (gave up after {} attempts)", self.attempts)
            }
        }
    }
}

/// Result of a fetch.
///
/// [`super::Fetcher::attempt`] can produce every variant except
/// `ExhaustedRetries`; [`super::Fetcher::fetch`] resolves `RateLimited` and
/// `TransientFailure` internally and only returns `Success`, `NotFound`,
/// `Failed` or `ExhaustedRetries`.
#[derive(Debug)]
pub enum FetchOutcome<T> {
    /// 2xx with a decoded body.
    Success(Page<T>),
    /// The credential used is out of quota.
    RateLimited {
        /// Server-advised wait, from `Retry-After` or the quota reset time.
        retry_after: Option<std::time::Duration>,
    },
    /// 404: the resource does not exist. Terminal.
    NotFound,
    /// Network-level or 5xx failure that may succeed on retry.
    TransientFailure(FetchFailure),
    /// Hard failure that retrying cannot fix.
    Failed(FetchFailure),
    /// The retry budget ran out. Callers skip the unit of work.
    ExhaustedRetries(Exhaustion),
}

impl<T> FetchOutcome<T> {
    /// Short label for logs and reports.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Success(_) => "success",
            Self::RateLimited { .. } => "rate_limited",
            Self::NotFound => "not_found",
            Self::TransientFailure(_) => "transient_failure",
            Self::Failed(_) => "failed",
            Self::ExhaustedRetries(_) => "exhausted_retries",
        }
    }

    /// Whether this is `Success`.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// The payload, discarding every non-success outcome.
    #[must_use]
    pub fn into_payload(self) -> Option<T> {
        match self {
            Self::Success(page) => Some(page.payload),
            _ => None,
        }
    }

    /// Maps the payload of a successful outcome.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> FetchOutcome<U> {
        match self {
            Self::Success(Page { payload, hint }) => FetchOutcome::Success(Page {
                payload: f(payload),
                hint,
            }),
            Self::RateLimited { retry_after } => FetchOutcome::RateLimited { retry_after },
            Self::NotFound => FetchOutcome::NotFound,
            Self::TransientFailure(failure) => FetchOutcome::TransientFailure(failure),
            Self::Failed(failure) => FetchOutcome::Failed(failure),
            Self::ExhaustedRetries(exhaustion) => FetchOutcome::ExhaustedRetries(exhaustion),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn success(value: u32) -> FetchOutcome<u32> {
        FetchOutcome::Success(Page {
            payload: value,
            hint: PaginationHint::Inferred,
        })
    }

    #[test]
    fn test_map_transforms_success_only() {
        assert_eq!(success(2).map(|v| v * 10).into_payload(), Some(20));
        let absent: FetchOutcome<u32> = FetchOutcome::NotFound;
        assert_eq!(absent.map(|v| v * 10).label(), "not_found");
    }

    #[test]
    fn test_labels_are_distinct() {
        let outcomes: Vec<FetchOutcome<u32>> = vec![
            success(1),
            FetchOutcome::RateLimited { retry_after: None },
            FetchOutcome::NotFound,
            FetchOutcome::TransientFailure(FetchFailure::timeout("https://a")),
            FetchOutcome::Failed(FetchFailure::http_status("https://a", 422)),
            FetchOutcome::ExhaustedRetries(Exhaustion {
                url: "https://a".to_string(),
                attempts: 3,
                cause: ExhaustionCause::RateLimited,
            }),
        ];
        let mut labels: Vec<&str> = outcomes.iter().map(FetchOutcome::label).collect();
        labels.dedup();
        assert_eq!(labels.len(), 6);
        assert!(outcomes[0].is_success());
        assert!(!outcomes[2].is_success());
    }

    #[test]
    fn test_exhaustion_display() {
        let rate_limited = Exhaustion {
            url: "https://api.example.com/users/a".to_string(),
            attempts: 3,
            cause: ExhaustionCause::RateLimited,
        };
        assert!(rate_limited.to_string().contains("rate-limited after 3 cycles"));

        let transient = Exhaustion {
            url: "https://api.example.com/users/a".to_string(),
            attempts: 3,
            cause: ExhaustionCause::Transient(FetchFailure::timeout(
                "https://api.example.com/users/a",
            )),
        };
        assert!(transient.to_string().contains("timeout"));
    }
}
