//! The resilient fetcher.
//!
//! [`Fetcher`] owns the credential rotation, the retry policy and the
//! per-host pacer. It is cheap to clone and every clone shares the same
//! pool cursor and statistics, so workers can each hold one.

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{AUTHORIZATION, HeaderMap, LINK, RETRY_AFTER};
use reqwest::{Client, StatusCode};
use serde::de::{DeserializeOwned, IgnoredAny};
use tracing::{debug, info, instrument, warn};

use super::constants::{
    MAX_PAGE_SIZE, RATE_LIMIT_BODY_MARKER, RATE_LIMIT_REMAINING_HEADER, RATE_LIMIT_RESET_HEADER,
};
use super::rate_limiter::{RateLimiter, parse_rate_limit_reset, parse_retry_after};
use super::retry::{FailureType, RetryDecision, RetryPolicy, classify_failure};
use super::{
    Credential, CredentialPool, DEFAULT_PAGE_SIZE, Exhaustion, ExhaustionCause, FetchError,
    FetchFailure, FetchOutcome, FetchRequest, FetchStats, ListBody, Page, PageCeiling, Paginated,
    PaginationHint, StopReason,
};

/// Credential-rotating, retrying, paginating client for one REST API family.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    pool: Arc<CredentialPool>,
    policy: RetryPolicy,
    pacer: Arc<RateLimiter>,
    stats: Arc<FetchStats>,
    page_size: u32,
}

impl Fetcher {
    /// Creates a fetcher with the default page size.
    #[must_use]
    pub fn new(
        client: Client,
        pool: CredentialPool,
        policy: RetryPolicy,
        pacer: Arc<RateLimiter>,
    ) -> Self {
        debug!(
            credentials = pool.len(),
            max_attempts = policy.max_attempts(),
            cooldown_secs = policy.cooldown().as_secs(),
            spacing_ms = pacer.spacing().as_millis(),
            "creating fetcher"
        );
        Self {
            client,
            pool: Arc::new(pool),
            policy,
            pacer,
            stats: Arc::new(FetchStats::new()),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Replaces the page size used by [`Self::paginate`].
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::InvalidPageSize`] outside `1..=100`.
    pub fn with_page_size(mut self, page_size: u32) -> Result<Self, FetchError> {
        if !(1..=MAX_PAGE_SIZE).contains(&page_size) {
            return Err(FetchError::InvalidPageSize {
                value: page_size,
                max: MAX_PAGE_SIZE,
            });
        }
        self.page_size = page_size;
        Ok(self)
    }

    /// Page size requested by [`Self::paginate`].
    #[must_use]
    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Number of credentials in rotation.
    #[must_use]
    pub fn pool_size(&self) -> usize {
        self.pool.len()
    }

    /// Shared statistics.
    #[must_use]
    pub fn stats(&self) -> &FetchStats {
        &self.stats
    }

    /// The retry policy in force.
    #[must_use]
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Issues exactly one request with the next credential and classifies the response.
    pub async fn attempt<T: DeserializeOwned>(&self, request: &FetchRequest) -> FetchOutcome<T> {
        self.attempt_with(self.pool.claim(), request).await
    }

    /// Claims the next credential not yet seen rate-limited in this cycle.
    ///
    /// Other workers advance the shared cursor concurrently, so after one
    /// full lap of claims the last one is used even if it was seen.
    fn claim_untried(&self, limited: &[bool]) -> &Credential {
        let mut credential = self.pool.claim();
        for _ in 1..self.pool.len() {
            if !limited[credential.index()] {
                break;
            }
            credential = self.pool.claim();
        }
        credential
    }

    #[instrument(skip_all, fields(url = %request, credential = credential.index()))]
    async fn attempt_with<T: DeserializeOwned>(
        &self,
        credential: &Credential,
        request: &FetchRequest,
    ) -> FetchOutcome<T> {
        let url = request.as_str();

        self.pacer.acquire(url).await;
        self.stats.record_request();
        debug!("issuing request");

        let response = match self
            .client
            .get(request.url().clone())
            .header(AUTHORIZATION, credential.authorization().clone())
            .send()
            .await
        {
            Ok(response) => response,
            Err(error) => return transport_outcome(url, error),
        };

        let status = response.status();
        let headers = response.headers().clone();

        if status.is_success() {
            let hint = PaginationHint::from_link_header(
                headers.get(LINK).and_then(|value| value.to_str().ok()),
            );
            return match response.bytes().await {
                Ok(body) => match serde_json::from_slice::<T>(&body) {
                    Ok(payload) => FetchOutcome::Success(Page { payload, hint }),
                    Err(error) => {
                        FetchOutcome::Failed(FetchFailure::decode(url, error.to_string()))
                    }
                },
                Err(error) => transport_outcome(url, error),
            };
        }

        if status == StatusCode::NOT_FOUND {
            return FetchOutcome::NotFound;
        }

        let body = response.text().await.unwrap_or_default();
        if is_rate_limited(status, &headers, &body) {
            let retry_after = advised_delay(&headers);
            debug!(
                credential = credential.index(),
                status = status.as_u16(),
                ?retry_after,
                "credential rate-limited"
            );
            return FetchOutcome::RateLimited { retry_after };
        }

        let failure = FetchFailure::http_status(url, status.as_u16());
        match classify_failure(&failure) {
            FailureType::Transient => FetchOutcome::TransientFailure(failure),
            _ => FetchOutcome::Failed(failure),
        }
    }

    /// Fetches one resource, rotating credentials on rate limits and backing
    /// off on transient failures.
    ///
    /// A rate-limited response moves straight to a credential not yet tried
    /// in this cycle; once every distinct credential in the pool was
    /// rate-limited, the fetcher sleeps the cooldown (or the server-advised
    /// delay) and starts a fresh cycle. Both loops are bounded by the
    /// policy's `max_attempts`.
    #[instrument(skip_all, fields(url = %request))]
    pub async fn fetch<T: DeserializeOwned>(&self, request: &FetchRequest) -> FetchOutcome<T> {
        let pool_size = self.pool.len();
        let mut cycle: u32 = 1;
        let mut limited = vec![false; pool_size];
        let mut limited_count: usize = 0;
        // Upper bound on rate-limited responses per cycle when concurrent
        // workers keep handing out credentials already seen.
        let mut responses_in_cycle: usize = 0;
        let mut advised: Option<Duration> = None;
        let mut transient_attempt: u32 = 0;

        loop {
            let credential = self.claim_untried(&limited);
            match self.attempt_with::<T>(credential, request).await {
                FetchOutcome::RateLimited { retry_after } => {
                    self.stats.record_rate_limited();
                    responses_in_cycle += 1;
                    if !limited[credential.index()] {
                        limited[credential.index()] = true;
                        limited_count += 1;
                    }
                    advised = earliest(advised, retry_after);
                    if limited_count < pool_size && responses_in_cycle < 2 * pool_size {
                        debug!(limited_count, pool_size, "rotating to next credential");
                        continue;
                    }

                    match self.policy.should_retry(FailureType::RateLimited, cycle) {
                        RetryDecision::Retry { attempt, .. } => {
                            let delay = self.policy.cooldown_delay(advised.take());
                            self.pacer.record_rate_limit(request.as_str(), delay);
                            self.stats.record_cooldown();
                            info!(
                                cycle,
                                next_cycle = attempt,
                                delay_secs = delay.as_secs(),
                                "every credential rate-limited, cooling down"
                            );
                            tokio::time::sleep(delay).await;
                            cycle = attempt;
                            limited.fill(false);
                            limited_count = 0;
                            responses_in_cycle = 0;
                        }
                        RetryDecision::DoNotRetry { reason } => {
                            warn!(cycles = cycle, %reason, "giving up on rate-limited resource");
                            self.stats.record_exhausted();
                            return FetchOutcome::ExhaustedRetries(Exhaustion {
                                url: request.as_str().to_string(),
                                attempts: cycle,
                                cause: ExhaustionCause::RateLimited,
                            });
                        }
                    }
                }
                FetchOutcome::TransientFailure(failure) => {
                    transient_attempt += 1;
                    match self
                        .policy
                        .should_retry(classify_failure(&failure), transient_attempt)
                    {
                        RetryDecision::Retry { delay, attempt } => {
                            info!(
                                attempt,
                                max_attempts = self.policy.max_attempts(),
                                delay_ms = delay.as_millis(),
                                error = %failure,
                                "retrying request"
                            );
                            self.stats.record_retry();
                            tokio::time::sleep(delay).await;
                        }
                        RetryDecision::DoNotRetry { reason } => {
                            if failure.status().is_some() {
                                warn!(error = %failure, %reason, "server error persisted");
                                self.stats.record_failed();
                                return FetchOutcome::Failed(failure);
                            }
                            warn!(error = %failure, %reason, "giving up after transient failures");
                            self.stats.record_exhausted();
                            return FetchOutcome::ExhaustedRetries(Exhaustion {
                                url: request.as_str().to_string(),
                                attempts: transient_attempt,
                                cause: ExhaustionCause::Transient(failure),
                            });
                        }
                    }
                }
                FetchOutcome::NotFound => {
                    debug!("resource not found");
                    self.stats.record_not_found();
                    return FetchOutcome::NotFound;
                }
                FetchOutcome::Failed(failure) => {
                    warn!(error = %failure, "request failed");
                    self.stats.record_failed();
                    return FetchOutcome::Failed(failure);
                }
                outcome @ (FetchOutcome::Success(_) | FetchOutcome::ExhaustedRetries(_)) => {
                    return outcome;
                }
            }
        }
    }

    /// Accumulates a list resource page by page.
    ///
    /// Stops on a short page, an explicit "no next page", the ceiling, or the
    /// first page that is absent or cannot be fetched; entries gathered so far
    /// are always returned.
    #[instrument(skip_all, fields(url = %request, ceiling = ceiling.get()))]
    pub async fn paginate<T: DeserializeOwned>(
        &self,
        request: &FetchRequest,
        ceiling: PageCeiling,
    ) -> Paginated<T> {
        let mut entries = Vec::new();
        let mut pages_fetched = 0;

        for page in 1..=ceiling.get() {
            let page_request = request.for_page(page, self.page_size);
            let stop = match self.fetch::<ListBody<T>>(&page_request).await {
                FetchOutcome::Success(Page { payload, hint }) => {
                    let received = payload.len();
                    entries.extend(payload.into_entries());
                    pages_fetched += 1;
                    debug!(page, received, total = entries.len(), "page accumulated");
                    if hint.has_more(received, self.page_size) {
                        continue;
                    }
                    StopReason::EndOfData
                }
                FetchOutcome::NotFound => StopReason::NotFound,
                FetchOutcome::Failed(_) => StopReason::Failed,
                // fetch() resolves rate limits and transient failures itself.
                FetchOutcome::ExhaustedRetries(_)
                | FetchOutcome::RateLimited { .. }
                | FetchOutcome::TransientFailure(_) => StopReason::Exhausted,
            };
            debug!(?stop, pages_fetched, total = entries.len(), "pagination stopped");
            return Paginated {
                entries,
                pages_fetched,
                stop,
            };
        }

        info!(pages_fetched, total = entries.len(), "page ceiling reached");
        Paginated {
            entries,
            pages_fetched,
            stop: StopReason::PageCeiling,
        }
    }

    /// Counts a list resource with a single one-entry page.
    ///
    /// Uses the envelope's `total_count` when present, else the page number
    /// of the `rel="last"` link, else the size of the returned page.
    #[instrument(skip_all, fields(url = %request))]
    pub async fn count(&self, request: &FetchRequest) -> FetchOutcome<u64> {
        let probe = request.for_page(1, 1);
        match self.fetch::<ListBody<IgnoredAny>>(&probe).await {
            FetchOutcome::Success(Page { payload, hint }) => {
                let count = payload
                    .total_count()
                    .or_else(|| hint.last_page().map(u64::from))
                    .unwrap_or_else(|| u64::try_from(payload.len()).unwrap_or(u64::MAX));
                debug!(count, "counted resource");
                FetchOutcome::Success(Page {
                    payload: count,
                    hint,
                })
            }
            other => other.map(|_| 0),
        }
    }
}

/// Whether a non-success response means the credential is out of quota.
pub(crate) fn is_rate_limited(status: StatusCode, headers: &HeaderMap, body: &str) -> bool {
    if status == StatusCode::TOO_MANY_REQUESTS {
        return true;
    }
    if status != StatusCode::FORBIDDEN {
        return false;
    }
    let quota_spent = headers
        .get(RATE_LIMIT_REMAINING_HEADER)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.trim() == "0");
    quota_spent || body.to_lowercase().contains(RATE_LIMIT_BODY_MARKER)
}

fn advised_delay(headers: &HeaderMap) -> Option<Duration> {
    let header = |name| headers.get(name).and_then(|value| value.to_str().ok());
    header(RETRY_AFTER.as_str())
        .and_then(parse_retry_after)
        .or_else(|| header(RATE_LIMIT_RESET_HEADER).and_then(parse_rate_limit_reset))
}

/// The soonest of two advised delays: any refilled credential lets work resume.
fn earliest(current: Option<Duration>, candidate: Option<Duration>) -> Option<Duration> {
    match (current, candidate) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    }
}

fn transport_outcome<T>(url: &str, error: reqwest::Error) -> FetchOutcome<T> {
    let failure = if error.is_timeout() {
        FetchFailure::timeout(url)
    } else {
        FetchFailure::network(url, error)
    };
    match classify_failure(&failure) {
        FailureType::Transient => FetchOutcome::TransientFailure(failure),
        _ => FetchOutcome::Failed(failure),
    }
}
