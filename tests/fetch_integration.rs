//! Integration tests for the fetch layer.
//!
//! These tests drive the Fetcher against a mock forge: credential rotation on
//! rate limits, cooldown cycles, backoff on transient failures, pagination
//! and last-page counting.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use forge_harvest::fetch::{
    ExhaustionCause, FetchFailure, FetchOutcome, FetchRequest, PageCeiling, StopReason,
};
use serde_json::{Value, json};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, Request, Respond, ResponseTemplate};

mod support;
use support::fetcher;
use support::socket_guard::start_mock_server_or_skip;

macro_rules! require_mock_server {
    () => {{
        let Some(mock_server) = start_mock_server_or_skip().await else {
            return;
        };
        mock_server
    }};
}

fn request(base: &str, resource: &str) -> FetchRequest {
    FetchRequest::new(base, resource).unwrap()
}

fn numbers(range: std::ops::Range<u32>) -> Value {
    json!(range.collect::<Vec<_>>())
}

/// Fails with the given status a fixed number of times, then succeeds.
struct FailThenSucceed {
    failures: usize,
    status: u16,
    calls: AtomicUsize,
}

impl Respond for FailThenSucceed {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        if self.calls.fetch_add(1, Ordering::SeqCst) < self.failures {
            ResponseTemplate::new(self.status)
        } else {
            ResponseTemplate::new(200).set_body_json(json!({"login": "octo"}))
        }
    }
}

// ==================== Credential Rotation Tests ====================

#[tokio::test]
async fn test_rate_limited_credentials_rotate_until_success() {
    let server = require_mock_server!();
    Mock::given(method("GET"))
        .and(header("authorization", "token token-0"))
        .respond_with(ResponseTemplate::new(429))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(header("authorization", "token token-1"))
        .respond_with(
            ResponseTemplate::new(403)
                .set_body_json(json!({"message": "API rate limit exceeded for user"})),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(header("authorization", "token token-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"login": "octo"})))
        .expect(1)
        .mount(&server)
        .await;

    let fetcher = fetcher(3, 3);
    let outcome = fetcher
        .fetch::<Value>(&request(&server.uri(), "users/octo"))
        .await;

    assert_eq!(outcome.into_payload().unwrap()["login"], "octo");
    assert_eq!(fetcher.stats().requests(), 3);
    assert_eq!(fetcher.stats().rate_limited(), 2);
    assert_eq!(fetcher.stats().cooldowns(), 0);
}

#[tokio::test]
async fn test_whole_pool_rate_limited_exhausts_after_cycles() {
    let server = require_mock_server!();
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(403).insert_header("x-ratelimit-remaining", "0"))
        .expect(6)
        .mount(&server)
        .await;

    let fetcher = fetcher(3, 2);
    let outcome = fetcher
        .fetch::<Value>(&request(&server.uri(), "users/octo"))
        .await;

    match outcome {
        FetchOutcome::ExhaustedRetries(exhaustion) => {
            assert_eq!(exhaustion.attempts, 2);
            assert!(matches!(exhaustion.cause, ExhaustionCause::RateLimited));
        }
        other => panic!("expected exhausted retries, got {}", other.label()),
    }
    assert_eq!(fetcher.stats().cooldowns(), 1);
    assert_eq!(fetcher.stats().exhausted(), 1);
}

#[tokio::test]
async fn test_concurrent_fetches_try_every_credential_before_cooldown() {
    let server = require_mock_server!();
    Mock::given(method("GET"))
        .and(header("authorization", "token token-0"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(header("authorization", "token token-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"login": "octo"})))
        .mount(&server)
        .await;

    // One cycle only: a skipped healthy credential would surface as exhaustion.
    let fetcher = fetcher(2, 1);
    let first = request(&server.uri(), "users/a");
    let second = request(&server.uri(), "users/b");
    let (a, b) = tokio::join!(
        fetcher.fetch::<Value>(&first),
        fetcher.fetch::<Value>(&second)
    );

    assert!(a.is_success(), "first fetch: {}", a.label());
    assert!(b.is_success(), "second fetch: {}", b.label());
    assert_eq!(fetcher.stats().cooldowns(), 0);
    assert_eq!(fetcher.stats().exhausted(), 0);
}

#[tokio::test]
async fn test_cooldown_then_recovery() {
    let server = require_mock_server!();
    let responder = FailThenSucceed {
        failures: 2,
        status: 429,
        calls: AtomicUsize::new(0),
    };
    Mock::given(method("GET"))
        .respond_with(responder)
        .expect(3)
        .mount(&server)
        .await;

    let fetcher = fetcher(2, 3);
    let outcome = fetcher
        .fetch::<Value>(&request(&server.uri(), "users/octo"))
        .await;

    assert!(outcome.is_success());
    assert_eq!(fetcher.stats().cooldowns(), 1);
}

#[tokio::test]
async fn test_concurrent_callers_share_pool_evenly() {
    let server = require_mock_server!();
    let seen: Arc<Mutex<HashMap<String, usize>>> = Arc::default();

    struct CountTokens(Arc<Mutex<HashMap<String, usize>>>);
    impl Respond for CountTokens {
        fn respond(&self, request: &Request) -> ResponseTemplate {
            let token = request
                .headers
                .get("authorization")
                .and_then(|value| value.to_str().ok())
                .unwrap_or_default()
                .to_string();
            *self.0.lock().unwrap().entry(token).or_default() += 1;
            ResponseTemplate::new(200).set_body_json(json!({}))
        }
    }

    Mock::given(method("GET"))
        .respond_with(CountTokens(Arc::clone(&seen)))
        .mount(&server)
        .await;

    let fetcher = fetcher(4, 1);
    let target = request(&server.uri(), "rate_limit");
    let mut handles = Vec::new();
    for _ in 0..40 {
        let fetcher = fetcher.clone();
        let target = target.clone();
        handles.push(tokio::spawn(async move {
            fetcher.fetch::<Value>(&target).await.is_success()
        }));
    }
    for handle in handles {
        assert!(handle.await.unwrap());
    }

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 4);
    assert!(seen.values().all(|&count| count == 10), "{seen:?}");
}

// ==================== Failure Classification Tests ====================

#[tokio::test]
async fn test_not_found_is_terminal_and_not_retried() {
    let server = require_mock_server!();
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let fetcher = fetcher(2, 3);
    let outcome = fetcher
        .fetch::<Value>(&request(&server.uri(), "users/ghost"))
        .await;

    assert!(matches!(outcome, FetchOutcome::NotFound));
    assert_eq!(fetcher.stats().not_found(), 1);
    assert_eq!(fetcher.stats().retries(), 0);
}

#[tokio::test]
async fn test_server_error_retried_then_succeeds() {
    let server = require_mock_server!();
    Mock::given(method("GET"))
        .respond_with(FailThenSucceed {
            failures: 1,
            status: 500,
            calls: AtomicUsize::new(0),
        })
        .expect(2)
        .mount(&server)
        .await;

    let fetcher = fetcher(1, 3);
    let outcome = fetcher
        .fetch::<Value>(&request(&server.uri(), "users/octo"))
        .await;

    assert!(outcome.is_success());
    assert_eq!(fetcher.stats().retries(), 1);
}

#[tokio::test]
async fn test_persistent_server_error_fails_with_last_status() {
    let server = require_mock_server!();
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;

    let outcome = fetcher(1, 3)
        .fetch::<Value>(&request(&server.uri(), "users/octo"))
        .await;

    match outcome {
        FetchOutcome::Failed(failure) => assert_eq!(failure.status(), Some(503)),
        other => panic!("expected failed, got {}", other.label()),
    }
}

#[tokio::test]
async fn test_unprocessable_request_fails_immediately() {
    let server = require_mock_server!();
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(422))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = fetcher(3, 3)
        .fetch::<Value>(&request(&server.uri(), "search/users"))
        .await;

    match outcome {
        FetchOutcome::Failed(failure) => assert_eq!(failure.status(), Some(422)),
        other => panic!("expected failed, got {}", other.label()),
    }
}

#[tokio::test]
async fn test_malformed_body_is_a_decode_failure() {
    let server = require_mock_server!();
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = fetcher(1, 3)
        .fetch::<Value>(&request(&server.uri(), "users/octo"))
        .await;

    assert!(matches!(
        outcome,
        FetchOutcome::Failed(FetchFailure::Decode { .. })
    ));
}

// ==================== Pagination Tests ====================

#[tokio::test]
async fn test_paginate_stops_on_short_page() {
    let server = require_mock_server!();
    for (page, range) in [("1", 0..100), ("2", 100..200), ("3", 200..237)] {
        Mock::given(method("GET"))
            .and(path("/items"))
            .and(query_param("page", page))
            .and(query_param("per_page", "100"))
            .respond_with(ResponseTemplate::new(200).set_body_json(numbers(range)))
            .expect(1)
            .mount(&server)
            .await;
    }
    Mock::given(method("GET"))
        .and(query_param("page", "4"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&server)
        .await;

    let listing = fetcher(2, 3)
        .paginate::<u32>(&request(&server.uri(), "items"), PageCeiling::EXHAUSTIVE)
        .await;

    assert_eq!(listing.entries.len(), 237);
    assert_eq!(listing.entries, (0..237).collect::<Vec<_>>());
    assert_eq!(listing.pages_fetched, 3);
    assert_eq!(listing.stop, StopReason::EndOfData);
    assert!(listing.is_complete());
}

#[tokio::test]
async fn test_paginate_follows_link_header_end() {
    let server = require_mock_server!();
    let base = server.uri();
    Mock::given(method("GET"))
        .and(query_param("page", "1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(numbers(0..2))
                .insert_header(
                    "link",
                    format!(
                        r#"<{base}/items?per_page=2&page=2>; rel="next", <{base}/items?per_page=2&page=2>; rel="last""#
                    )
                    .as_str(),
                ),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(query_param("page", "2"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(numbers(2..4))
                .insert_header(
                    "link",
                    format!(r#"<{base}/items?per_page=2&page=1>; rel="first""#).as_str(),
                ),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(query_param("page", "3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(numbers(4..6)))
        .expect(0)
        .mount(&server)
        .await;

    let listing = fetcher(1, 3)
        .with_page_size(2)
        .unwrap()
        .paginate::<u32>(&request(&base, "items"), PageCeiling::STANDARD)
        .await;

    assert_eq!(listing.entries, vec![0, 1, 2, 3]);
    assert_eq!(listing.stop, StopReason::EndOfData);
}

#[tokio::test]
async fn test_paginate_respects_ceiling() {
    let server = require_mock_server!();
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(numbers(0..3)))
        .expect(2)
        .mount(&server)
        .await;

    let listing = fetcher(1, 3)
        .with_page_size(3)
        .unwrap()
        .paginate::<u32>(&request(&server.uri(), "items"), PageCeiling::new(2))
        .await;

    assert_eq!(listing.entries.len(), 6);
    assert_eq!(listing.pages_fetched, 2);
    assert_eq!(listing.stop, StopReason::PageCeiling);
}

#[tokio::test]
async fn test_paginate_keeps_partial_results_on_missing_page() {
    let server = require_mock_server!();
    Mock::given(method("GET"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(numbers(0..2)))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let listing = fetcher(1, 3)
        .with_page_size(2)
        .unwrap()
        .paginate::<u32>(&request(&server.uri(), "items"), PageCeiling::QUICK)
        .await;

    assert_eq!(listing.entries, vec![0, 1]);
    assert_eq!(listing.stop, StopReason::NotFound);
    assert!(!listing.is_complete());
}

#[tokio::test]
async fn test_paginate_reads_search_envelope() {
    let server = require_mock_server!();
    Mock::given(method("GET"))
        .and(path("/search/users"))
        .and(query_param("q", "location:Oslo"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "total_count": 2,
            "incomplete_results": false,
            "items": [{"login": "a"}, {"login": "b"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let search = request(&server.uri(), "search/users").with_param("q", "location:Oslo");
    let listing = fetcher(1, 3)
        .paginate::<Value>(&search, PageCeiling::QUICK)
        .await;

    assert_eq!(listing.entries.len(), 2);
    assert_eq!(listing.entries[1]["login"], "b");
}

// ==================== Counting Tests ====================

#[tokio::test]
async fn test_count_reads_last_page_link() {
    let server = require_mock_server!();
    let base = server.uri();
    Mock::given(method("GET"))
        .and(path("/repos/o/r/commits"))
        .and(query_param("per_page", "1"))
        .and(query_param("page", "1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([{"sha": "abc"}]))
                .insert_header(
                    "link",
                    format!(
                        r#"<{base}/repos/o/r/commits?per_page=1&page=2>; rel="next", <{base}/repos/o/r/commits?per_page=1&page=1234>; rel="last""#
                    )
                    .as_str(),
                ),
        )
        .expect(1)
        .mount(&server)
        .await;

    let count = fetcher(1, 3)
        .count(&request(&base, "repos/o/r/commits"))
        .await;
    assert_eq!(count.into_payload(), Some(1234));
}

#[tokio::test]
async fn test_count_without_link_uses_page_length() {
    let server = require_mock_server!();
    Mock::given(method("GET"))
        .and(path("/repos/o/r/releases"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/repos/o/r/contributors"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"login": "solo"}])))
        .mount(&server)
        .await;

    let fetcher = fetcher(1, 3);
    let releases = fetcher
        .count(&request(&server.uri(), "repos/o/r/releases"))
        .await;
    let contributors = fetcher
        .count(&request(&server.uri(), "repos/o/r/contributors"))
        .await;
    assert_eq!(releases.into_payload(), Some(0));
    assert_eq!(contributors.into_payload(), Some(1));
}
