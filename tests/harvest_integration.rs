//! Integration tests for the contributor-country harvest and forge endpoints.

use std::sync::Arc;

use forge_harvest::fetch::{FetchOutcome, PageCeiling, StopReason};
use forge_harvest::forge::RepoSlug;
use forge_harvest::harvest::{HarvestPool, harvest_contributor_countries};
use forge_harvest::locate::LocationResolver;
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

mod support;
use support::forge_api;
use support::socket_guard::start_mock_server_or_skip;

macro_rules! require_mock_server {
    () => {{
        let Some(mock_server) = start_mock_server_or_skip().await else {
            return;
        };
        mock_server
    }};
}

async fn mount_profile(server: &MockServer, login: &str, location: Option<&str>) {
    Mock::given(method("GET"))
        .and(path(format!("/users/{login}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "login": login,
            "html_url": format!("https://github.com/{login}"),
            "location": location,
        })))
        .mount(server)
        .await;
}

// ==================== Contributor Harvest Tests ====================

#[tokio::test]
async fn test_harvest_resolves_each_contributor() {
    let server = require_mock_server!();
    Mock::given(method("GET"))
        .and(path("/repos/acme/widget/contributors"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"login": "ana", "contributions": 40, "type": "User"},
            {"login": "bjorn", "contributions": 12, "type": "User"},
            {"login": "cat", "contributions": 5, "type": "User"},
            {"login": "gone", "contributions": 2, "type": "User"},
            {"email": "x@example.com", "contributions": 1, "type": "Anonymous"}
        ])))
        .expect(1)
        .mount(&server)
        .await;
    mount_profile(&server, "ana", Some("São Paulo, Brasil")).await;
    mount_profile(&server, "bjorn", Some("Oslo")).await;
    mount_profile(&server, "cat", Some("Earth")).await;
    Mock::given(method("GET"))
        .and(path("/users/gone"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let api = forge_api(&server.uri(), 2);
    let repo: RepoSlug = "acme/widget".parse().unwrap();
    let pool = HarvestPool::new(4).unwrap();
    let harvest = harvest_contributor_countries(
        &api,
        Arc::new(LocationResolver::offline()),
        &repo,
        &pool,
    )
    .await
    .unwrap();

    assert_eq!(harvest.listing_stop, StopReason::EndOfData);
    assert_eq!(harvest.stats.completed, 3);
    assert_eq!(harvest.stats.skipped, 1);

    let mut rows = harvest.rows;
    rows.sort_by(|a, b| a.login.cmp(&b.login));
    let summary: Vec<(&str, Option<&str>)> = rows
        .iter()
        .map(|row| (row.login.as_str(), row.country.as_deref()))
        .collect();
    assert_eq!(
        summary,
        vec![
            ("ana", Some("Brazil")),
            ("bjorn", Some("Norway")),
            ("cat", None),
        ]
    );
    assert_eq!(rows[0].profile_url, "https://github.com/ana");
    assert_eq!(rows[0].contributions, 40);
    assert_eq!(rows[2].location.as_deref(), Some("Earth"));
}

#[tokio::test]
async fn test_harvest_of_missing_repository_is_empty() {
    let server = require_mock_server!();
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let api = forge_api(&server.uri(), 1);
    let repo: RepoSlug = "acme/missing".parse().unwrap();
    let harvest = harvest_contributor_countries(
        &api,
        Arc::new(LocationResolver::offline()),
        &repo,
        &HarvestPool::for_credentials(1),
    )
    .await
    .unwrap();

    assert!(harvest.rows.is_empty());
    assert_eq!(harvest.listing_stop, StopReason::NotFound);
}

// ==================== Forge Endpoint Tests ====================

#[tokio::test]
async fn test_repository_and_counts() {
    let server = require_mock_server!();
    let base = server.uri();
    Mock::given(method("GET"))
        .and(path("/repos/acme/widget"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "full_name": "acme/widget",
            "html_url": "https://github.com/acme/widget",
            "description": "Widgets",
            "language": "Rust",
            "topics": ["cli"],
            "stargazers_count": 42,
            "forks_count": 7,
            "created_at": "2021-01-01T00:00:00Z",
            "updated_at": "2024-06-01T00:00:00Z"
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/repos/acme/widget/contributors"))
        .and(query_param("anon", "true"))
        .and(query_param("per_page", "1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([{"login": "ana"}]))
                .insert_header(
                    "link",
                    format!(
                        r#"<{base}/repos/acme/widget/contributors?anon=true&per_page=1&page=31>; rel="last""#
                    )
                    .as_str(),
                ),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/repos/acme/widget/pulls"))
        .and(query_param("state", "all"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"number": 2, "user": {"login": "ana"}, "created_at": "2024-01-02T00:00:00Z", "merged_at": null},
            {"number": 1, "user": null, "created_at": "2024-01-01T00:00:00Z", "merged_at": "2024-01-01T06:00:00Z"}
        ])))
        .mount(&server)
        .await;

    let api = forge_api(&base, 1);
    let repo: RepoSlug = "https://github.com/acme/widget".parse().unwrap();

    let repository = api.repository(&repo).await.into_payload().unwrap();
    assert_eq!(repository.stargazers_count, 42);
    assert_eq!(repository.topics, vec!["cli"]);

    assert_eq!(api.contributor_count(&repo).await.into_payload(), Some(31));

    let pulls = api.pull_requests(&repo, PageCeiling::EXTENDED).await;
    assert_eq!(pulls.entries.len(), 2);
    assert_eq!(pulls.entries[0].author(), Some("ana"));
    assert!(pulls.entries[1].time_to_merge().is_some());

    // Releases are not mounted: the count is absent, not an error.
    assert!(matches!(
        api.release_count(&repo).await,
        FetchOutcome::NotFound
    ));
}
