//! Contributor-country harvest.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, instrument, warn};

use super::{HarvestError, HarvestPool, HarvestStats, UnitOutcome};
use crate::fetch::{FetchOutcome, Page, StopReason};
use crate::forge::{ForgeApi, RepoSlug};
use crate::locate::LocationResolver;

/// One contributor with their resolved country.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContributorCountry {
    /// Account login.
    pub login: String,
    /// Profile page.
    pub profile_url: String,
    /// Commits to the repository.
    pub contributions: u64,
    /// Location as written on the profile.
    pub location: Option<String>,
    /// Canonical country, when one could be assigned.
    pub country: Option<String>,
}

/// Result of a contributor-country harvest.
#[derive(Debug, Clone)]
pub struct ContributorHarvest {
    /// Rows in completion order.
    pub rows: Vec<ContributorCountry>,
    /// Why the contributor listing stopped.
    pub listing_stop: StopReason,
    /// Pool counters for the profile fetches.
    pub stats: HarvestStats,
}

/// Lists a repository's contributors, fetches each profile in `pool` and
/// classifies its location.
///
/// Profiles that are gone or cannot be fetched within the retry budget are
/// skipped. Contributors without a resolvable location keep `country: None`.
///
/// # Errors
///
/// Returns [`HarvestError::SemaphoreClosed`] if the pool's semaphore closes.
#[instrument(skip_all, fields(repo = %repo))]
pub async fn harvest_contributor_countries(
    api: &ForgeApi,
    resolver: Arc<LocationResolver>,
    repo: &RepoSlug,
    pool: &HarvestPool,
) -> Result<ContributorHarvest, HarvestError> {
    let listing = api.contributors(repo).await;
    if !listing.is_complete() {
        warn!(
            stop = ?listing.stop,
            listed = listing.entries.len(),
            "contributor listing incomplete"
        );
    }
    let units: Vec<(String, u64)> = listing
        .entries
        .into_iter()
        .filter_map(|contributor| {
            contributor
                .login
                .map(|login| (login, contributor.contributions))
        })
        .collect();
    info!(contributors = units.len(), "fetching contributor profiles");

    let harvest = pool
        .run(units, |(login, contributions)| {
            let api = api.clone();
            let resolver = Arc::clone(&resolver);
            async move { contributor_country(&api, &resolver, login, contributions).await }
        })
        .await?;

    Ok(ContributorHarvest {
        rows: harvest.results,
        listing_stop: listing.stop,
        stats: harvest.stats,
    })
}

async fn contributor_country(
    api: &ForgeApi,
    resolver: &LocationResolver,
    login: String,
    contributions: u64,
) -> UnitOutcome<ContributorCountry> {
    let profile = match api.user(&login).await {
        FetchOutcome::Success(Page { payload, .. }) => payload,
        FetchOutcome::NotFound => return UnitOutcome::Skipped(format!("{login}: profile not found")),
        FetchOutcome::ExhaustedRetries(exhaustion) => {
            return UnitOutcome::Skipped(format!("{login}: {exhaustion}"));
        }
        FetchOutcome::Failed(failure) => return UnitOutcome::Failed(format!("{login}: {failure}")),
        other => return UnitOutcome::Failed(format!("{login}: unexpected {}", other.label())),
    };

    let location = profile
        .location
        .map(|location| location.trim().to_string())
        .filter(|location| !location.is_empty());
    let country = match &location {
        Some(location) => resolver.resolve(location).await.into_country(),
        None => None,
    };

    UnitOutcome::Completed(ContributorCountry {
        login: profile.login,
        profile_url: profile.html_url,
        contributions,
        location,
        country,
    })
}
