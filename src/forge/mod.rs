//! Typed access to the forge REST endpoints used by harvests.
//!
//! [`ForgeApi`] only builds resource locators and picks page ceilings; every
//! request goes through the shared [`Fetcher`], so rotation, cooldowns and
//! retries apply uniformly.

mod records;

pub use records::{
    AccountRef, CommitDetail, CommitSummary, Contributor, PullRequest, Repository, Signature,
    UserProfile,
};

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::fetch::{FetchError, FetchOutcome, FetchRequest, Fetcher, PageCeiling, Paginated};

/// Public forge API root.
pub const DEFAULT_API_BASE_URL: &str = "https://api.github.com";

#[allow(clippy::expect_used)]
static NAME_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9_.-]+$").expect("name regex is valid") // Static pattern, safe to panic
});

#[allow(clippy::expect_used)]
static REPO_URL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:https?://)?(?:www\.)?[^/\s]+/([^/\s]+)/([^/\s?#]+?)(?:\.git)?/?(?:[?#].*)?$")
        .expect("repository URL regex is valid") // Static pattern, safe to panic
});

/// Errors from parsing repository identifiers.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ForgeError {
    /// Not an `owner/name` pair or a repository URL.
    #[error("invalid repository '{input}': expected OWNER/NAME or a repository URL")]
    InvalidRepository {
        /// The rejected input.
        input: String,
    },
}

/// An `owner/name` repository identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepoSlug {
    owner: String,
    name: String,
}

impl RepoSlug {
    /// Builds a slug from validated parts.
    ///
    /// # Errors
    ///
    /// Returns [`ForgeError::InvalidRepository`] if either part has characters
    /// a forge does not allow in names.
    pub fn new(owner: &str, name: &str) -> Result<Self, ForgeError> {
        let invalid = || ForgeError::InvalidRepository {
            input: format!("{owner}/{name}"),
        };
        if !NAME_PATTERN.is_match(owner) || !NAME_PATTERN.is_match(name) {
            return Err(invalid());
        }
        if matches!(name, "." | "..") || matches!(owner, "." | "..") {
            return Err(invalid());
        }
        Ok(Self {
            owner: owner.to_string(),
            name: name.to_string(),
        })
    }

    /// Extracts the slug from a repository page URL such as
    /// `https://github.com/owner/name` (a trailing `.git` is ignored).
    ///
    /// # Errors
    ///
    /// Returns [`ForgeError::InvalidRepository`] if the URL has no owner and name.
    pub fn from_url(url: &str) -> Result<Self, ForgeError> {
        let trimmed = url.trim();
        let captures =
            REPO_URL_PATTERN
                .captures(trimmed)
                .ok_or_else(|| ForgeError::InvalidRepository {
                    input: trimmed.to_string(),
                })?;
        Self::new(&captures[1], &captures[2]).map_err(|_| ForgeError::InvalidRepository {
            input: trimmed.to_string(),
        })
    }

    /// Repository owner.
    #[must_use]
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Repository name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl FromStr for RepoSlug {
    type Err = ForgeError;

    /// Accepts `owner/name` or a repository URL.
    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let trimmed = input.trim();
        if trimmed.contains("://") || trimmed.matches('/').count() > 1 {
            return Self::from_url(trimmed);
        }
        match trimmed.split_once('/') {
            Some((owner, name)) => Self::new(owner, name.trim_end_matches(".git")),
            None => Err(ForgeError::InvalidRepository {
                input: trimmed.to_string(),
            }),
        }
    }
}

impl fmt::Display for RepoSlug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// Parses the slug out of a repository page URL.
///
/// # Errors
///
/// Returns [`ForgeError::InvalidRepository`] if the URL has no owner and name.
pub fn repository_from_url(url: &str) -> Result<RepoSlug, ForgeError> {
    RepoSlug::from_url(url)
}

/// Endpoint builder over a shared [`Fetcher`].
#[derive(Debug, Clone)]
pub struct ForgeApi {
    fetcher: Fetcher,
    root: FetchRequest,
}

impl ForgeApi {
    /// Creates an API view rooted at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::InvalidUrl`] if `base_url` is not an http(s) URL.
    pub fn new(fetcher: Fetcher, base_url: &str) -> Result<Self, FetchError> {
        let root = FetchRequest::new(base_url, "")?;
        Ok(Self { fetcher, root })
    }

    /// The underlying fetcher.
    #[must_use]
    pub fn fetcher(&self) -> &Fetcher {
        &self.fetcher
    }

    fn repo_request(&self, repo: &RepoSlug, tail: &[&str]) -> FetchRequest {
        let mut segments = vec!["repos", repo.owner(), repo.name()];
        segments.extend_from_slice(tail);
        self.root.child(&segments)
    }

    /// The repository record.
    #[instrument(skip_all, fields(repo = %repo))]
    pub async fn repository(&self, repo: &RepoSlug) -> FetchOutcome<Repository> {
        self.fetcher.fetch(&self.repo_request(repo, &[])).await
    }

    /// A user profile.
    #[instrument(skip(self))]
    pub async fn user(&self, login: &str) -> FetchOutcome<UserProfile> {
        self.fetcher.fetch(&self.root.child(&["users", login])).await
    }

    /// Every named contributor, in the order the forge ranks them.
    ///
    /// Anonymous entries are dropped.
    #[instrument(skip_all, fields(repo = %repo))]
    pub async fn contributors(&self, repo: &RepoSlug) -> Paginated<Contributor> {
        let mut listing = self
            .fetcher
            .paginate::<Contributor>(
                &self.repo_request(repo, &["contributors"]),
                PageCeiling::EXHAUSTIVE,
            )
            .await;
        let before = listing.entries.len();
        listing.entries.retain(|contributor| !contributor.is_anonymous());
        debug!(
            total = before,
            named = listing.entries.len(),
            stop = ?listing.stop,
            "contributors listed"
        );
        listing
    }

    /// Pull requests in every state, newest first.
    #[instrument(skip_all, fields(repo = %repo, ceiling = ceiling.get()))]
    pub async fn pull_requests(
        &self,
        repo: &RepoSlug,
        ceiling: PageCeiling,
    ) -> Paginated<PullRequest> {
        let request = self.repo_request(repo, &["pulls"]).with_param("state", "all");
        self.fetcher.paginate(&request, ceiling).await
    }

    /// Commits on the default branch, newest first.
    #[instrument(skip_all, fields(repo = %repo, ceiling = ceiling.get()))]
    pub async fn commits(&self, repo: &RepoSlug, ceiling: PageCeiling) -> Paginated<CommitSummary> {
        self.fetcher
            .paginate(&self.repo_request(repo, &["commits"]), ceiling)
            .await
    }

    /// Number of commits on the default branch.
    pub async fn commit_count(&self, repo: &RepoSlug) -> FetchOutcome<u64> {
        self.fetcher
            .count(&self.repo_request(repo, &["commits"]))
            .await
    }

    /// Number of contributors, anonymous ones included.
    pub async fn contributor_count(&self, repo: &RepoSlug) -> FetchOutcome<u64> {
        let request = self
            .repo_request(repo, &["contributors"])
            .with_param("anon", "true");
        self.fetcher.count(&request).await
    }

    /// Number of published releases.
    pub async fn release_count(&self, repo: &RepoSlug) -> FetchOutcome<u64> {
        self.fetcher
            .count(&self.repo_request(repo, &["releases"]))
            .await
    }
}
