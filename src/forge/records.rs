//! Records returned by the forge REST API, reduced to the fields harvests read.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// A reference to an account embedded in another record.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct AccountRef {
    /// Account login.
    pub login: String,
}

/// One entry of a repository's contributor list.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Contributor {
    /// Account login; absent for anonymous (email-only) contributors.
    #[serde(default)]
    pub login: Option<String>,
    /// Number of commits attributed to the contributor.
    #[serde(default)]
    pub contributions: u64,
    /// `"User"`, `"Bot"` or `"Anonymous"`.
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
}

impl Contributor {
    /// Whether the entry has no account behind it.
    #[must_use]
    pub fn is_anonymous(&self) -> bool {
        self.login.is_none() || self.kind.as_deref() == Some("Anonymous")
    }
}

/// A user profile.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct UserProfile {
    /// Account login.
    pub login: String,
    /// Profile page.
    pub html_url: String,
    /// Free-text location, as typed by the user.
    #[serde(default)]
    pub location: Option<String>,
}

/// A repository.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Repository {
    /// `owner/name`.
    pub full_name: String,
    /// Repository page.
    pub html_url: String,
    /// Short description.
    #[serde(default)]
    pub description: Option<String>,
    /// Primary language.
    #[serde(default)]
    pub language: Option<String>,
    /// Topic labels.
    #[serde(default)]
    pub topics: Vec<String>,
    /// Star count.
    #[serde(default)]
    pub stargazers_count: u64,
    /// Fork count.
    #[serde(default)]
    pub forks_count: u64,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last update time.
    pub updated_at: DateTime<Utc>,
}

/// A pull request.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PullRequest {
    /// Number within the repository.
    pub number: u64,
    /// Author; absent when the account was deleted.
    #[serde(default)]
    pub user: Option<AccountRef>,
    /// Opening time.
    pub created_at: DateTime<Utc>,
    /// Merge time, if merged.
    #[serde(default)]
    pub merged_at: Option<DateTime<Utc>>,
    /// Close time, if closed.
    #[serde(default)]
    pub closed_at: Option<DateTime<Utc>>,
    /// Reviewers whose review is still pending.
    #[serde(default)]
    pub requested_reviewers: Vec<AccountRef>,
}

impl PullRequest {
    /// Time from opening to merge.
    #[must_use]
    pub fn time_to_merge(&self) -> Option<Duration> {
        self.merged_at.map(|merged| merged - self.created_at)
    }

    /// Author login, if the account still exists.
    #[must_use]
    pub fn author(&self) -> Option<&str> {
        self.user.as_ref().map(|user| user.login.as_str())
    }
}

/// A commit list entry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CommitSummary {
    /// Git-level commit data.
    pub commit: CommitDetail,
}

/// Git-level commit data.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CommitDetail {
    /// Author signature.
    #[serde(default)]
    pub author: Option<Signature>,
}

/// A git signature.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Signature {
    /// Signature time.
    #[serde(default)]
    pub date: Option<DateTime<Utc>>,
}

impl CommitSummary {
    /// When the commit was authored.
    #[must_use]
    pub fn authored_at(&self) -> Option<DateTime<Utc>> {
        self.commit.author.as_ref().and_then(|author| author.date)
    }
}
