//! Pagination primitives: hints, list bodies, ceilings and accumulated results.

use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;

use super::request::PAGE_PARAM;

#[allow(clippy::expect_used)]
static LINK_ENTRY_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<([^>]+)>\s*;\s*rel="([^"]+)""#).expect("link regex is valid") // Static pattern, safe to panic
});

/// Where the next page is, according to the response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaginationHint {
    /// The response carried a `Link` header.
    Explicit {
        /// Page number of `rel="next"`, if any.
        next: Option<u32>,
        /// Page number of `rel="last"`, if any.
        last: Option<u32>,
    },
    /// No metadata; a short page marks the end.
    Inferred,
}

impl PaginationHint {
    /// Builds a hint from an optional `Link` header value.
    #[must_use]
    pub fn from_link_header(value: Option<&str>) -> Self {
        let Some(value) = value else {
            return Self::Inferred;
        };
        let mut next = None;
        let mut last = None;
        for captures in LINK_ENTRY_PATTERN.captures_iter(value) {
            let page = page_number(&captures[1]);
            for rel in captures[2].split_whitespace() {
                match rel {
                    "next" => next = page,
                    "last" => last = page,
                    _ => {}
                }
            }
        }
        Self::Explicit { next, last }
    }

    /// Whether another page should be requested after one with `received` entries.
    ///
    /// A short page always ends accumulation; a full page continues unless
    /// the server said there is no next page.
    #[must_use]
    pub fn has_more(&self, received: usize, page_size: u32) -> bool {
        if received < page_size as usize {
            return false;
        }
        !matches!(self, Self::Explicit { next: None, .. })
    }

    /// Page number of the final page, when the server announced it.
    #[must_use]
    pub fn last_page(&self) -> Option<u32> {
        match self {
            Self::Explicit { last, .. } => *last,
            Self::Inferred => None,
        }
    }
}

fn page_number(link: &str) -> Option<u32> {
    let url = url::Url::parse(link).ok()?;
    url.query_pairs()
        .find(|(key, _)| key == PAGE_PARAM)
        .and_then(|(_, value)| value.parse().ok())
}

/// A list endpoint body: a bare array or a search envelope.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ListBody<T> {
    /// `[ {...}, {...} ]`
    Bare(Vec<T>),
    /// `{ "total_count": n, "items": [...] }`
    Envelope {
        /// Items on this page.
        items: Vec<T>,
        /// Total matches across all pages.
        #[serde(default)]
        total_count: Option<u64>,
    },
}

impl<T> ListBody<T> {
    /// Number of entries on this page.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Bare(items) | Self::Envelope { items, .. } => items.len(),
        }
    }

    /// Whether this page is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total across all pages, when the envelope reports it.
    #[must_use]
    pub fn total_count(&self) -> Option<u64> {
        match self {
            Self::Bare(_) => None,
            Self::Envelope { total_count, .. } => *total_count,
        }
    }

    /// Consumes the body into its entries.
    #[must_use]
    pub fn into_entries(self) -> Vec<T> {
        match self {
            Self::Bare(items) | Self::Envelope { items, .. } => items,
        }
    }
}

/// Upper bound on pages requested by one paginated fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageCeiling(u32);

impl PageCeiling {
    /// Existence checks and samples.
    pub const QUICK: Self = Self(5);
    /// Routine listings.
    pub const STANDARD: Self = Self(10);
    /// Large listings (pull requests, commits).
    pub const EXTENDED: Self = Self(50);
    /// Exhaustive harvests (contributors).
    pub const EXHAUSTIVE: Self = Self(100);

    /// A custom ceiling, at least one page.
    #[must_use]
    pub fn new(pages: u32) -> Self {
        Self(pages.max(1))
    }

    /// Number of pages allowed.
    #[must_use]
    pub fn get(self) -> u32 {
        self.0
    }
}

/// Why accumulation stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// A short page or an explicit "no next page".
    EndOfData,
    /// The page ceiling was reached with more data possibly remaining.
    PageCeiling,
    /// A page was absent.
    NotFound,
    /// A page could not be fetched within the retry budget.
    Exhausted,
    /// A page failed with a hard error.
    Failed,
}

/// Entries accumulated across pages, in page order then intra-page order.
#[derive(Debug, Clone)]
pub struct Paginated<T> {
    /// Accumulated entries.
    pub entries: Vec<T>,
    /// Pages that returned successfully.
    pub pages_fetched: u32,
    /// Why accumulation stopped.
    pub stop: StopReason,
}

impl<T> Paginated<T> {
    /// True when every page up to the end of data was collected.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.stop == StopReason::EndOfData
    }
}
