//! Fetch request locators.

use url::Url;

use super::FetchError;

/// Query parameter carrying the page number.
pub(crate) const PAGE_PARAM: &str = "page";

/// Query parameter carrying the page size.
pub(crate) const PER_PAGE_PARAM: &str = "per_page";

/// A validated resource locator plus query parameters.
///
/// Requests are values: pagination derives a fresh request per page and
/// never mutates the caller's.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    url: Url,
}

impl FetchRequest {
    /// Joins `path` onto `base` (keeping any path prefix on the base, as
    /// self-hosted forges mount their API under `/api/v3`).
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::InvalidUrl`] if the result is not an http(s) URL with a host.
    pub fn new(base: &str, path: &str) -> Result<Self, FetchError> {
        let joined = format!(
            "{}/{}",
            base.trim().trim_end_matches('/'),
            path.trim().trim_start_matches('/')
        );
        Self::parse(&joined)
    }

    /// Parses an absolute locator.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::InvalidUrl`] if `raw` is not an http(s) URL with a host.
    pub fn parse(raw: &str) -> Result<Self, FetchError> {
        let url = Url::parse(raw).map_err(|_| FetchError::invalid_url(raw))?;
        if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
            return Err(FetchError::invalid_url(raw));
        }
        Ok(Self { url })
    }

    /// Appends a query parameter.
    #[must_use]
    pub fn with_param(mut self, key: &str, value: impl AsRef<str>) -> Self {
        self.url.query_pairs_mut().append_pair(key, value.as_ref());
        self
    }

    /// Derives a request for a sub-resource by appending path segments.
    ///
    /// Each segment is percent-encoded, so user-supplied names cannot
    /// escape their position in the path. Query parameters are dropped.
    #[must_use]
    pub fn child<S: AsRef<str>>(&self, segments: &[S]) -> Self {
        let mut url = self.url.clone();
        url.set_query(None);
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty()
                .extend(segments.iter().map(AsRef::as_ref));
        }
        Self { url }
    }

    /// Derives the request for one page, replacing any paging parameters.
    #[must_use]
    pub fn for_page(&self, page: u32, per_page: u32) -> Self {
        let retained: Vec<(String, String)> = self
            .url
            .query_pairs()
            .filter(|(key, _)| key != PAGE_PARAM && key != PER_PAGE_PARAM)
            .map(|(key, value)| (key.into_owned(), value.into_owned()))
            .collect();

        let mut url = self.url.clone();
        {
            let mut pairs = url.query_pairs_mut();
            pairs.clear();
            for (key, value) in &retained {
                pairs.append_pair(key, value);
            }
            pairs.append_pair(PER_PAGE_PARAM, &per_page.to_string());
            pairs.append_pair(PAGE_PARAM, &page.to_string());
        }
        Self { url }
    }

    /// The full locator.
    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// The full locator as a string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.url.as_str()
    }
}

impl std::fmt::Display for FetchRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.url.as_str())
    }
}
