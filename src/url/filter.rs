use url::Url;

/// Path prefix filter applied to sitemap entries and discovered links
///
/// Matching is a **prefix** match on the URL path: a filter of `/docs/`
/// accepts `/docs/` and `/docs/api/intro` but rejects `/docs` (no trailing
/// slash) and `/other/docs/page`. A filter of `/` accepts everything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathFilter {
    prefix: String,
}

impl PathFilter {
    /// Creates a filter for the given prefix; a missing leading `/` is added
    pub fn new(prefix: &str) -> Self {
        let prefix = if prefix.starts_with('/') {
            prefix.to_string()
        } else {
            format!("/{}", prefix)
        };
        Self { prefix }
    }

    /// A filter that accepts every path
    pub fn allow_all() -> Self {
        Self::new("/")
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Returns true if the URL's path starts with the filter prefix
    ///
    /// # Examples
    ///
    /// ```
    /// use docs_crawler::url::PathFilter;
    /// use url::Url;
    ///
    /// let filter = PathFilter::new("/docs/");
    /// assert!(filter.matches(&Url::parse("https://example.com/docs/a").unwrap()));
    /// assert!(!filter.matches(&Url::parse("https://example.com/other/c").unwrap()));
    /// ```
    pub fn matches(&self, url: &Url) -> bool {
        url.path().starts_with(&self.prefix)
    }
}

/// Returns true if both URLs share scheme, host and port
pub fn same_origin(a: &Url, b: &Url) -> bool {
    a.origin() == b.origin()
}
