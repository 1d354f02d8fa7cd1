//! Fetch/render unit: one attempt at turning a URL into page content
//!
//! Failures never escape as `Err`; they are classified and carried inside a
//! [`FetchResult`] so the retry loop and coordinator can treat them as data.

use crate::crawler::renderer::{Readiness, RenderError, Renderer};
use crate::crawler::parser::extract_links;
use crate::discovery::UrlTask;
use crate::output::to_markdown;
use crate::storage::content_fingerprint;
use std::fmt;
use std::sync::Arc;
use tracing::debug;
use url::Url;

/// Classification of a failed fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchErrorKind {
    Timeout,
    HttpError,
    RenderError,
    NetworkError,
    /// The page was fetched but its output file could not be written
    WriteError,
}

impl FetchErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::HttpError => "http-error",
            Self::RenderError => "render-error",
            Self::NetworkError => "network-error",
            Self::WriteError => "write-error",
        }
    }
}

impl fmt::Display for FetchErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified fetch failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchError {
    pub kind: FetchErrorKind,
    pub status: Option<u16>,
    pub message: String,
}

impl FetchError {
    pub fn new(kind: FetchErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            status: None,
            message: message.into(),
        }
    }

    /// Whether another attempt could plausibly succeed
    ///
    /// | Condition | Retried |
    /// |-----------|---------|
    /// | Timeout, network or render error | yes |
    /// | HTTP 5xx, 408, 429 | yes |
    /// | HTTP 404, 410, other 4xx | no |
    /// | Output write failure | no |
    pub fn is_retryable(&self) -> bool {
        match self.kind {
            FetchErrorKind::Timeout
            | FetchErrorKind::NetworkError
            | FetchErrorKind::RenderError => true,
            FetchErrorKind::HttpError => match self.status {
                Some(status) => status >= 500 || status == 408 || status == 429,
                None => true,
            },
            FetchErrorKind::WriteError => false,
        }
    }
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl From<RenderError> for FetchError {
    fn from(error: RenderError) -> Self {
        let kind = match &error {
            RenderError::Timeout(_) => FetchErrorKind::Timeout,
            RenderError::Http(_) => FetchErrorKind::HttpError,
            RenderError::Network(_) => FetchErrorKind::NetworkError,
            RenderError::MissingContent(_) | RenderError::Failed(_) => FetchErrorKind::RenderError,
        };
        let status = match &error {
            RenderError::Http(status) => Some(*status),
            _ => None,
        };
        Self {
            kind,
            status,
            message: error.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStatus {
    Success,
    Failed,
}

/// Converted content of a successfully fetched page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageContent {
    pub final_url: Url,
    pub title: String,
    pub markdown: String,
}

/// Outcome of fetching one URL
#[derive(Debug, Clone)]
pub struct FetchResult {
    pub url: Url,
    pub status: FetchStatus,
    pub content: Option<PageContent>,
    /// Absolute outbound links in document order
    pub outbound_links: Vec<String>,
    pub fingerprint: Option<String>,
    pub error: Option<FetchError>,
    pub attempts: u32,
}

impl FetchResult {
    pub fn success(url: Url, content: PageContent, outbound_links: Vec<String>) -> Self {
        let fingerprint = content_fingerprint(&content.markdown);
        Self {
            url,
            status: FetchStatus::Success,
            content: Some(content),
            outbound_links,
            fingerprint: Some(fingerprint),
            error: None,
            attempts: 1,
        }
    }

    pub fn failure(url: Url, error: FetchError) -> Self {
        Self {
            url,
            status: FetchStatus::Failed,
            content: None,
            outbound_links: Vec::new(),
            fingerprint: None,
            error: Some(error),
            attempts: 1,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == FetchStatus::Success
    }
}

/// Renders a URL and converts the result into a [`FetchResult`]
pub struct PageFetcher<R> {
    renderer: Arc<R>,
    readiness: Readiness,
    follow_links: bool,
}

impl<R: Renderer> PageFetcher<R> {
    pub fn new(renderer: Arc<R>, readiness: Readiness, follow_links: bool) -> Self {
        Self {
            renderer,
            readiness,
            follow_links,
        }
    }

    /// Performs a single attempt
    pub async fn fetch(&self, task: &UrlTask) -> FetchResult {
        debug!(url = %task.url, depth = task.depth, "Fetching");

        match self.renderer.render(&task.url, &self.readiness).await {
            Ok(page) => {
                let converted = to_markdown(&page.html);
                let links = if self.follow_links {
                    extract_links(&page.html, &page.final_url)
                } else {
                    Vec::new()
                };
                let content = PageContent {
                    final_url: page.final_url,
                    title: converted.title,
                    markdown: converted.markdown,
                };
                FetchResult::success(task.url.clone(), content, links)
            }
            Err(e) => FetchResult::failure(task.url.clone(), FetchError::from(e)),
        }
    }
}
