//! Rendering seam between the crawler and whatever produces page HTML
//!
//! The crawler only needs "give me the ready document for this URL". The
//! bundled [`HttpRenderer`] serves documentation sites that ship their
//! content in the initial HTML; a browser-backed renderer can implement the
//! same trait.

use crate::config::RenderConfig;
use reqwest::{redirect::Policy, Client};
use scraper::{Html, Selector};
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;
use url::Url;

/// Two-stage readiness contract for a render
#[derive(Debug, Clone)]
pub struct Readiness {
    /// Bound on reaching a ready document
    pub navigation_timeout: Duration,
    /// Selector whose presence marks the main content as rendered
    pub content_selector: String,
    /// Bound on waiting for the content selector
    pub content_timeout: Duration,
    /// Fail the render when the content selector never appears
    pub require_content_marker: bool,
}

impl Readiness {
    pub fn from_config(config: &RenderConfig) -> Self {
        Self {
            navigation_timeout: Duration::from_millis(config.navigation_timeout_ms),
            content_selector: config.content_selector.clone(),
            content_timeout: Duration::from_millis(config.content_timeout_ms),
            require_content_marker: config.require_content_marker,
        }
    }
}

/// A rendered document
#[derive(Debug, Clone)]
pub struct RenderedPage {
    /// URL after redirects
    pub final_url: Url,
    pub html: String,
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("timed out: {0}")]
    Timeout(String),

    #[error("HTTP {0}")]
    Http(u16),

    #[error("network error: {0}")]
    Network(String),

    #[error("content marker `{0}` not found")]
    MissingContent(String),

    #[error("render failed: {0}")]
    Failed(String),
}

/// Produces a ready document for a URL
pub trait Renderer: Send + Sync + 'static {
    fn render(
        &self,
        url: &Url,
        readiness: &Readiness,
    ) -> impl Future<Output = Result<RenderedPage, RenderError>> + Send;
}

/// Builds the HTTP client shared by rendering and sitemap fetches
///
/// No cookie store is configured, so concurrent renders share no session
/// state.
pub fn build_http_client(config: &RenderConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.clone())
        .timeout(Duration::from_millis(config.navigation_timeout_ms))
        .connect_timeout(Duration::from_secs(10))
        .redirect(Policy::limited(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Renderer that fetches the served HTML over HTTP
#[derive(Debug, Clone)]
pub struct HttpRenderer {
    client: Client,
}

impl HttpRenderer {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    async fn navigate(&self, url: &Url) -> Result<RenderedPage, RenderError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(classify_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(RenderError::Http(status.as_u16()));
        }

        let final_url = response.url().clone();
        let html = response.text().await.map_err(classify_reqwest_error)?;
        Ok(RenderedPage { final_url, html })
    }
}

impl Renderer for HttpRenderer {
    async fn render(&self, url: &Url, readiness: &Readiness) -> Result<RenderedPage, RenderError> {
        // Stage 1: document ready
        let page = tokio::time::timeout(readiness.navigation_timeout, self.navigate(url))
            .await
            .map_err(|_| {
                RenderError::Timeout(format!(
                    "navigation exceeded {} ms",
                    readiness.navigation_timeout.as_millis()
                ))
            })??;

        // Stage 2: content marker present
        let html = page.html.clone();
        let selector = readiness.content_selector.clone();
        let check = tokio::task::spawn_blocking(move || has_content_marker(&html, &selector));

        let found = match tokio::time::timeout(readiness.content_timeout, check).await {
            Ok(Ok(result)) => result?,
            Ok(Err(e)) => return Err(RenderError::Failed(e.to_string())),
            Err(_) => false,
        };

        if !found {
            if readiness.require_content_marker {
                return Err(RenderError::MissingContent(readiness.content_selector.clone()));
            }
            debug!(
                url = %url,
                selector = %readiness.content_selector,
                "Content marker not found, using document as served"
            );
        }

        Ok(page)
    }
}

/// Returns true if `html` contains an element matching `selector`
pub fn has_content_marker(html: &str, selector: &str) -> Result<bool, RenderError> {
    let selector = Selector::parse(selector)
        .map_err(|e| RenderError::Failed(format!("invalid content selector: {:?}", e)))?;
    let document = Html::parse_document(html);
    let found = document.select(&selector).next().is_some();
    Ok(found)
}

fn classify_reqwest_error(error: reqwest::Error) -> RenderError {
    if error.is_timeout() {
        RenderError::Timeout(error.to_string())
    } else if let Some(status) = error.status() {
        RenderError::Http(status.as_u16())
    } else {
        RenderError::Network(error.to_string())
    }
}
