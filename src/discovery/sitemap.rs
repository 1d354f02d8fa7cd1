//! Sitemap fetching and XML parsing
//!
//! Supports a standard `<urlset>` sitemap and a `<sitemapindex>` whose child
//! sitemaps are followed one level deep.

use quick_xml::events::Event;
use quick_xml::Reader;
use reqwest::Client;
use thiserror::Error;
use tracing::{debug, warn};

/// Maximum number of child sitemaps fetched from an index
pub const MAX_CHILD_SITEMAPS: usize = 50;

#[derive(Debug, Error)]
pub enum SitemapError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("HTTP {0}")]
    Status(u16),

    #[error("malformed sitemap XML: {0}")]
    Parse(String),
}

/// Parsed sitemap document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SitemapContent {
    /// `<urlset>`: page locations in document order
    Urls(Vec<String>),
    /// `<sitemapindex>`: child sitemap locations
    Index(Vec<String>),
}

/// Parses sitemap XML into page or child-sitemap locations
///
/// # Examples
///
/// ```
/// use docs_crawler::discovery::sitemap::{parse_sitemap, SitemapContent};
///
/// let xml = r#"<urlset><url><loc>https://example.com/docs/a</loc></url></urlset>"#;
/// assert_eq!(
///     parse_sitemap(xml).unwrap(),
///     SitemapContent::Urls(vec!["https://example.com/docs/a".to_string()])
/// );
/// ```
pub fn parse_sitemap(xml: &str) -> Result<SitemapContent, SitemapError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut locs = Vec::new();
    let mut is_index = false;
    // Inside <url> or <sitemap>
    let mut in_entry = false;
    let mut in_loc = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"sitemapindex" => is_index = true,
                b"url" | b"sitemap" => in_entry = true,
                b"loc" if in_entry => in_loc = true,
                _ => {}
            },
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"url" | b"sitemap" => in_entry = false,
                b"loc" => in_loc = false,
                _ => {}
            },
            Ok(Event::Text(e)) if in_loc => {
                let text = e
                    .unescape()
                    .map_err(|e| SitemapError::Parse(e.to_string()))?;
                let text = text.trim();
                if !text.is_empty() {
                    locs.push(text.to_string());
                }
            }
            Ok(Event::CData(e)) if in_loc => {
                let text = String::from_utf8_lossy(&e).trim().to_string();
                if !text.is_empty() {
                    locs.push(text);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(SitemapError::Parse(format!(
                    "at position {}: {}",
                    reader.buffer_position(),
                    e
                )))
            }
            _ => {}
        }
        buf.clear();
    }

    if is_index {
        Ok(SitemapContent::Index(locs))
    } else {
        Ok(SitemapContent::Urls(locs))
    }
}

async fn fetch_document(client: &Client, url: &str) -> Result<String, SitemapError> {
    let response = client.get(url).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(SitemapError::Status(status.as_u16()));
    }
    Ok(response.text().await?)
}

/// Fetches a sitemap and returns every page location it lists
///
/// An index is followed one level deep (at most [`MAX_CHILD_SITEMAPS`]
/// children). A child that fails or is itself an index is skipped with a
/// warning; only a failure of the top-level document is an error.
pub async fn fetch_sitemap(client: &Client, url: &str) -> Result<Vec<String>, SitemapError> {
    debug!(url = %url, "Fetching sitemap");
    let xml = fetch_document(client, url).await?;

    match parse_sitemap(&xml)? {
        SitemapContent::Urls(urls) => Ok(urls),
        SitemapContent::Index(children) => {
            debug!(url = %url, children = children.len(), "Sitemap is an index");

            let mut handles = Vec::new();
            for child in children.into_iter().take(MAX_CHILD_SITEMAPS) {
                let client = client.clone();
                handles.push(tokio::spawn(async move {
                    let result = fetch_document(&client, &child)
                        .await
                        .and_then(|xml| parse_sitemap(&xml));
                    (child, result)
                }));
            }

            let mut urls = Vec::new();
            for handle in handles {
                match handle.await {
                    Ok((_, Ok(SitemapContent::Urls(child_urls)))) => urls.extend(child_urls),
                    Ok((child, Ok(SitemapContent::Index(_)))) => {
                        warn!(url = %child, "Skipping nested sitemap index");
                    }
                    Ok((child, Err(e))) => {
                        warn!(url = %child, error = %e, "Failed to fetch child sitemap");
                    }
                    Err(e) => {
                        warn!(error = %e, "Child sitemap task failed");
                    }
                }
            }
            Ok(urls)
        }
    }
}
