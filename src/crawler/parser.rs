//! Outbound link extraction from rendered HTML
//!
//! Links are resolved against the page's final URL and normalized; whether a
//! link is followed (origin, path filter, visited set) is the frontier's call.

use crate::url::resolve_url;
use scraper::{Html, Selector};
use std::collections::HashSet;
use tracing::trace;
use url::Url;

/// Extracts the outbound links of a page in document order
///
/// # Link Extraction Rules
///
/// **Include:**
/// - `<a href="...">` anywhere in the document
/// - `<link rel="canonical" href="...">`
///
/// **Exclude:**
/// - `<a href="..." download>`
/// - `javascript:`, `mailto:`, `tel:` and `data:` links
/// - Fragment-only links (same-page anchors)
/// - Anything that does not resolve to an http(s) URL
///
/// Duplicates within one page are removed, keeping the first occurrence.
///
/// # Example
///
/// ```
/// use docs_crawler::crawler::extract_links;
/// use url::Url;
///
/// let html = r#"<html><body><a href="/docs/b#part">B</a></body></html>"#;
/// let base = Url::parse("https://example.com/docs/a").unwrap();
/// assert_eq!(extract_links(html, &base), vec!["https://example.com/docs/b"]);
/// ```
pub fn extract_links(html: &str, base_url: &Url) -> Vec<String> {
    let document = Html::parse_document(html);
    let mut links: Vec<String> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();

    let mut push = |href: &str| {
        if let Some(url) = resolve_link(href, base_url) {
            if seen.insert(url.clone()) {
                links.push(url);
            }
        }
    };

    if let Ok(a_selector) = Selector::parse("a[href]") {
        for element in document.select(&a_selector) {
            if element.value().attr("download").is_some() {
                continue;
            }
            if let Some(href) = element.value().attr("href") {
                push(href);
            }
        }
    }

    if let Ok(canonical_selector) = Selector::parse("link[rel='canonical'][href]") {
        for element in document.select(&canonical_selector) {
            if let Some(href) = element.value().attr("href") {
                push(href);
            }
        }
    }

    links
}

fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lowered = href.to_ascii_lowercase();
    if lowered.starts_with("javascript:")
        || lowered.starts_with("mailto:")
        || lowered.starts_with("tel:")
        || lowered.starts_with("data:")
    {
        return None;
    }

    match resolve_url(href, base_url) {
        Ok(url) => Some(url.to_string()),
        Err(e) => {
            trace!(href = %href, error = %e, "Dropping unresolvable link");
            None
        }
    }
}
