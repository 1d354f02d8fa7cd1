//! HTML to Markdown conversion
//!
//! Extracts the readable body of a documentation page (dropping navigation
//! chrome) and converts it to Markdown. The conversion is pure and
//! deterministic, which keeps content fingerprints stable across runs.

use scraper::{Html, Selector};

/// Title used when a page has no usable `<title>`
pub const UNTITLED: &str = "No Title";

/// Elements removed before extraction
const REMOVED_ELEMENTS: &[&str] = &[
    "nav", "footer", "script", "style", "noscript", "iframe", "header", "img",
];

/// Navigation chrome removed before extraction
const REMOVED_SELECTORS: &[&str] = &[
    ".sidebar",
    "#sidebar",
    ".toc",
    "#toc",
    ".breadcrumbs",
    ".breadcrumb",
    ".footer",
    ".header",
    ".nav",
    "[role=\"navigation\"]",
    ".navigation",
    ".menu",
];

/// Content containers, most specific first
const CONTENT_SELECTORS: &[&str] = &[
    "article",
    "[role=\"main\"]",
    ".docs-content",
    ".content",
    ".markdown-body",
    "main",
    ".main-content",
];

/// A container must hold more than this many characters of text to be chosen
const MIN_CONTENT_CHARS: usize = 100;

/// Result of converting one page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertedPage {
    pub title: String,
    pub markdown: String,
}

/// Converts a rendered page to Markdown
///
/// # Extraction Rules
///
/// 1. Title comes from `<title>`, or [`UNTITLED`] when absent or blank
/// 2. Navigation, scripts, images and similar chrome are removed
/// 3. The first content container with more than 100 characters of text is
///    converted; otherwise `<body>` is used
/// 4. Runs of blank lines are collapsed to one
///
/// # Example
///
/// ```
/// use docs_crawler::output::to_markdown;
///
/// let page = to_markdown("<html><head><title>Intro</title></head><body><p>Hello</p></body></html>");
/// assert_eq!(page.title, "Intro");
/// assert!(page.markdown.contains("Hello"));
/// ```
pub fn to_markdown(html: &str) -> ConvertedPage {
    let mut document = Html::parse_document(html);
    let title = extract_title(&document);

    remove_chrome(&mut document);

    let content_html = select_content(&document).unwrap_or_default();
    let markdown = collapse_blank_lines(&html2md::parse_html(&content_html));

    ConvertedPage { title, markdown }
}

fn extract_title(document: &Html) -> String {
    Selector::parse("title")
        .ok()
        .and_then(|selector| {
            document
                .select(&selector)
                .next()
                .map(|element| element.text().collect::<String>().trim().to_string())
        })
        .filter(|title| !title.is_empty())
        .unwrap_or_else(|| UNTITLED.to_string())
}

fn remove_chrome(document: &mut Html) {
    let selectors = REMOVED_ELEMENTS.iter().chain(REMOVED_SELECTORS.iter());
    let mut ids = Vec::new();
    for selector in selectors.filter_map(|s| Selector::parse(s).ok()) {
        ids.extend(document.select(&selector).map(|element| element.id()));
    }

    for id in ids {
        if let Some(mut node) = document.tree.get_mut(id) {
            node.detach();
        }
    }
}

fn select_content(document: &Html) -> Option<String> {
    for selector in CONTENT_SELECTORS.iter().filter_map(|s| Selector::parse(s).ok()) {
        if let Some(element) = document.select(&selector).next() {
            let text_len: usize = element.text().map(|t| t.trim().chars().count()).sum();
            if text_len > MIN_CONTENT_CHARS {
                return Some(element.inner_html());
            }
        }
    }

    let body = Selector::parse("body").ok()?;
    document
        .select(&body)
        .next()
        .map(|element| element.inner_html())
}

fn collapse_blank_lines(markdown: &str) -> String {
    let mut lines = Vec::new();
    let mut previous_blank = false;
    for line in markdown.lines() {
        let blank = line.trim().is_empty();
        if blank && previous_blank {
            continue;
        }
        lines.push(if blank { "" } else { line });
        previous_blank = blank;
    }
    lines.join("\n").trim().to_string()
}
