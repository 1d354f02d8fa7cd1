//! Mirror directory layout and page files

use sha2::{Digest, Sha256};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;
use url::Url;

/// Name of the generated index page; no page slug may take it
pub const INDEX_FILENAME: &str = "index.md";

/// Derives the output file name for a page URL
///
/// The path is trimmed of slashes and inner slashes become `_`. A query
/// string is appended in sanitized form so `?v=1` and `?v=2` stay distinct.
/// The site root becomes `home.md`.
///
/// # Examples
///
/// ```
/// use docs_crawler::output::slug_for;
/// use url::Url;
///
/// let url = Url::parse("https://example.com/docs/guide/install").unwrap();
/// assert_eq!(slug_for(&url), "docs_guide_install.md");
/// ```
pub fn slug_for(url: &Url) -> String {
    let mut slug = sanitize(&url.path().trim_matches('/').replace('/', "_"));

    if let Some(query) = url.query().filter(|q| !q.is_empty()) {
        if !slug.is_empty() {
            slug.push('_');
        }
        slug.push_str(&sanitize(query));
    }

    if slug.is_empty() {
        slug = "home".to_string();
    }
    if format!("{}.md", slug) == INDEX_FILENAME {
        slug.push_str("_page");
    }
    format!("{}.md", slug)
}

/// File name for a URL whose [`slug_for`] name is taken by another URL
///
/// Appends the first eight hex digits of the URL's SHA-256, so
/// `/docs/a` and `/docs/a/` (or `/docs/a_b` and `/docs/a/b`) land in
/// different files.
pub fn disambiguated_slug(url: &Url) -> String {
    let slug = slug_for(url);
    let stem = slug.strip_suffix(".md").unwrap_or(&slug);
    let digest = hex::encode(Sha256::digest(url.as_str().as_bytes()));
    format!("{}_{}.md", stem, &digest[..8])
}

fn sanitize(raw: &str) -> String {
    raw.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Writes page files into the mirror directory
#[derive(Debug, Clone)]
pub struct MirrorWriter {
    dir: PathBuf,
}

impl MirrorWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Creates the mirror directory and checks that it accepts writes
    pub fn ensure_writable(&self) -> io::Result<()> {
        fs::create_dir_all(&self.dir)?;
        let scratch = self.dir.join(".write-test");
        fs::write(&scratch, b"")?;
        fs::remove_file(&scratch)
    }

    /// Writes a page's Markdown to `file_name` inside the mirror
    pub fn write_page(&self, url: &Url, file_name: &str, markdown: &str) -> io::Result<()> {
        let path = self.dir.join(file_name);

        let mut content = markdown.to_string();
        if !content.ends_with('\n') {
            content.push('\n');
        }
        fs::write(&path, content)?;

        debug!(url = %url, file = %file_name, "Wrote page");
        Ok(())
    }

    /// True if a previously written page file is still present
    pub fn exists(&self, file_name: &str) -> bool {
        self.dir.join(file_name).is_file()
    }
}
