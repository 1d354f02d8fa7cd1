//! Persisted URL to content-fingerprint mapping
//!
//! The store lives in a single JSON file inside the mirror directory and is
//! rewritten atomically (temp file + rename), so a crash mid-save leaves the
//! previous version in place.

use super::write_atomic;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

/// File name of the fingerprint cache inside the mirror directory
pub const CACHE_FILENAME: &str = ".docs-crawler-cache.json";

/// On-disk format version; any other version is treated as corrupt
pub const CACHE_VERSION: u32 = 1;

/// Errors raised by the fingerprint store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Fingerprint cache is corrupt: {0}")]
    Corrupt(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Last-seen state of one URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct FingerprintEntry {
    pub fingerprint: String,
    /// Output file name relative to the mirror directory
    pub output_path: String,
    /// Page title, kept so the index can list pages a run did not reach
    #[serde(default)]
    pub title: String,
    pub last_crawled_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
struct CacheFile {
    version: u32,
    pages: BTreeMap<String, FingerprintEntry>,
}

/// Computes the SHA-256 fingerprint of converted page text
///
/// Line endings and trailing whitespace are normalized first so that
/// cosmetic differences in the served HTML do not register as changes.
pub fn content_fingerprint(markdown: &str) -> String {
    let mut hasher = Sha256::new();
    for line in markdown.trim().lines() {
        hasher.update(line.trim_end().as_bytes());
        hasher.update(b"\n");
    }
    hex::encode(hasher.finalize())
}

/// In-memory fingerprint store backed by a JSON file
#[derive(Debug)]
pub struct FingerprintStore {
    path: PathBuf,
    entries: BTreeMap<String, FingerprintEntry>,
    dirty: bool,
}

impl FingerprintStore {
    /// Opens the store in `mirror_dir`
    ///
    /// A missing file is a first run. An unreadable or version-mismatched file
    /// is logged and replaced by an empty store.
    pub fn open(mirror_dir: &Path) -> Self {
        let path = mirror_dir.join(CACHE_FILENAME);
        let entries = match Self::read_entries(&path) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Discarding fingerprint cache");
                BTreeMap::new()
            }
        };
        debug!(path = %path.display(), entries = entries.len(), "Loaded fingerprint cache");

        Self {
            path,
            entries,
            dirty: false,
        }
    }

    fn read_entries(path: &Path) -> StoreResult<BTreeMap<String, FingerprintEntry>> {
        if !path.exists() {
            return Ok(BTreeMap::new());
        }

        let raw = fs::read_to_string(path)?;
        let file: CacheFile =
            serde_json::from_str(&raw).map_err(|e| StoreError::Corrupt(e.to_string()))?;

        if file.version != CACHE_VERSION {
            return Err(StoreError::Corrupt(format!(
                "version {} (expected {})",
                file.version, CACHE_VERSION
            )));
        }

        Ok(file.pages)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &FingerprintEntry)> {
        self.entries.iter().map(|(url, entry)| (url.as_str(), entry))
    }

    pub fn get(&self, url: &str) -> Option<&FingerprintEntry> {
        self.entries.get(url)
    }

    /// Returns true if `url` was last seen with exactly `fingerprint`
    pub fn is_unchanged(&self, url: &str, fingerprint: &str) -> bool {
        self.entries
            .get(url)
            .map_or(false, |entry| entry.fingerprint == fingerprint)
    }

    /// Records a freshly written page
    pub fn update(&mut self, url: &str, fingerprint: &str, output_path: &str, title: &str) {
        self.entries.insert(
            url.to_string(),
            FingerprintEntry {
                fingerprint: fingerprint.to_string(),
                output_path: output_path.to_string(),
                title: title.to_string(),
                last_crawled_at: Utc::now(),
            },
        );
        self.dirty = true;
    }

    /// Refreshes the crawl timestamp and title of an unchanged page
    pub fn touch(&mut self, url: &str, title: &str) {
        if let Some(entry) = self.entries.get_mut(url) {
            entry.last_crawled_at = Utc::now();
            if entry.title != title {
                entry.title = title.to_string();
            }
            self.dirty = true;
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Writes the store to disk atomically
    pub fn save(&mut self) -> StoreResult<()> {
        let file = CacheFile {
            version: CACHE_VERSION,
            pages: self.entries.clone(),
        };
        let json = serde_json::to_string_pretty(&file)?;
        write_atomic(&self.path, &json)?;
        self.dirty = false;

        debug!(path = %self.path.display(), entries = self.entries.len(), "Saved fingerprint cache");
        Ok(())
    }

    /// Drops every entry and deletes the cache file
    pub fn clear(&mut self) -> StoreResult<()> {
        self.entries.clear();
        self.dirty = false;
        if self.path.exists() {
            fs::remove_file(&self.path)?;
        }
        Ok(())
    }
}
