//! Progress of an interrupted crawl
//!
//! When a run stops with URLs still queued (Ctrl-C or the run timeout), the
//! queue is saved next to the mirror. A later run started with `--resume`
//! seeds its frontier from the saved queue instead of rediscovering the site,
//! and treats the recorded completed and failed URLs as already visited.

use super::{write_atomic, StoreError, StoreResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// File name of the progress file inside the mirror directory
pub const PROGRESS_FILENAME: &str = ".docs-crawler-progress.json";

/// On-disk format version; any other version is ignored
pub const PROGRESS_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CrawlProgress {
    pub version: u32,
    pub saved_at: DateTime<Utc>,
    /// Whether the interrupted run enqueued the links of fetched pages
    pub follow_links: bool,
    /// URLs never dispatched, in queue order
    pub pending: Vec<String>,
    pub completed: Vec<String>,
    pub failed: Vec<String>,
}

impl CrawlProgress {
    pub fn new(
        follow_links: bool,
        pending: Vec<String>,
        completed: Vec<String>,
        failed: Vec<String>,
    ) -> Self {
        Self {
            version: PROGRESS_VERSION,
            saved_at: Utc::now(),
            follow_links,
            pending,
            completed,
            failed,
        }
    }

    pub fn path(mirror_dir: &Path) -> PathBuf {
        mirror_dir.join(PROGRESS_FILENAME)
    }

    /// Loads the saved progress of `mirror_dir`
    ///
    /// A missing file means there is nothing to resume. An unreadable or
    /// version-mismatched file is logged and ignored.
    pub fn load(mirror_dir: &Path) -> Option<Self> {
        let path = Self::path(mirror_dir);
        match Self::read(&path) {
            Ok(progress) => progress,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Ignoring crawl progress file");
                None
            }
        }
    }

    fn read(path: &Path) -> StoreResult<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }

        let raw = fs::read_to_string(path)?;
        let progress: Self =
            serde_json::from_str(&raw).map_err(|e| StoreError::Corrupt(e.to_string()))?;

        if progress.version != PROGRESS_VERSION {
            return Err(StoreError::Corrupt(format!(
                "version {} (expected {})",
                progress.version, PROGRESS_VERSION
            )));
        }

        info!(
            completed = progress.completed.len(),
            failed = progress.failed.len(),
            pending = progress.pending.len(),
            "Loaded crawl progress"
        );
        Ok(Some(progress))
    }

    /// Writes the progress file atomically and returns its path
    pub fn save(&self, mirror_dir: &Path) -> StoreResult<PathBuf> {
        let path = Self::path(mirror_dir);
        let json = serde_json::to_string_pretty(self)?;
        write_atomic(&path, &json)?;

        debug!(path = %path.display(), pending = self.pending.len(), "Saved crawl progress");
        Ok(path)
    }

    /// Deletes the progress file; returns true if one existed
    pub fn clear(mirror_dir: &Path) -> StoreResult<bool> {
        let path = Self::path(mirror_dir);
        if !path.exists() {
            return Ok(false);
        }
        fs::remove_file(&path)?;
        debug!(path = %path.display(), "Cleared crawl progress");
        Ok(true)
    }

    pub fn is_complete(&self) -> bool {
        self.pending.is_empty()
    }
}
