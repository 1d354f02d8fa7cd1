//! Storage module for persisting crawl data between runs
//!
//! Two files are kept in the mirror directory:
//! - the fingerprint cache, mapping normalized URLs to the fingerprint of
//!   their converted content and the file they were written to, so repeated
//!   runs skip pages that have not changed
//! - the progress file of an interrupted crawl, used to resume it

mod fingerprint;
mod progress;

pub use fingerprint::{
    content_fingerprint, FingerprintEntry, FingerprintStore, StoreError, StoreResult,
    CACHE_FILENAME, CACHE_VERSION,
};
pub use progress::{CrawlProgress, PROGRESS_FILENAME, PROGRESS_VERSION};

use std::fs;
use std::io;
use std::path::Path;

/// Replaces `path` with `contents` via a temp file and rename, so a crash
/// mid-write leaves the previous version in place
fn write_atomic(path: &Path, contents: &str) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let tmp_path = path.with_extension("json.tmp");
    fs::write(&tmp_path, contents)?;

    #[cfg(target_os = "windows")]
    if path.exists() {
        fs::remove_file(path)?;
    }

    fs::rename(&tmp_path, path)
}
