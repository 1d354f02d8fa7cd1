//! `failed.json`: pages that failed every attempt

use crate::output::summary::FailureRecord;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::info;

pub const FAILURE_REPORT_FILENAME: &str = "failed.json";

#[derive(Debug, Serialize)]
struct FailureReport<'a> {
    generated_at: DateTime<Utc>,
    count: usize,
    failures: &'a [FailureRecord],
}

/// Writes the failure report, or removes a stale one when nothing failed
///
/// Returns the report path when one was written.
pub fn write_failure_report(dir: &Path, failures: &[FailureRecord]) -> io::Result<Option<PathBuf>> {
    let path = dir.join(FAILURE_REPORT_FILENAME);

    if failures.is_empty() {
        if path.exists() {
            fs::remove_file(&path)?;
        }
        return Ok(None);
    }

    let report = FailureReport {
        generated_at: Utc::now(),
        count: failures.len(),
        failures,
    };
    let json = serde_json::to_string_pretty(&report).map_err(io::Error::other)?;
    fs::write(&path, json)?;

    info!(path = %path.display(), failures = failures.len(), "Wrote failure report");
    Ok(Some(path))
}
