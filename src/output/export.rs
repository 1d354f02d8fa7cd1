//! Merged single-file export of a mirror

use crate::output::index::read_index_order;
use crate::output::writer::INDEX_FILENAME;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

/// Default file name of the merged export
pub const MERGED_FILENAME: &str = "merged.md";

const SEPARATOR: &str = "\n\n---\n\n";

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("No Markdown pages found in {0}")]
    NoPages(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Page files in export order: index order when available, else alphabetical
pub fn page_order(dir: &Path) -> Result<Vec<String>, ExportError> {
    if let Some(files) = read_index_order(dir) {
        let existing: Vec<String> = files
            .into_iter()
            .filter(|name| dir.join(name).is_file())
            .collect();
        if !existing.is_empty() {
            return Ok(existing);
        }
    }

    warn!(dir = %dir.display(), "No usable index, merging pages alphabetically");
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let name = entry?.file_name().to_string_lossy().to_string();
        if name.ends_with(".md") && name != INDEX_FILENAME && name != MERGED_FILENAME {
            files.push(name);
        }
    }
    files.sort();
    Ok(files)
}

/// Concatenates the mirror's pages, separated by horizontal rules
pub fn merge_pages(dir: &Path) -> Result<String, ExportError> {
    let files = page_order(dir)?;
    if files.is_empty() {
        return Err(ExportError::NoPages(dir.to_path_buf()));
    }

    let mut merged = String::new();
    for name in files {
        match fs::read_to_string(dir.join(&name)) {
            Ok(content) => {
                if !merged.is_empty() {
                    merged.push_str(SEPARATOR);
                }
                merged.push_str(content.trim());
            }
            Err(e) => warn!(file = %name, error = %e, "Skipping unreadable page"),
        }
    }
    Ok(merged)
}

/// Writes the merged export and returns its path
///
/// Defaults to `merged.md` inside the mirror directory.
pub fn export_merged(dir: &Path, output: Option<&Path>) -> Result<PathBuf, ExportError> {
    let merged = merge_pages(dir)?;
    let path = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| dir.join(MERGED_FILENAME));

    fs::write(&path, merged)?;
    info!(path = %path.display(), "Merged Markdown written");
    Ok(path)
}
