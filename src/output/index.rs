//! The `index.md` table of mirrored pages

use crate::output::writer::INDEX_FILENAME;
use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::info;

/// A page present in the mirror after a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MirroredPage {
    pub url: String,
    pub title: String,
    /// File name relative to the mirror directory
    pub path: String,
}

/// Renders the index table, sorted by title
pub fn format_index(pages: &[MirroredPage]) -> String {
    let mut sorted: Vec<&MirroredPage> = pages.iter().collect();
    sorted.sort_by(|a, b| a.title.cmp(&b.title).then_with(|| a.url.cmp(&b.url)));

    let mut md = String::new();
    md.push_str("# Documentation Index\n\n");
    md.push_str("| Title | Original URL | Local File |\n");
    md.push_str("|-------|--------------|------------|\n");
    for page in sorted {
        md.push_str(&format!(
            "| {} | [{}]({}) | [{}]({}) |\n",
            page.title.replace('|', "\\|"),
            page.url,
            page.url,
            page.path,
            page.path
        ));
    }
    md
}

/// Writes `index.md` into the mirror directory
pub fn write_index(dir: &Path, pages: &[MirroredPage]) -> io::Result<PathBuf> {
    let path = dir.join(INDEX_FILENAME);
    fs::write(&path, format_index(pages))?;
    info!(path = %path.display(), pages = pages.len(), "Generated index");
    Ok(path)
}

/// Reads the local file column of an index, in table order
///
/// Returns `None` when the index is missing or lists no files.
pub fn read_index_order(dir: &Path) -> Option<Vec<String>> {
    let content = fs::read_to_string(dir.join(INDEX_FILENAME)).ok()?;

    let files: Vec<String> = content
        .lines()
        .map(str::trim)
        .filter(|line| line.starts_with('|'))
        .filter_map(|line| {
            let cell = line.trim_end_matches('|').rsplit('|').next()?.trim();
            let end = cell.find("](")?;
            let name = cell.strip_prefix('[')?.get(..end - 1)?;
            (name.ends_with(".md") && name != INDEX_FILENAME).then(|| name.to_string())
        })
        .collect();

    if files.is_empty() {
        None
    } else {
        Some(files)
    }
}
