//! Output module for the local mirror
//!
//! This module handles:
//! - Converting rendered HTML to Markdown
//! - Naming and writing page files
//! - Generating `index.md` and the `failed.json` report
//! - Merged single-file export
//! - Crawl summaries

mod export;
mod index;
pub mod markdown;
mod report;
mod summary;
mod writer;

pub use export::{export_merged, merge_pages, page_order, ExportError, MERGED_FILENAME};
pub use index::{format_index, read_index_order, write_index, MirroredPage};
pub use markdown::{to_markdown, ConvertedPage};
pub use report::{write_failure_report, FAILURE_REPORT_FILENAME};
pub use summary::{print_summary, CrawlSummary, FailureRecord};
pub use writer::{disambiguated_slug, slug_for, MirrorWriter, INDEX_FILENAME};
