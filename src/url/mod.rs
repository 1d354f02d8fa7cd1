//! URL handling module for docs-crawler
//!
//! This module provides URL normalization, path filtering, origin checks and
//! the mirror folder naming derived from a site's host.

mod domain;
mod filter;
mod normalize;

// Re-export main functions
pub use domain::{extract_domain, site_label};
pub use filter::{same_origin, PathFilter};
pub use normalize::{normalize_url, resolve_url};
