//! docs-crawler: incremental documentation mirroring
//!
//! This crate fetches the pages of a documentation site, extracts the readable
//! body, converts it to Markdown and writes a navigable local mirror. URLs come
//! from a sitemap, a URL list, or recursive link discovery, and a fingerprint
//! cache keeps repeated runs from rewriting unchanged pages.

pub mod config;
pub mod crawler;
pub mod discovery;
pub mod output;
pub mod state;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for run-level failures
///
/// Per-page failures never surface here; they are carried as data inside
/// [`crawler::FetchResult`].
#[derive(Debug, Error)]
pub enum CrawlerError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("Output directory {path} is not writable: {source}")]
    OutputNotWritable {
        path: String,
        source: std::io::Error,
    },

    #[error("No URLs to crawl: {0}")]
    NoSource(String),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Storage error: {0}")]
    Store(#[from] storage::StoreError),

    #[error("Invalid state transition for {url}: {from:?} -> {to:?}")]
    InvalidTransition {
        url: String,
        from: state::TaskState,
        to: state::TaskState,
    },

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid selector: {0}")]
    InvalidSelector(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing host in URL")]
    MissingHost,
}

/// Result type alias for run-level operations
pub type Result<T> = std::result::Result<T, CrawlerError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{CrawlReport, CrawlSummary, Coordinator, HttpRenderer, Shutdown};
pub use state::TaskState;
pub use url::{normalize_url, PathFilter};
