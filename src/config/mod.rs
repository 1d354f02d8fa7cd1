//! Configuration module for docs-crawler
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! Every setting has a documented default, so the CLI can run without a file.
//!
//! # Example
//!
//! ```no_run
//! use docs_crawler::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("crawler.toml")).unwrap();
//! println!("Crawler will run {} pages at once", config.crawler.concurrency);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, CrawlerConfig, DiscoveryMode, OutputConfig, RenderConfig, SiteConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
pub use validation::validate;
