//! Crawler module for page fetching and crawl coordination
//!
//! This module contains the core crawling logic, including:
//! - Rendering pages and waiting for readiness
//! - Link extraction from rendered HTML
//! - Retries with exponential backoff
//! - The bounded worker pool and cooperative shutdown
//! - Overall crawl coordination

mod coordinator;
mod fetcher;
mod parser;
mod renderer;
mod retry;
mod scheduler;
mod shutdown;

pub use crate::output::{CrawlSummary, FailureRecord};
pub use coordinator::{mirror_dir, site_url, Coordinator, CrawlReport};
pub use fetcher::{
    FetchError, FetchErrorKind, FetchResult, FetchStatus, PageContent, PageFetcher,
};
pub use parser::extract_links;
pub use renderer::{
    build_http_client, has_content_marker, HttpRenderer, Readiness, RenderError, RenderedPage,
    Renderer,
};
pub use retry::{RetryPolicy, RetryState};
pub use scheduler::{Completion, PoolStats, TaskQueue, WorkerPool};
pub use shutdown::Shutdown;
