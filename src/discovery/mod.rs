//! URL discovery: decides which URLs a run visits
//!
//! Discovery is an ordered list of [`DiscoveryStrategy`] values. Each one
//! either seeds a [`Frontier`] or reports itself unavailable, and the first
//! seeded frontier wins. In `auto` mode a missing or empty sitemap therefore
//! falls through to recursive link discovery.

mod frontier;
pub mod sitemap;

pub use frontier::{Frontier, FrontierLimits, TaskOrigin, UrlTask};
pub use sitemap::{fetch_sitemap, parse_sitemap, SitemapContent, SitemapError};

use crate::config::{Config, DiscoveryMode};
use crate::state::TaskState;
use crate::storage::CrawlProgress;
use crate::url::{normalize_url, PathFilter};
use crate::CrawlerError;
use reqwest::Client;
use std::fmt;
use tracing::{info, warn};
use url::Url;

/// One way of producing the set of URLs to visit
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscoveryStrategy {
    /// Explicit URLs; no filter, no link following
    Listed(Vec<String>),
    /// Page locations from a sitemap, filtered by path prefix
    Sitemap { url: String },
    /// Breadth-first link discovery from a start URL
    Recursive { start_url: String },
}

impl fmt::Display for DiscoveryStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Listed(urls) => write!(f, "list ({} URLs)", urls.len()),
            Self::Sitemap { url } => write!(f, "sitemap ({})", url),
            Self::Recursive { start_url } => write!(f, "recursive ({})", start_url),
        }
    }
}

/// Result of trying one strategy
#[derive(Debug)]
pub enum DiscoveryOutcome {
    Seeded(Frontier),
    Unavailable(String),
}

/// Builds the ordered strategy list for the configured mode
///
/// Strategies whose source is not configured are left out; validation
/// guarantees at least one remains for a valid config.
pub fn plan(config: &Config) -> Vec<DiscoveryStrategy> {
    let site = &config.site;
    let sitemap = site
        .effective_sitemap_url()
        .map(|url| DiscoveryStrategy::Sitemap { url });
    let recursive = site
        .effective_start_url()
        .map(|start_url| DiscoveryStrategy::Recursive { start_url });

    match site.mode {
        DiscoveryMode::Auto => sitemap.into_iter().chain(recursive).collect(),
        DiscoveryMode::Sitemap => sitemap.into_iter().collect(),
        DiscoveryMode::Crawl => recursive.into_iter().collect(),
        DiscoveryMode::List => vec![DiscoveryStrategy::Listed(site.urls.clone())],
    }
}

/// Tries discovery strategies in order
pub struct DiscoveryResolver {
    client: Client,
    filter: PathFilter,
    max_pages: usize,
    max_depth: Option<u32>,
}

impl DiscoveryResolver {
    pub fn new(client: Client, config: &Config) -> Self {
        Self {
            client,
            filter: PathFilter::new(&config.site.path_filter),
            max_pages: config.crawler.max_pages,
            max_depth: config.crawler.max_depth,
        }
    }

    /// Returns the frontier of the first strategy that produces one
    pub async fn resolve(&self, strategies: &[DiscoveryStrategy]) -> crate::Result<Frontier> {
        let mut reasons = Vec::new();

        for strategy in strategies {
            match self.try_strategy(strategy).await {
                DiscoveryOutcome::Seeded(frontier) => {
                    info!(
                        strategy = %strategy,
                        urls = frontier.pending(),
                        "Discovery seeded frontier"
                    );
                    return Ok(frontier);
                }
                DiscoveryOutcome::Unavailable(reason) => {
                    warn!(strategy = %strategy, reason = %reason, "Discovery strategy unavailable");
                    reasons.push(format!("{}: {}", strategy, reason));
                }
            }
        }

        if reasons.is_empty() {
            reasons.push("no discovery strategy configured".to_string());
        }
        Err(CrawlerError::NoSource(reasons.join("; ")))
    }

    pub async fn try_strategy(&self, strategy: &DiscoveryStrategy) -> DiscoveryOutcome {
        match strategy {
            DiscoveryStrategy::Listed(urls) => self.seed_listed(urls),
            DiscoveryStrategy::Sitemap { url } => self.seed_sitemap(url).await,
            DiscoveryStrategy::Recursive { start_url } => self.seed_recursive(start_url),
        }
    }

    /// Rebuilds the frontier of an interrupted run
    ///
    /// Pending URLs are queued in their saved order; completed and failed
    /// URLs are recorded as visited so they are neither refetched nor
    /// rediscovered. Returns `None` when no pending URL is usable.
    pub fn resume(&self, progress: &CrawlProgress) -> Option<Frontier> {
        let pending: Vec<Url> = progress
            .pending
            .iter()
            .filter_map(|raw| normalize_url(raw).ok())
            .collect();
        let origin = pending.first()?.clone();

        let filter = if progress.follow_links {
            self.filter.clone()
        } else {
            PathFilter::allow_all()
        };
        let mut frontier = Frontier::new(origin, filter, self.limits(progress.follow_links));

        let finished = progress
            .completed
            .iter()
            .map(|url| (url, TaskState::Succeeded))
            .chain(progress.failed.iter().map(|url| (url, TaskState::Failed)));
        for (raw, state) in finished {
            if let Ok(url) = normalize_url(raw) {
                frontier.restore(&url, state);
            }
        }
        for url in pending {
            frontier.seed(url, TaskOrigin::Resumed);
        }

        if frontier.is_empty() {
            return None;
        }
        info!(
            pending = frontier.pending(),
            visited = frontier.visited_len(),
            "Resuming interrupted crawl"
        );
        Some(frontier)
    }

    fn limits(&self, follow_links: bool) -> FrontierLimits {
        FrontierLimits {
            max_count: self.max_pages,
            max_depth: self.max_depth,
            follow_links,
        }
    }

    fn seed_listed(&self, urls: &[String]) -> DiscoveryOutcome {
        let parsed: Vec<Url> = urls
            .iter()
            .filter_map(|raw| match normalize_url(raw) {
                Ok(url) => Some(url),
                Err(e) => {
                    warn!(url = %raw, error = %e, "Skipping invalid listed URL");
                    None
                }
            })
            .collect();

        let Some(first) = parsed.first().cloned() else {
            return DiscoveryOutcome::Unavailable("URL list is empty".to_string());
        };

        let mut frontier = Frontier::new(first, PathFilter::allow_all(), self.limits(false));
        for url in parsed {
            frontier.seed(url, TaskOrigin::Listed);
        }
        DiscoveryOutcome::Seeded(frontier)
    }

    async fn seed_sitemap(&self, sitemap_url: &str) -> DiscoveryOutcome {
        let origin = match normalize_url(sitemap_url) {
            Ok(url) => url,
            Err(e) => return DiscoveryOutcome::Unavailable(format!("invalid sitemap URL: {}", e)),
        };

        let locations = match fetch_sitemap(&self.client, sitemap_url).await {
            Ok(locations) => locations,
            Err(e) => return DiscoveryOutcome::Unavailable(e.to_string()),
        };
        let listed = locations.len();

        let mut frontier = Frontier::new(origin, self.filter.clone(), self.limits(false));
        for url in locations.iter().filter_map(|loc| normalize_url(loc).ok()) {
            if self.filter.matches(&url) {
                frontier.seed(url, TaskOrigin::Sitemap);
            }
        }

        if frontier.is_empty() {
            return DiscoveryOutcome::Unavailable(format!(
                "none of {} sitemap URLs match {}",
                listed,
                self.filter.prefix()
            ));
        }
        info!(
            listed,
            kept = frontier.pending(),
            filter = self.filter.prefix(),
            "Filtered sitemap URLs"
        );
        DiscoveryOutcome::Seeded(frontier)
    }

    fn seed_recursive(&self, start_url: &str) -> DiscoveryOutcome {
        let start = match normalize_url(start_url) {
            Ok(url) => url,
            Err(e) => return DiscoveryOutcome::Unavailable(format!("invalid start URL: {}", e)),
        };

        let mut frontier = Frontier::new(start.clone(), self.filter.clone(), self.limits(true));
        frontier.seed(start, TaskOrigin::Discovered);
        DiscoveryOutcome::Seeded(frontier)
    }
}
