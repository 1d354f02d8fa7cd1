use serde::Deserialize;

/// Main configuration structure for docs-crawler
///
/// Every field has a default, so an empty TOML file is a valid (if useless)
/// configuration. Validation happens in [`crate::config::validate`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub site: SiteConfig,
    pub crawler: CrawlerConfig,
    pub render: RenderConfig,
    pub output: OutputConfig,
}

/// Where URLs come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscoveryMode {
    /// Sitemap first, recursive discovery when the sitemap is unusable
    #[default]
    Auto,
    /// Sitemap only
    Sitemap,
    /// Recursive link discovery only
    Crawl,
    /// Explicit URL list only
    List,
}

impl DiscoveryMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Sitemap => "sitemap",
            Self::Crawl => "crawl",
            Self::List => "list",
        }
    }
}

/// The site being mirrored
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct SiteConfig {
    /// Base URL of the documentation site (e.g. `https://example.com`)
    pub base_url: Option<String>,

    /// Sitemap location; defaults to `<base-url>/sitemap.xml`
    pub sitemap_url: Option<String>,

    /// Start URL for recursive discovery; defaults to `<base-url><path-filter>`
    pub start_url: Option<String>,

    /// Path prefix a URL must start with to be crawled
    pub path_filter: String,

    /// Explicit URLs for list mode
    pub urls: Vec<String>,

    /// Discovery strategy selection
    pub mode: DiscoveryMode,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            sitemap_url: None,
            start_url: None,
            path_filter: "/docs/".to_string(),
            urls: Vec::new(),
            mode: DiscoveryMode::Auto,
        }
    }
}

impl SiteConfig {
    /// Sitemap URL after applying the `<base-url>/sitemap.xml` default
    pub fn effective_sitemap_url(&self) -> Option<String> {
        self.sitemap_url.clone().or_else(|| {
            self.base_url
                .as_ref()
                .map(|base| format!("{}/sitemap.xml", base.trim_end_matches('/')))
        })
    }

    /// Start URL after applying the `<base-url><path-filter>` default
    pub fn effective_start_url(&self) -> Option<String> {
        self.start_url.clone().or_else(|| {
            self.base_url.as_ref().map(|base| {
                let filter = if self.path_filter.starts_with('/') {
                    self.path_filter.clone()
                } else {
                    format!("/{}", self.path_filter)
                };
                format!("{}{}", base.trim_end_matches('/'), filter)
            })
        })
    }
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct CrawlerConfig {
    /// Maximum number of fetches in flight at once
    pub concurrency: usize,

    /// Cap on the number of URLs recorded per run
    pub max_pages: usize,

    /// Optional depth bound for recursive discovery
    pub max_depth: Option<u32>,

    /// Attempts per page, including the first
    pub max_retries: u32,

    /// Base backoff between attempts (milliseconds)
    pub retry_delay_ms: u64,

    /// Backoff ceiling (milliseconds)
    pub max_retry_delay_ms: u64,

    /// Stop dispatching new pages after this many seconds
    pub run_timeout_secs: Option<u64>,

    /// Skip pages whose fingerprint matches the cache
    pub incremental: bool,

    /// Write every fetched page regardless of fingerprint
    pub force: bool,

    /// Persist the fingerprint cache every N completed pages
    pub checkpoint_every: usize,

    /// Continue an interrupted crawl from its saved queue, if one exists
    pub resume: bool,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            concurrency: 5,
            max_pages: 1000,
            max_depth: None,
            max_retries: 3,
            retry_delay_ms: 1000,
            max_retry_delay_ms: 10_000,
            run_timeout_secs: None,
            incremental: true,
            force: false,
            checkpoint_every: 25,
            resume: false,
        }
    }
}

/// Rendering and readiness configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct RenderConfig {
    /// Bound on navigation until the document is ready (milliseconds)
    pub navigation_timeout_ms: u64,

    /// CSS selector that marks the main content container
    pub content_selector: String,

    /// Bound on waiting for the content selector (milliseconds)
    pub content_timeout_ms: u64,

    /// Treat a missing content marker as a render error
    pub require_content_marker: bool,

    /// User-Agent header sent with every request
    pub user_agent: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            navigation_timeout_ms: 30_000,
            content_selector: r#"article, main, [role="main"]"#.to_string(),
            content_timeout_ms: 10_000,
            require_content_marker: false,
            user_agent: format!("docs-crawler/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct OutputConfig {
    /// Root output directory
    pub dir: String,

    /// Mirror folder under `dir`; defaults to the site's domain label
    pub folder: Option<String>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: "output".to_string(),
            folder: None,
        }
    }
}
