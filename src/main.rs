//! docs-crawler main entry point
//!
//! This is the command-line interface for mirroring a documentation site
//! into local Markdown files.

use anyhow::{bail, Context};
use clap::{Parser, ValueEnum};
use docs_crawler::config::{load_config_with_hash, validate, Config, DiscoveryMode};
use docs_crawler::crawler::{mirror_dir, Coordinator, Shutdown};
use docs_crawler::discovery::plan;
use docs_crawler::output::{export_merged, print_summary};
use docs_crawler::storage::{CrawlProgress, FingerprintStore};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// docs-crawler: mirror a documentation site as Markdown
///
/// URLs come from the site's sitemap, a URL list, or recursive link
/// discovery. Pages that have not changed since the previous run are
/// skipped.
#[derive(Parser, Debug)]
#[command(name = "docs-crawler")]
#[command(version)]
#[command(about = "Incremental documentation mirroring", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// URL discovery mode
    #[arg(long, value_enum)]
    mode: Option<ModeArg>,

    /// Site base URL (e.g. https://code.claude.com)
    #[arg(long)]
    base_url: Option<String>,

    /// Sitemap URL (default: <base-url>/sitemap.xml)
    #[arg(long)]
    sitemap_url: Option<String>,

    /// First page for recursive discovery (default: <base-url><path-filter>)
    #[arg(long)]
    start_url: Option<String>,

    /// File with one URL per line; implies list mode
    #[arg(long, value_name = "PATH")]
    file: Option<PathBuf>,

    /// Only crawl URLs whose path starts with this prefix
    #[arg(long)]
    path_filter: Option<String>,

    /// Root output directory
    #[arg(short, long)]
    output_dir: Option<String>,

    /// Mirror folder inside the output directory
    #[arg(long)]
    folder: Option<String>,

    /// Pages fetched at once
    #[arg(long)]
    concurrency: Option<usize>,

    /// Cap on the number of URLs crawled
    #[arg(long)]
    max_pages: Option<usize>,

    /// Attempts per page, including the first
    #[arg(long)]
    max_retries: Option<u32>,

    /// Stop dispatching new pages after this many seconds
    #[arg(long, value_name = "SECS")]
    run_timeout: Option<u64>,

    /// Rewrite every page even if unchanged
    #[arg(long)]
    force: bool,

    /// Ignore the fingerprint cache for this run
    #[arg(long)]
    no_incremental: bool,

    /// Continue an interrupted crawl from its saved queue
    #[arg(long)]
    resume: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Show the resolved configuration and discovery plan without crawling
    #[arg(long, conflicts_with_all = ["cache_stats", "clear_cache", "export_merged"])]
    dry_run: bool,

    /// Show fingerprint cache statistics and exit
    #[arg(long, conflicts_with_all = ["dry_run", "clear_cache", "export_merged"])]
    cache_stats: bool,

    /// Delete the fingerprint cache and exit
    #[arg(long, conflicts_with_all = ["dry_run", "cache_stats", "export_merged"])]
    clear_cache: bool,

    /// Merge the mirrored pages into one file and exit (default: <mirror>/merged.md)
    #[arg(long, value_name = "PATH", num_args = 0..=1)]
    export_merged: Option<Option<PathBuf>>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ModeArg {
    Auto,
    Sitemap,
    Crawl,
    List,
}

impl From<ModeArg> for DiscoveryMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Auto => DiscoveryMode::Auto,
            ModeArg::Sitemap => DiscoveryMode::Sitemap,
            ModeArg::Crawl => DiscoveryMode::Crawl,
            ModeArg::List => DiscoveryMode::List,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("{:#}", e);
            ExitCode::from(1)
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let config = resolve_config(&cli)?;

    if cli.dry_run {
        handle_dry_run(&config)?;
    } else if cli.cache_stats {
        handle_cache_stats(&config)?;
    } else if cli.clear_cache {
        handle_clear_cache(&config)?;
    } else if let Some(output) = &cli.export_merged {
        handle_export_merged(&config, output.as_deref())?;
    } else {
        return handle_crawl(config).await;
    }

    Ok(ExitCode::SUCCESS)
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("docs_crawler=info,warn"),
            1 => EnvFilter::new("docs_crawler=debug,info"),
            2 => EnvFilter::new("docs_crawler=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Builds the effective configuration: defaults, then file, then flags
fn resolve_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("Failed to load configuration from {}", path.display()))?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            config
        }
        None => Config::default(),
    };

    let site = &mut config.site;
    if let Some(url) = &cli.base_url {
        site.base_url = Some(url.clone());
    }
    if let Some(url) = &cli.sitemap_url {
        site.sitemap_url = Some(url.clone());
    }
    if let Some(url) = &cli.start_url {
        site.start_url = Some(url.clone());
    }
    if let Some(filter) = &cli.path_filter {
        site.path_filter = filter.clone();
    }
    if let Some(path) = &cli.file {
        site.urls = read_url_list(path)?;
        site.mode = DiscoveryMode::List;
    }
    if let Some(mode) = cli.mode {
        site.mode = mode.into();
    }

    let crawler = &mut config.crawler;
    if let Some(n) = cli.concurrency {
        crawler.concurrency = n;
    }
    if let Some(n) = cli.max_pages {
        crawler.max_pages = n;
    }
    if let Some(n) = cli.max_retries {
        crawler.max_retries = n;
    }
    if let Some(secs) = cli.run_timeout {
        crawler.run_timeout_secs = Some(secs);
    }
    if cli.force {
        crawler.force = true;
    }
    if cli.no_incremental {
        crawler.incremental = false;
    }
    if cli.resume {
        crawler.resume = true;
    }

    if let Some(dir) = &cli.output_dir {
        config.output.dir = dir.clone();
    }
    if let Some(folder) = &cli.folder {
        config.output.folder = Some(folder.clone());
    }

    validate(&config).context("Invalid configuration")?;
    Ok(config)
}

/// Reads a URL list: one URL per line, blank lines ignored
fn read_url_list(path: &Path) -> anyhow::Result<Vec<String>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read URL list {}", path.display()))?;
    let urls: Vec<String> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect();

    if urls.is_empty() {
        bail!("URL list {} contains no URLs", path.display());
    }
    tracing::info!("Loaded {} URLs from {}", urls.len(), path.display());
    Ok(urls)
}

/// Handles the --dry-run mode: shows the configuration and discovery plan
fn handle_dry_run(config: &Config) -> anyhow::Result<()> {
    println!("=== docs-crawler Dry Run ===\n");

    println!("Site:");
    println!("  Mode: {}", config.site.mode.as_str());
    if let Some(url) = &config.site.base_url {
        println!("  Base URL: {}", url);
    }
    println!("  Path filter: {}", config.site.path_filter);
    if !config.site.urls.is_empty() {
        println!("  Listed URLs: {}", config.site.urls.len());
    }

    println!("\nCrawler Configuration:");
    println!("  Concurrency: {}", config.crawler.concurrency);
    println!("  Max pages: {}", config.crawler.max_pages);
    match config.crawler.max_depth {
        Some(depth) => println!("  Max depth: {}", depth),
        None => println!("  Max depth: unlimited"),
    }
    println!("  Attempts per page: {}", config.crawler.max_retries);
    println!(
        "  Incremental: {}{}",
        config.crawler.incremental,
        if config.crawler.force { " (forced rewrite)" } else { "" }
    );
    if config.crawler.resume {
        println!("  Resume: from saved progress when present");
    }

    println!("\nRendering:");
    println!("  Navigation timeout: {}ms", config.render.navigation_timeout_ms);
    println!("  Content selector: {}", config.render.content_selector);
    println!("  User agent: {}", config.render.user_agent);

    println!("\nOutput:");
    println!("  Mirror directory: {}", mirror_dir(config)?.display());

    println!("\nDiscovery plan:");
    for (i, strategy) in plan(config).iter().enumerate() {
        println!("  {}. {}", i + 1, strategy);
    }

    println!("\n✓ Configuration is valid");
    Ok(())
}

/// Handles the --cache-stats mode
fn handle_cache_stats(config: &Config) -> anyhow::Result<()> {
    let dir = mirror_dir(config)?;
    let store = FingerprintStore::open(&dir);

    println!("Cache: {}", store.path().display());
    println!("  Entries: {}", store.len());
    if let Some(latest) = store.entries().map(|(_, e)| e.last_crawled_at).max() {
        println!("  Last crawled: {}", latest.to_rfc3339());
    }
    if let Some(progress) = CrawlProgress::load(&dir) {
        println!(
            "Interrupted crawl saved {}: {} pending, {} completed, {} failed (continue with --resume)",
            progress.saved_at.to_rfc3339(),
            progress.pending.len(),
            progress.completed.len(),
            progress.failed.len()
        );
    }
    Ok(())
}

/// Handles the --clear-cache mode
fn handle_clear_cache(config: &Config) -> anyhow::Result<()> {
    let dir = mirror_dir(config)?;
    let mut store = FingerprintStore::open(&dir);
    let entries = store.len();
    store.clear().context("Failed to clear fingerprint cache")?;

    println!("✓ Cleared {} cache entries from {}", entries, store.path().display());
    if CrawlProgress::clear(&dir).context("Failed to remove crawl progress")? {
        println!("✓ Removed saved progress of an interrupted crawl");
    }
    Ok(())
}

/// Handles the --export-merged mode
fn handle_export_merged(config: &Config, output: Option<&Path>) -> anyhow::Result<()> {
    let dir = mirror_dir(config)?;
    let path = export_merged(&dir, output)
        .with_context(|| format!("Failed to export {}", dir.display()))?;

    println!("✓ Merged Markdown exported to: {}", path.display());
    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config) -> anyhow::Result<ExitCode> {
    let shutdown = Shutdown::new();
    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Interrupt received, finishing in-flight pages");
                shutdown.cancel();
            }
        });
    }

    let coordinator = Coordinator::from_config(config, shutdown)?;
    let report = coordinator.run().await?;

    println!();
    print_summary(&report.summary);
    println!("\nMirror: {}", report.mirror_dir.display());

    let code = report.summary.exit_code();
    Ok(ExitCode::from(code as u8))
}
