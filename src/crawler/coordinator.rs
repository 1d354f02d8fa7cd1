//! Crawler coordinator - main crawl orchestration logic
//!
//! This module contains the main crawl loop that coordinates all aspects of
//! the crawling process, including:
//! - Resolving the mirror directory and loading the fingerprint cache
//! - Running discovery with strategy fallback
//! - Dispatching fetches through the worker pool with retries
//! - Skipping unchanged pages and writing changed ones
//! - Feeding discovered links back into the frontier
//! - Writing the index, failure report and final summary
//! - Saving the queue of an interrupted run and resuming from it

use crate::config::Config;
use crate::crawler::fetcher::{FetchError, FetchErrorKind, FetchResult, PageContent, PageFetcher};
use crate::crawler::renderer::{build_http_client, HttpRenderer, Readiness, Renderer};
use crate::crawler::retry::RetryPolicy;
use crate::crawler::scheduler::{Completion, WorkerPool};
use crate::crawler::shutdown::Shutdown;
use crate::discovery::{self, DiscoveryResolver, Frontier, UrlTask};
use crate::output::{
    disambiguated_slug, slug_for, write_failure_report, write_index, CrawlSummary, FailureRecord,
    MirrorWriter, MirroredPage,
};
use crate::state::TaskState;
use crate::storage::{CrawlProgress, FingerprintStore};
use crate::url::{normalize_url, site_label};
use crate::CrawlerError;
use reqwest::Client;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use url::Url;

/// Completions between progress log lines
const PROGRESS_INTERVAL: usize = 10;

/// Everything a finished run produced
#[derive(Debug, Clone)]
pub struct CrawlReport {
    pub summary: CrawlSummary,
    /// Pages present in the mirror (written or skipped), in enqueue order
    pub pages: Vec<MirroredPage>,
    pub mirror_dir: PathBuf,
}

/// The URL that identifies the site: base URL, else start URL, else
/// sitemap URL, else the first listed URL
pub fn site_url(config: &Config) -> Option<Url> {
    let site = &config.site;
    [
        site.base_url.as_deref(),
        site.start_url.as_deref(),
        site.sitemap_url.as_deref(),
        site.urls.first().map(String::as_str),
    ]
    .into_iter()
    .flatten()
    .find_map(|candidate| normalize_url(candidate).ok())
}

/// `<output.dir>/<folder>`, where the folder defaults to the site's label
pub fn mirror_dir(config: &Config) -> crate::Result<PathBuf> {
    let folder = match &config.output.folder {
        Some(folder) => folder.clone(),
        None => {
            let url = site_url(config).ok_or_else(|| {
                CrawlerError::NoSource("no site URL to derive the mirror folder from".to_string())
            })?;
            site_label(&url)
        }
    };
    Ok(Path::new(&config.output.dir).join(folder))
}

/// Main crawler coordinator structure
pub struct Coordinator<R> {
    config: Arc<Config>,
    renderer: Arc<R>,
    client: Client,
    shutdown: Shutdown,
}

impl Coordinator<HttpRenderer> {
    /// Creates a coordinator that renders pages over HTTP
    pub fn from_config(config: Config, shutdown: Shutdown) -> crate::Result<Self> {
        let client = build_http_client(&config.render)?;
        let renderer = Arc::new(HttpRenderer::new(client.clone()));
        Ok(Self::with_renderer(config, renderer, client, shutdown))
    }
}

impl<R: Renderer> Coordinator<R> {
    /// Creates a coordinator with a custom renderer
    ///
    /// `client` is used for sitemap fetches.
    pub fn with_renderer(config: Config, renderer: Arc<R>, client: Client, shutdown: Shutdown) -> Self {
        Self {
            config: Arc::new(config),
            renderer,
            client,
            shutdown,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Runs one crawl to completion or cancellation
    ///
    /// Fatal problems (no usable URL source, unwritable output) are returned
    /// before any page is fetched. Per-page failures are reported inside the
    /// summary instead.
    pub async fn run(&self) -> crate::Result<CrawlReport> {
        let mirror_dir = mirror_dir(&self.config)?;
        let writer = MirrorWriter::new(&mirror_dir);
        writer
            .ensure_writable()
            .map_err(|source| CrawlerError::OutputNotWritable {
                path: mirror_dir.display().to_string(),
                source,
            })?;
        info!(dir = %mirror_dir.display(), "Mirroring into");

        let timer = self.config.crawler.run_timeout_secs.map(|secs| {
            let shutdown = self.shutdown.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_secs(secs)).await;
                warn!(secs, "Run timeout reached, stopping dispatch");
                shutdown.cancel();
            })
        });

        let result = self.crawl(writer).await;

        if let Some(timer) = timer {
            timer.abort();
        }
        result
    }

    async fn crawl(&self, writer: MirrorWriter) -> crate::Result<CrawlReport> {
        let resolver = DiscoveryResolver::new(self.client.clone(), &self.config);
        let mut frontier = match self.resumed_frontier(&resolver, writer.dir()) {
            Some(frontier) => frontier,
            None => resolver.resolve(&discovery::plan(&self.config)).await?,
        };

        let store = FingerprintStore::open(writer.dir());
        info!(entries = store.len(), "Fingerprint cache loaded");

        let fetcher = Arc::new(PageFetcher::new(
            self.renderer.clone(),
            Readiness::from_config(&self.config.render),
            frontier.follows_links(),
        ));
        let retry = RetryPolicy::from_config(&self.config.crawler);
        let shutdown = self.shutdown.clone();

        let work = move |task: UrlTask| {
            let fetcher = fetcher.clone();
            let shutdown = shutdown.clone();
            async move {
                let url = task.url.clone();
                retry.run(&url, &shutdown, || fetcher.fetch(&task)).await
            }
        };

        let mut run = RunState::new(&self.config, writer, store);
        let pool = WorkerPool::new(self.config.crawler.concurrency);
        info!(
            concurrency = pool.limit(),
            queued = frontier.pending(),
            "Starting crawl"
        );

        let stats = pool
            .run_all(&mut frontier, &self.shutdown, work, |frontier, completion| {
                run.handle(frontier, completion)
            })
            .await;

        if stats.stopped_early {
            warn!(
                pending = frontier.pending(),
                "Crawl cancelled, pending pages were not dispatched"
            );
        }

        run.finish(&frontier, self.shutdown.is_cancelled())
    }

    /// Frontier rebuilt from the saved progress, when resuming is enabled
    fn resumed_frontier(&self, resolver: &DiscoveryResolver, dir: &Path) -> Option<Frontier> {
        if !self.config.crawler.resume {
            let path = CrawlProgress::path(dir);
            if path.exists() {
                info!(
                    path = %path.display(),
                    "Found progress of an interrupted crawl; starting over (use --resume to continue it)"
                );
            }
            return None;
        }

        let progress = CrawlProgress::load(dir).filter(|p| !p.is_complete());
        match progress.and_then(|p| resolver.resume(&p)) {
            Some(frontier) => Some(frontier),
            None => {
                info!("Nothing to resume, running discovery");
                None
            }
        }
    }
}

/// Mutable per-run state, owned by the coordinator loop
struct RunState {
    writer: MirrorWriter,
    store: FingerprintStore,
    incremental: bool,
    force: bool,
    checkpoint_every: usize,
    summary: CrawlSummary,
    pages: Vec<(u64, MirroredPage)>,
    /// Page file name -> URL that owns it
    claimed: HashMap<String, String>,
    completed: usize,
    started: Instant,
}

impl RunState {
    fn new(config: &Config, writer: MirrorWriter, store: FingerprintStore) -> Self {
        let mut claimed = HashMap::new();
        for (url, entry) in store.entries() {
            claimed
                .entry(entry.output_path.clone())
                .or_insert_with(|| url.to_string());
        }

        Self {
            writer,
            store,
            incremental: config.crawler.incremental,
            force: config.crawler.force,
            checkpoint_every: config.crawler.checkpoint_every,
            summary: CrawlSummary::default(),
            pages: Vec::new(),
            claimed,
            completed: 0,
            started: Instant::now(),
        }
    }

    fn handle(&mut self, frontier: &mut Frontier, completion: Completion<UrlTask, FetchResult>) {
        let task = completion.task;
        let result = completion.output.unwrap_or_else(|message| {
            FetchResult::failure(
                task.url.clone(),
                FetchError::new(FetchErrorKind::RenderError, message),
            )
        });

        let outcome = match (&result.content, &result.fingerprint) {
            (Some(content), Some(fingerprint)) if result.is_success() => {
                let outcome = self.record_success(&task, content, fingerprint, &result);
                frontier.extend_from(&task, &result.outbound_links);
                outcome
            }
            _ => {
                let error = result.error.clone().unwrap_or_else(|| {
                    FetchError::new(FetchErrorKind::RenderError, "fetch returned no content")
                });
                self.record_failure(&task, error, result.attempts)
            }
        };

        if let Err(e) = frontier.complete(&task, outcome) {
            error!(url = %task.url, error = %e, "Task state violation");
        }

        self.completed += 1;
        if self.completed % PROGRESS_INTERVAL == 0 {
            let rate = self.completed as f64 / self.started.elapsed().as_secs_f64().max(0.001);
            info!(
                completed = self.completed,
                pending = frontier.pending(),
                "Progress: {:.2} pages/sec",
                rate
            );
        }
        if self.checkpoint_every > 0
            && self.completed % self.checkpoint_every == 0
            && self.store.is_dirty()
        {
            if let Err(e) = self.store.save() {
                warn!(error = %e, "Failed to checkpoint fingerprint cache");
            }
        }
    }

    fn record_success(
        &mut self,
        task: &UrlTask,
        content: &PageContent,
        fingerprint: &str,
        result: &FetchResult,
    ) -> TaskState {
        let key = task.url.as_str();

        if self.incremental && !self.force && self.store.is_unchanged(key, fingerprint) {
            let existing = self
                .store
                .get(key)
                .map(|entry| entry.output_path.clone())
                .filter(|path| self.owns(path, key) && self.writer.exists(path));

            if let Some(path) = existing {
                self.store.touch(key, &content.title);
                self.summary.skipped_unchanged += 1;
                self.push_page(task, &content.title, path);
                debug!(url = %task.url, "Unchanged, skipped");
                return TaskState::Skipped;
            }
        }

        let file_name = self.file_name_for(&task.url);
        match self.writer.write_page(&task.url, &file_name, &content.markdown) {
            Ok(()) => {
                self.store.update(key, fingerprint, &file_name, &content.title);
                self.summary.succeeded += 1;
                self.push_page(task, &content.title, file_name);
                TaskState::Succeeded
            }
            Err(e) => {
                error!(url = %task.url, error = %e, "Failed to write page");
                self.record_failure(
                    task,
                    FetchError::new(FetchErrorKind::WriteError, e.to_string()),
                    result.attempts,
                )
            }
        }
    }

    fn owns(&self, file_name: &str, url: &str) -> bool {
        self.claimed.get(file_name).is_some_and(|owner| owner == url)
    }

    /// File name for a page, stable across runs and unique per URL
    ///
    /// A URL keeps the file it was written to before. Otherwise it gets its
    /// slug, or the hash-suffixed slug when another URL already owns that
    /// name.
    fn file_name_for(&mut self, url: &Url) -> String {
        let key = url.as_str();
        if let Some(entry) = self.store.get(key) {
            if self.owns(&entry.output_path, key) {
                return entry.output_path.clone();
            }
        }

        let slug = slug_for(url);
        let file_name = match self.claimed.get(&slug) {
            Some(owner) if owner != key => {
                let file_name = disambiguated_slug(url);
                debug!(url = %url, taken_by = %owner, file = %file_name, "File name collision");
                file_name
            }
            _ => slug,
        };
        self.claimed.insert(file_name.clone(), key.to_string());
        file_name
    }

    fn record_failure(&mut self, task: &UrlTask, error: FetchError, attempts: u32) -> TaskState {
        warn!(
            url = %task.url,
            kind = %error.kind,
            attempts,
            "Page failed: {}",
            error.message
        );
        self.summary.failed += 1;
        self.summary.failures.push(FailureRecord {
            url: task.url.to_string(),
            kind: error.kind.as_str().to_string(),
            error: error.message,
            attempts,
            seq: task.seq,
        });
        TaskState::Failed
    }

    fn push_page(&mut self, task: &UrlTask, title: &str, path: String) {
        self.pages.push((
            task.seq,
            MirroredPage {
                url: task.url.to_string(),
                title: title.to_string(),
                path,
            },
        ));
    }

    fn finish(mut self, frontier: &Frontier, cancelled: bool) -> crate::Result<CrawlReport> {
        if let Err(e) = self.store.save() {
            error!(path = %self.store.path().display(), error = %e, "Failed to save fingerprint cache");
        }

        let dir = self.writer.dir().to_path_buf();

        self.pages.sort_by_key(|(seq, _)| *seq);
        let pages: Vec<MirroredPage> = self.pages.drain(..).map(|(_, page)| page).collect();
        write_index(&dir, &self.index_pages(&pages))?;
        self.save_progress(frontier, &dir);

        let mut summary = self.summary;
        summary.failures.sort_by_key(|f| f.seq);
        summary.total = summary.succeeded + summary.skipped_unchanged + summary.failed;
        summary.pending = frontier.pending();
        summary.cancelled = cancelled;
        write_failure_report(&dir, &summary.failures)?;

        info!(
            total = summary.total,
            written = summary.succeeded,
            skipped = summary.skipped_unchanged,
            failed = summary.failed,
            pending = summary.pending,
            elapsed_secs = self.started.elapsed().as_secs(),
            "Crawl finished"
        );

        Ok(CrawlReport {
            summary,
            pages,
            mirror_dir: dir,
        })
    }

    /// This run's pages followed by cached pages it did not reach
    ///
    /// A cached page is kept while its file is still in the mirror, so a
    /// cancelled or capped run, or a transient failure, does not drop rows
    /// from the index.
    fn index_pages(&self, pages: &[MirroredPage]) -> Vec<MirroredPage> {
        let seen: HashSet<&str> = pages.iter().map(|page| page.url.as_str()).collect();
        let mut index = pages.to_vec();

        for (url, entry) in self.store.entries() {
            if seen.contains(url)
                || !self.owns(&entry.output_path, url)
                || !self.writer.exists(&entry.output_path)
            {
                continue;
            }
            let title = if entry.title.is_empty() { url } else { entry.title.as_str() };
            index.push(MirroredPage {
                url: url.to_string(),
                title: title.to_string(),
                path: entry.output_path.clone(),
            });
        }

        if index.len() > pages.len() {
            debug!(carried = index.len() - pages.len(), "Index keeps pages from earlier runs");
        }
        index
    }

    /// Saves the undispatched queue, or removes stale progress once drained
    fn save_progress(&self, frontier: &Frontier, dir: &Path) {
        let pending = frontier.pending();
        if pending == 0 {
            if let Err(e) = CrawlProgress::clear(dir) {
                warn!(error = %e, "Failed to remove crawl progress file");
            }
            return;
        }

        let ledger = frontier.ledger();
        let mut completed = ledger.urls_in(TaskState::Succeeded);
        completed.extend(ledger.urls_in(TaskState::Skipped));
        let progress = CrawlProgress::new(
            frontier.follows_links(),
            frontier.queued_urls(),
            completed,
            ledger.urls_in(TaskState::Failed),
        );
        match progress.save(dir) {
            Ok(path) => info!(path = %path.display(), pending, "Saved crawl progress, continue with --resume"),
            Err(e) => error!(error = %e, "Failed to save crawl progress"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DiscoveryMode;
    use crate::crawler::renderer::{RenderError, RenderedPage};
    use crate::output::{read_index_order, FAILURE_REPORT_FILENAME};
    use crate::storage::PROGRESS_FILENAME;
    use std::collections::HashMap;
    use std::fs;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tempfile::TempDir;

    const SITE: &str = "https://example.com";

    #[derive(Clone)]
    enum Script {
        Html(String),
        Status(u16),
        Timeout,
        Panic,
    }

    /// In-memory site: URL -> scripted response, with call and concurrency tracking
    struct ScriptedRenderer {
        pages: HashMap<String, Script>,
        calls: Mutex<HashMap<String, usize>>,
        current: AtomicUsize,
        peak: AtomicUsize,
        delay: Duration,
        /// Cancels the run while this URL is being rendered
        cancel_on: Option<(String, Shutdown)>,
    }

    impl ScriptedRenderer {
        fn new(pages: Vec<(&str, Script)>) -> Self {
            Self {
                pages: pages
                    .into_iter()
                    .map(|(path, script)| (format!("{}{}", SITE, path), script))
                    .collect(),
                calls: Mutex::new(HashMap::new()),
                current: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
                delay: Duration::from_millis(2),
                cancel_on: None,
            }
        }

        fn cancelling_on(mut self, path: &str, shutdown: Shutdown) -> Self {
            self.cancel_on = Some((format!("{}{}", SITE, path), shutdown));
            self
        }

        fn calls(&self, path: &str) -> usize {
            let calls = self.calls.lock().unwrap();
            calls.get(&format!("{}{}", SITE, path)).copied().unwrap_or(0)
        }

        fn total_calls(&self) -> usize {
            self.calls.lock().unwrap().values().sum()
        }
    }

    impl Renderer for ScriptedRenderer {
        async fn render(&self, url: &Url, _: &Readiness) -> Result<RenderedPage, RenderError> {
            {
                let mut calls = self.calls.lock().unwrap();
                *calls.entry(url.to_string()).or_default() += 1;
            }
            if let Some((target, shutdown)) = &self.cancel_on {
                if target == url.as_str() {
                    shutdown.cancel();
                }
            }
            let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.current.fetch_sub(1, Ordering::SeqCst);

            match self.pages.get(url.as_str()).cloned() {
                Some(Script::Html(html)) => Ok(RenderedPage {
                    final_url: url.clone(),
                    html,
                }),
                Some(Script::Status(status)) => Err(RenderError::Http(status)),
                Some(Script::Timeout) => Err(RenderError::Timeout("navigation".to_string())),
                Some(Script::Panic) => panic!("renderer crashed on {}", url),
                None => Err(RenderError::Http(404)),
            }
        }
    }

    fn html(title: &str, links: &[&str]) -> Script {
        let anchors: String = links
            .iter()
            .map(|l| format!(r#"<a href="{}">{}</a> "#, l, l))
            .collect();
        Script::Html(format!(
            "<html><head><title>{}</title></head><body><main><h1>{}</h1><p>Body of {}</p>{}</main></body></html>",
            title, title, title, anchors
        ))
    }

    fn config(temp: &TempDir) -> Config {
        let mut config = Config::default();
        config.site.base_url = Some(SITE.to_string());
        config.site.mode = DiscoveryMode::Crawl;
        config.crawler.retry_delay_ms = 1;
        config.crawler.max_retry_delay_ms = 2;
        config.output.dir = temp.path().display().to_string();
        config.output.folder = Some("site".to_string());
        config
    }

    async fn run(config: Config, renderer: Arc<ScriptedRenderer>) -> crate::Result<CrawlReport> {
        Coordinator::with_renderer(config, renderer, Client::new(), Shutdown::new())
            .run()
            .await
    }

    fn small_site() -> Vec<(&'static str, Script)> {
        vec![
            ("/docs/", html("Home", &["/docs/a", "/docs/b", "/blog/"])),
            ("/docs/a", html("Alpha", &["/docs/b", "/docs/", "/docs/c#top"])),
            ("/docs/b", html("Beta", &["/docs/a", "/docs/c"])),
            ("/docs/c", html("Gamma", &["/docs/a"])),
        ]
    }

    #[test]
    fn test_mirror_dir_defaults_to_site_label() {
        let mut config = Config::default();
        config.site.base_url = Some("https://code.claude.com".to_string());
        config.output.dir = "out".to_string();
        assert_eq!(mirror_dir(&config).unwrap(), Path::new("out").join("claude"));

        config.output.folder = Some("custom".to_string());
        assert_eq!(mirror_dir(&config).unwrap(), Path::new("out").join("custom"));
    }

    #[tokio::test]
    async fn test_recursive_crawl_visits_each_url_once() {
        let temp = TempDir::new().unwrap();
        let renderer = Arc::new(ScriptedRenderer::new(small_site()));

        let report = run(config(&temp), renderer.clone()).await.unwrap();

        assert_eq!(report.summary.total, 4);
        assert_eq!(report.summary.succeeded, 4);
        for path in ["/docs/", "/docs/a", "/docs/b", "/docs/c"] {
            assert_eq!(renderer.calls(path), 1, "{} rendered more than once", path);
        }
        assert_eq!(renderer.calls("/blog/"), 0);

        let dir = temp.path().join("site");
        assert!(dir.join("docs.md").exists());
        assert!(dir.join("docs_a.md").exists());
        assert!(dir.join("index.md").exists());
        assert!(dir.join(".docs-crawler-cache.json").exists());
        assert!(!dir.join(FAILURE_REPORT_FILENAME).exists());
    }

    #[tokio::test]
    async fn test_concurrency_limit_respected() {
        let temp = TempDir::new().unwrap();
        let links: Vec<String> = (0..20).map(|i| format!("/docs/p{}", i)).collect();
        let link_refs: Vec<&str> = links.iter().map(String::as_str).collect();
        let mut pages = vec![("/docs/", html("Home", &link_refs))];
        for link in &link_refs {
            pages.push((*link, html(link, &[])));
        }
        let renderer = Arc::new(ScriptedRenderer::new(pages));

        let mut config = config(&temp);
        config.crawler.concurrency = 3;
        let report = run(config, renderer.clone()).await.unwrap();

        assert_eq!(report.summary.total, 21);
        assert!(renderer.peak.load(Ordering::SeqCst) <= 3);
    }

    #[tokio::test]
    async fn test_second_incremental_run_skips_everything() {
        let temp = TempDir::new().unwrap();
        let first = run(config(&temp), Arc::new(ScriptedRenderer::new(small_site())))
            .await
            .unwrap();
        assert_eq!(first.summary.succeeded, 4);

        // A write on the second run would clobber this marker
        let page = temp.path().join("site").join("docs_a.md");
        fs::write(&page, "LOCAL").unwrap();

        let second = run(config(&temp), Arc::new(ScriptedRenderer::new(small_site())))
            .await
            .unwrap();
        assert_eq!(second.summary.skipped_unchanged, second.summary.total);
        assert_eq!(second.summary.succeeded, 0);
        assert_eq!(fs::read_to_string(&page).unwrap(), "LOCAL");
        assert_eq!(second.pages.len(), 4);
    }

    #[tokio::test]
    async fn test_force_rewrites_every_page() {
        let temp = TempDir::new().unwrap();
        run(config(&temp), Arc::new(ScriptedRenderer::new(small_site())))
            .await
            .unwrap();
        let page = temp.path().join("site").join("docs_a.md");
        fs::write(&page, "LOCAL").unwrap();

        let mut forced = config(&temp);
        forced.crawler.force = true;
        let report = run(forced, Arc::new(ScriptedRenderer::new(small_site())))
            .await
            .unwrap();

        assert_eq!(report.summary.succeeded, report.summary.total);
        assert_ne!(fs::read_to_string(&page).unwrap(), "LOCAL");
    }

    #[tokio::test]
    async fn test_deleted_output_rewritten_even_if_unchanged() {
        let temp = TempDir::new().unwrap();
        run(config(&temp), Arc::new(ScriptedRenderer::new(small_site())))
            .await
            .unwrap();
        let page = temp.path().join("site").join("docs_b.md");
        fs::remove_file(&page).unwrap();

        let report = run(config(&temp), Arc::new(ScriptedRenderer::new(small_site())))
            .await
            .unwrap();
        assert_eq!(report.summary.succeeded, 1);
        assert_eq!(report.summary.skipped_unchanged, 3);
        assert!(page.exists());
    }

    #[tokio::test]
    async fn test_failures_reported_with_attempts() {
        let temp = TempDir::new().unwrap();
        let renderer = Arc::new(ScriptedRenderer::new(vec![
            ("/docs/", html("Home", &["/docs/slow", "/docs/gone", "/docs/ok"])),
            ("/docs/slow", Script::Timeout),
            ("/docs/gone", Script::Status(404)),
            ("/docs/ok", html("Ok", &[])),
        ]));

        let report = run(config(&temp), renderer.clone()).await.unwrap();
        let summary = &report.summary;

        assert_eq!(summary.total, 4);
        assert_eq!(summary.failed, 2);
        assert_eq!(summary.exit_code(), 0);

        let slow = &summary.failures[0];
        assert!(slow.url.ends_with("/docs/slow"));
        assert_eq!(slow.kind, "timeout");
        assert_eq!(slow.attempts, 3);
        assert_eq!(renderer.calls("/docs/slow"), 3);

        let gone = &summary.failures[1];
        assert_eq!(gone.kind, "http-error");
        assert_eq!(gone.attempts, 1);
        assert_eq!(renderer.calls("/docs/gone"), 1);

        assert!(temp.path().join("site").join(FAILURE_REPORT_FILENAME).exists());
    }

    #[tokio::test]
    async fn test_all_failed_exit_code() {
        let temp = TempDir::new().unwrap();
        let renderer = Arc::new(ScriptedRenderer::new(vec![("/docs/", Script::Status(500))]));
        let report = run(config(&temp), renderer).await.unwrap();
        assert_eq!(report.summary.total, 1);
        assert_eq!(report.summary.exit_code(), 2);
    }

    #[tokio::test]
    async fn test_max_pages_caps_discovery() {
        let temp = TempDir::new().unwrap();
        let mut pages = Vec::new();
        let paths: Vec<String> = (0..40).map(|i| format!("/docs/n{}", i)).collect();
        // Every page links five pages nobody has seen yet
        pages.push(("/docs/".to_string(), (0..5).map(|i| paths[i].clone()).collect::<Vec<_>>()));
        for (i, path) in paths.iter().enumerate() {
            let next: Vec<String> = (0..5)
                .filter_map(|k| paths.get(5 + i * 5 + k).cloned())
                .collect();
            pages.push((path.clone(), next));
        }
        let scripts: Vec<(String, Script)> = pages
            .iter()
            .map(|(path, links)| {
                let refs: Vec<&str> = links.iter().map(String::as_str).collect();
                (path.clone(), html(path, &refs))
            })
            .collect();
        let renderer = Arc::new(ScriptedRenderer::new(
            scripts.iter().map(|(p, s)| (p.as_str(), s.clone())).collect(),
        ));

        let mut config = config(&temp);
        config.crawler.max_pages = 3;
        let report = run(config, renderer.clone()).await.unwrap();

        assert_eq!(report.summary.total, 3);
        assert_eq!(renderer.total_calls(), 3);
    }

    #[tokio::test]
    async fn test_panicking_render_becomes_failure() {
        let temp = TempDir::new().unwrap();
        let renderer = Arc::new(ScriptedRenderer::new(vec![
            ("/docs/", html("Home", &["/docs/crash"])),
            ("/docs/crash", Script::Panic),
        ]));

        let report = run(config(&temp), renderer).await.unwrap();
        assert_eq!(report.summary.succeeded, 1);
        assert_eq!(report.summary.failed, 1);
        assert!(report.summary.failures[0].error.contains("panicked"));
    }

    #[tokio::test]
    async fn test_cancelled_before_start_reports_pending() {
        let temp = TempDir::new().unwrap();
        let shutdown = Shutdown::new();
        shutdown.cancel();

        let renderer = Arc::new(ScriptedRenderer::new(small_site()));
        let report = Coordinator::with_renderer(config(&temp), renderer.clone(), Client::new(), shutdown)
            .run()
            .await
            .unwrap();

        assert!(report.summary.cancelled);
        assert_eq!(report.summary.total, 0);
        assert_eq!(report.summary.pending, 1);
        assert_eq!(renderer.total_calls(), 0);
        assert!(temp.path().join("site").join("index.md").exists());
    }

    #[tokio::test]
    async fn test_cancelled_run_keeps_index_rows() {
        let temp = TempDir::new().unwrap();
        run(config(&temp), Arc::new(ScriptedRenderer::new(small_site())))
            .await
            .unwrap();
        let dir = temp.path().join("site");
        assert_eq!(read_index_order(&dir).unwrap().len(), 4);

        let shutdown = Shutdown::new();
        shutdown.cancel();
        let report = Coordinator::with_renderer(
            config(&temp),
            Arc::new(ScriptedRenderer::new(small_site())),
            Client::new(),
            shutdown,
        )
        .run()
        .await
        .unwrap();
        assert!(report.pages.is_empty());

        let files = read_index_order(&dir).unwrap();
        assert_eq!(files.len(), 4);
        assert!(files.contains(&"docs_c.md".to_string()));
        let index = fs::read_to_string(dir.join("index.md")).unwrap();
        assert!(index.contains("Gamma"));
    }

    #[tokio::test]
    async fn test_transient_failure_keeps_previous_copy_listed() {
        let temp = TempDir::new().unwrap();
        run(config(&temp), Arc::new(ScriptedRenderer::new(small_site())))
            .await
            .unwrap();

        let mut flaky = small_site();
        flaky[3] = ("/docs/c", Script::Status(503));
        let report = run(config(&temp), Arc::new(ScriptedRenderer::new(flaky)))
            .await
            .unwrap();
        assert_eq!(report.summary.failed, 1);

        let files = read_index_order(&temp.path().join("site")).unwrap();
        assert!(files.contains(&"docs_c.md".to_string()));
    }

    #[tokio::test]
    async fn test_colliding_slugs_get_distinct_files() {
        let temp = TempDir::new().unwrap();
        let site = || {
            vec![
                ("/docs/", html("Home", &["/docs/a", "/docs/a/"])),
                ("/docs/a", html("Plain", &[])),
                ("/docs/a/", html("Slashed", &[])),
            ]
        };
        let mut config = config(&temp);
        config.crawler.concurrency = 1;

        let first = run(config.clone(), Arc::new(ScriptedRenderer::new(site())))
            .await
            .unwrap();
        assert_eq!(first.summary.succeeded, 3);

        let plain = first.pages.iter().find(|p| p.url.ends_with("/docs/a")).unwrap();
        let slashed = first.pages.iter().find(|p| p.url.ends_with("/docs/a/")).unwrap();
        assert_eq!(plain.path, "docs_a.md");
        assert_ne!(plain.path, slashed.path);

        let dir = temp.path().join("site");
        assert!(fs::read_to_string(dir.join(&plain.path)).unwrap().contains("Plain"));
        assert!(fs::read_to_string(dir.join(&slashed.path)).unwrap().contains("Slashed"));

        let second = run(config, Arc::new(ScriptedRenderer::new(site())))
            .await
            .unwrap();
        assert_eq!(second.summary.skipped_unchanged, 3);
        assert!(fs::read_to_string(dir.join(&plain.path)).unwrap().contains("Plain"));
        assert!(fs::read_to_string(dir.join(&slashed.path)).unwrap().contains("Slashed"));
    }

    #[tokio::test]
    async fn test_resume_continues_interrupted_crawl() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("site");
        let mut config = config(&temp);
        config.crawler.concurrency = 1;

        let shutdown = Shutdown::new();
        let renderer =
            Arc::new(ScriptedRenderer::new(small_site()).cancelling_on("/docs/a", shutdown.clone()));
        let interrupted =
            Coordinator::with_renderer(config.clone(), renderer, Client::new(), shutdown)
                .run()
                .await
                .unwrap();
        assert!(interrupted.summary.cancelled);
        assert_eq!(interrupted.summary.succeeded, 2);
        assert_eq!(interrupted.summary.pending, 2);

        let progress = CrawlProgress::load(&dir).unwrap();
        assert_eq!(
            progress.pending,
            vec![format!("{}/docs/b", SITE), format!("{}/docs/c", SITE)]
        );

        config.crawler.resume = true;
        let renderer = Arc::new(ScriptedRenderer::new(small_site()));
        let resumed = run(config, renderer.clone()).await.unwrap();

        assert_eq!(resumed.summary.succeeded, 2);
        assert_eq!(resumed.summary.pending, 0);
        assert_eq!(renderer.calls("/docs/"), 0);
        assert_eq!(renderer.calls("/docs/a"), 0);
        assert_eq!(renderer.calls("/docs/b"), 1);
        assert_eq!(renderer.calls("/docs/c"), 1);
        assert!(!dir.join(PROGRESS_FILENAME).exists());
        assert_eq!(read_index_order(&dir).unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_unwritable_output_is_fatal() {
        let temp = TempDir::new().unwrap();
        let blocker = temp.path().join("not-a-dir");
        fs::write(&blocker, "file").unwrap();

        let mut config = config(&temp);
        config.output.dir = blocker.display().to_string();
        let err = run(config, Arc::new(ScriptedRenderer::new(small_site())))
            .await
            .unwrap_err();
        assert!(matches!(err, CrawlerError::OutputNotWritable { .. }));
    }
}
