//! Integration tests for the crawler
//!
//! These tests use wiremock to serve a small documentation site and run the
//! full discover, fetch, convert and write cycle end-to-end.

use docs_crawler::config::{Config, DiscoveryMode};
use docs_crawler::crawler::{CrawlReport, Shutdown};
use docs_crawler::Coordinator;
use std::collections::BTreeSet;
use std::fs;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// A documentation page whose `<main>` links to `links`
fn page(title: &str, links: &[&str]) -> String {
    let anchors: String = links
        .iter()
        .map(|l| format!(r#"<li><a href="{}">{}</a></li>"#, l, l))
        .collect();
    format!(
        r#"<html><head><title>{title}</title></head><body>
        <nav><a href="/docs/">Docs home</a></nav>
        <main><h1>{title}</h1><p>This page documents {title} in detail.</p><ul>{anchors}</ul></main>
        <footer>Footer text</footer>
        </body></html>"#
    )
}

async fn mount_page(server: &MockServer, route: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(body)
                .insert_header("content-type", "text/html"),
        )
        .mount(server)
        .await;
}

/// Mounts a four-page site whose link graph reaches every page from `/docs/`
async fn mount_site(server: &MockServer) {
    mount_page(server, "/docs/", page("Overview", &["/docs/install", "/blog/"])).await;
    mount_page(
        server,
        "/docs/install",
        page("Install", &["/docs/configure", "/docs/#top"]),
    )
    .await;
    mount_page(
        server,
        "/docs/configure",
        page("Configure", &["/docs/reference", "mailto:docs@example.com"]),
    )
    .await;
    mount_page(server, "/docs/reference", page("Reference", &["/docs/install"])).await;
    mount_page(server, "/blog/", page("Blog", &[])).await;
}

async fn mount_sitemap(server: &MockServer) {
    let base = server.uri();
    let body = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
  <url><loc>{base}/docs/</loc></url>
  <url><loc>{base}/docs/install</loc></url>
  <url><loc>{base}/docs/configure</loc></url>
  <url><loc>{base}/docs/reference</loc></url>
  <url><loc>{base}/blog/</loc></url>
</urlset>"#
    );
    Mock::given(method("GET"))
        .and(path("/sitemap.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

/// Creates a test configuration pointing at the mock server
fn create_test_config(server: &MockServer, output: &TempDir, mode: DiscoveryMode) -> Config {
    let mut config = Config::default();
    config.site.base_url = Some(server.uri());
    config.site.mode = mode;
    config.crawler.concurrency = 3;
    config.crawler.retry_delay_ms = 1;
    config.crawler.max_retry_delay_ms = 5;
    config.render.navigation_timeout_ms = 5_000;
    config.output.dir = output.path().display().to_string();
    config.output.folder = Some("mirror".to_string());
    config
}

async fn crawl(config: Config) -> CrawlReport {
    Coordinator::from_config(config, Shutdown::new())
        .expect("Failed to create coordinator")
        .run()
        .await
        .expect("Crawl failed")
}

fn urls(report: &CrawlReport) -> BTreeSet<String> {
    report.pages.iter().map(|p| p.url.clone()).collect()
}

#[tokio::test]
async fn test_sitemap_crawl_writes_mirror() {
    let server = MockServer::start().await;
    mount_site(&server).await;
    mount_sitemap(&server).await;
    let output = TempDir::new().unwrap();

    let report = crawl(create_test_config(&server, &output, DiscoveryMode::Sitemap)).await;

    assert_eq!(report.summary.total, 4);
    assert_eq!(report.summary.succeeded, 4);
    assert_eq!(report.summary.failed, 0);
    assert_eq!(report.summary.exit_code(), 0);

    let mirror = output.path().join("mirror");
    for file in ["docs.md", "docs_install.md", "docs_configure.md", "docs_reference.md"] {
        assert!(mirror.join(file).exists(), "missing {}", file);
    }
    assert!(!mirror.join("blog.md").exists());

    let install = fs::read_to_string(mirror.join("docs_install.md")).unwrap();
    assert!(install.contains("This page documents Install"));
    assert!(!install.contains("Footer text"));
    assert!(!install.contains("Docs home"));

    let index = fs::read_to_string(mirror.join("index.md")).unwrap();
    assert!(index.contains("| Title | Original URL | Local File |"));
    assert!(index.contains("docs_reference.md"));
    assert!(!mirror.join("failed.json").exists());
}

#[tokio::test]
async fn test_sitemap_and_recursive_agree() {
    let server = MockServer::start().await;
    mount_site(&server).await;
    mount_sitemap(&server).await;
    let output = TempDir::new().unwrap();

    let mut sitemap_config = create_test_config(&server, &output, DiscoveryMode::Sitemap);
    sitemap_config.output.folder = Some("from-sitemap".to_string());
    let mut crawl_config = create_test_config(&server, &output, DiscoveryMode::Crawl);
    crawl_config.output.folder = Some("from-links".to_string());

    let from_sitemap = crawl(sitemap_config).await;
    let from_links = crawl(crawl_config).await;

    assert_eq!(urls(&from_sitemap).len(), 4);
    assert_eq!(urls(&from_sitemap), urls(&from_links));
}

#[tokio::test]
async fn test_missing_sitemap_falls_back_to_links() {
    let server = MockServer::start().await;
    mount_site(&server).await;
    let output = TempDir::new().unwrap();

    let report = crawl(create_test_config(&server, &output, DiscoveryMode::Auto)).await;

    let expected: BTreeSet<String> = ["/docs/", "/docs/install", "/docs/configure", "/docs/reference"]
        .iter()
        .map(|p| format!("{}{}", server.uri(), p))
        .collect();
    assert_eq!(urls(&report), expected);
}

#[tokio::test]
async fn test_unchanged_site_skipped_on_second_run() {
    let server = MockServer::start().await;
    mount_site(&server).await;
    let output = TempDir::new().unwrap();

    let first = crawl(create_test_config(&server, &output, DiscoveryMode::Crawl)).await;
    assert_eq!(first.summary.succeeded, 4);

    // Any page write on the second run would replace this marker
    let marker = output.path().join("mirror").join("docs_configure.md");
    fs::write(&marker, "LOCAL COPY").unwrap();

    let second = crawl(create_test_config(&server, &output, DiscoveryMode::Crawl)).await;
    assert_eq!(second.summary.total, 4);
    assert_eq!(second.summary.skipped_unchanged, second.summary.total);
    assert_eq!(fs::read_to_string(&marker).unwrap(), "LOCAL COPY");

    let mut forced = create_test_config(&server, &output, DiscoveryMode::Crawl);
    forced.crawler.force = true;
    let third = crawl(forced).await;
    assert_eq!(third.summary.succeeded, 4);
    assert_ne!(fs::read_to_string(&marker).unwrap(), "LOCAL COPY");
}

#[tokio::test]
async fn test_not_found_attempted_once() {
    let server = MockServer::start().await;
    mount_page(&server, "/docs/", page("Overview", &["/docs/gone"])).await;
    Mock::given(method("GET"))
        .and(path("/docs/gone"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;
    let output = TempDir::new().unwrap();

    let report = crawl(create_test_config(&server, &output, DiscoveryMode::Crawl)).await;

    assert_eq!(report.summary.failed, 1);
    let failure = &report.summary.failures[0];
    assert_eq!(failure.kind, "http-error");
    assert_eq!(failure.attempts, 1);

    let raw = fs::read_to_string(output.path().join("mirror").join("failed.json")).unwrap();
    let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(json["count"], 1);
    assert_eq!(json["failures"][0]["url"], format!("{}/docs/gone", server.uri()));
}

#[tokio::test]
async fn test_server_errors_retried_until_exhausted() {
    let server = MockServer::start().await;
    mount_page(&server, "/docs/", page("Overview", &["/docs/flaky"])).await;
    Mock::given(method("GET"))
        .and(path("/docs/flaky"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;
    let output = TempDir::new().unwrap();

    let report = crawl(create_test_config(&server, &output, DiscoveryMode::Crawl)).await;

    assert_eq!(report.summary.succeeded, 1);
    assert_eq!(report.summary.failures.len(), 1);
    assert_eq!(report.summary.failures[0].attempts, 3);
}

#[tokio::test]
async fn test_listed_urls_not_followed() {
    let server = MockServer::start().await;
    mount_site(&server).await;
    let output = TempDir::new().unwrap();

    let mut config = create_test_config(&server, &output, DiscoveryMode::List);
    config.site.urls = vec![
        format!("{}/docs/install", server.uri()),
        format!("{}/blog/", server.uri()),
        format!("{}/docs/install#again", server.uri()),
    ];
    let report = crawl(config).await;

    assert_eq!(report.summary.total, 2);
    assert!(output.path().join("mirror").join("blog.md").exists());
    assert!(!output.path().join("mirror").join("docs_configure.md").exists());
}

#[tokio::test]
async fn test_max_pages_limits_crawl() {
    let server = MockServer::start().await;
    mount_site(&server).await;
    let output = TempDir::new().unwrap();

    let mut config = create_test_config(&server, &output, DiscoveryMode::Crawl);
    config.crawler.max_pages = 2;
    let report = crawl(config).await;

    assert_eq!(report.summary.total, 2);
    assert_eq!(report.summary.pending, 0);
}
