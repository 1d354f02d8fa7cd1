use crate::config::types::{Config, CrawlerConfig, DiscoveryMode, OutputConfig, RenderConfig, SiteConfig};
use crate::ConfigError;
use scraper::Selector;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_site_config(&config.site)?;
    validate_crawler_config(&config.crawler)?;
    validate_render_config(&config.render)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates the URL sources for the selected discovery mode
fn validate_site_config(config: &SiteConfig) -> Result<(), ConfigError> {
    if !config.path_filter.starts_with('/') {
        return Err(ConfigError::Validation(format!(
            "path-filter must start with '/', got '{}'",
            config.path_filter
        )));
    }

    for (name, value) in [
        ("base-url", &config.base_url),
        ("sitemap-url", &config.sitemap_url),
        ("start-url", &config.start_url),
    ] {
        if let Some(url) = value {
            validate_http_url(name, url)?;
        }
    }

    match config.mode {
        DiscoveryMode::Auto => {
            if config.effective_sitemap_url().is_none() && config.effective_start_url().is_none() {
                return Err(ConfigError::Validation(
                    "auto mode needs base-url, sitemap-url or start-url".to_string(),
                ));
            }
        }
        DiscoveryMode::Sitemap => {
            if config.effective_sitemap_url().is_none() {
                return Err(ConfigError::Validation(
                    "sitemap mode needs base-url or sitemap-url".to_string(),
                ));
            }
        }
        DiscoveryMode::Crawl => {
            if config.effective_start_url().is_none() {
                return Err(ConfigError::Validation(
                    "crawl mode needs base-url or start-url".to_string(),
                ));
            }
        }
        DiscoveryMode::List => {
            if config.urls.is_empty() {
                return Err(ConfigError::Validation(
                    "list mode needs at least one URL".to_string(),
                ));
            }
        }
    }

    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.concurrency < 1 || config.concurrency > 64 {
        return Err(ConfigError::Validation(format!(
            "concurrency must be between 1 and 64, got {}",
            config.concurrency
        )));
    }

    if config.max_pages < 1 {
        return Err(ConfigError::Validation(format!(
            "max-pages must be >= 1, got {}",
            config.max_pages
        )));
    }

    if config.max_retries < 1 || config.max_retries > 10 {
        return Err(ConfigError::Validation(format!(
            "max-retries must be between 1 and 10, got {}",
            config.max_retries
        )));
    }

    if config.retry_delay_ms > config.max_retry_delay_ms {
        return Err(ConfigError::Validation(format!(
            "retry-delay-ms ({}) cannot exceed max-retry-delay-ms ({})",
            config.retry_delay_ms, config.max_retry_delay_ms
        )));
    }

    if config.checkpoint_every < 1 {
        return Err(ConfigError::Validation(
            "checkpoint-every must be >= 1".to_string(),
        ));
    }

    if config.run_timeout_secs == Some(0) {
        return Err(ConfigError::Validation(
            "run-timeout-secs must be > 0 when set".to_string(),
        ));
    }

    Ok(())
}

/// Validates rendering configuration
fn validate_render_config(config: &RenderConfig) -> Result<(), ConfigError> {
    if config.navigation_timeout_ms == 0 {
        return Err(ConfigError::Validation(
            "navigation-timeout-ms must be > 0".to_string(),
        ));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent cannot be empty".to_string(),
        ));
    }

    Selector::parse(&config.content_selector).map_err(|e| {
        ConfigError::InvalidSelector(format!("'{}': {}", config.content_selector, e))
    })?;

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.dir.is_empty() {
        return Err(ConfigError::Validation(
            "output dir cannot be empty".to_string(),
        ));
    }

    if let Some(folder) = &config.folder {
        if folder.is_empty() || folder.contains('/') || folder.contains('\\') || folder == ".." {
            return Err(ConfigError::Validation(format!(
                "folder must be a single path component, got '{}'",
                folder
            )));
        }
    }

    Ok(())
}

/// Validates that a configured URL parses and uses HTTP(S)
fn validate_http_url(name: &str, value: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {} '{}': {}", name, value, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "{} '{}' must use http or https",
            name, value
        )));
    }

    if url.host_str().is_none() {
        return Err(ConfigError::InvalidUrl(format!(
            "{} '{}' has no host",
            name, value
        )));
    }

    Ok(())
}
