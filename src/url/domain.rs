use url::{Host, Url};

/// Extracts the lowercase host from a URL
///
/// # Examples
///
/// ```
/// use url::Url;
/// use docs_crawler::url::extract_domain;
///
/// let url = Url::parse("https://EXAMPLE.COM/path").unwrap();
/// assert_eq!(extract_domain(&url), Some("example.com".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Derives the mirror folder name from a site URL
///
/// Uses the second-level label of the host: `code.claude.com` becomes
/// `claude`, `example.com` becomes `example`, and a single-label host such
/// as `localhost` is used as-is. IP hosts are kept whole with separators
/// replaced by `-`.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use docs_crawler::url::site_label;
///
/// let url = Url::parse("https://code.claude.com/docs/").unwrap();
/// assert_eq!(site_label(&url), "claude");
/// ```
pub fn site_label(url: &Url) -> String {
    match url.host() {
        Some(Host::Domain(domain)) => {
            let domain = domain.to_lowercase();
            let parts: Vec<&str> = domain.split('.').filter(|p| !p.is_empty()).collect();
            match parts.len() {
                0 => "default".to_string(),
                1 => parts[0].to_string(),
                n => parts[n - 2].to_string(),
            }
        }
        Some(Host::Ipv4(addr)) => addr.to_string().replace('.', "-"),
        Some(Host::Ipv6(addr)) => addr.to_string().replace(':', "-"),
        None => "default".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_simple_domain() {
        let url = Url::parse("https://example.com/").unwrap();
        assert_eq!(extract_domain(&url), Some("example.com".to_string()));
    }

    #[test]
    fn test_extract_subdomain() {
        let url = Url::parse("https://blog.example.com/post").unwrap();
        assert_eq!(extract_domain(&url), Some("blog.example.com".to_string()));
    }

    #[test]
    fn test_site_label_second_level() {
        let url = Url::parse("https://code.claude.com/docs/").unwrap();
        assert_eq!(site_label(&url), "claude");

        let url = Url::parse("https://antigravity.google/docs").unwrap();
        assert_eq!(site_label(&url), "antigravity");

        let url = Url::parse("https://example.com").unwrap();
        assert_eq!(site_label(&url), "example");
    }

    #[test]
    fn test_site_label_single_label() {
        let url = Url::parse("http://localhost:8080/docs/").unwrap();
        assert_eq!(site_label(&url), "localhost");
    }

    #[test]
    fn test_site_label_ip_host() {
        let url = Url::parse("http://127.0.0.1:4000/").unwrap();
        assert_eq!(site_label(&url), "127-0-0-1");
    }
}
