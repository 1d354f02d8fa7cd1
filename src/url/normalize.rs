use crate::UrlError;
use url::Url;

/// Normalizes a URL into the key used for visited-set and cache lookups
///
/// # Normalization Steps
///
/// 1. Parse the URL; reject if malformed
/// 2. Accept only `http` and `https`
/// 3. Require a host (the `url` crate lowercases it)
/// 4. Collapse repeated slashes in the path; dot segments are resolved by the parser
/// 5. Remove the fragment
/// 6. Keep the query string as-is, dropping only an empty trailing `?`
///
/// Trailing slashes are preserved because documentation servers often serve
/// `/docs/` and `/docs` differently.
///
/// # Examples
///
/// ```
/// use docs_crawler::url::normalize_url;
///
/// let url = normalize_url("https://EXAMPLE.com/docs//intro?tab=2#install").unwrap();
/// assert_eq!(url.as_str(), "https://example.com/docs/intro?tab=2");
/// ```
pub fn normalize_url(url_str: &str) -> Result<Url, UrlError> {
    let url = Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;
    normalize_parsed(url)
}

/// Resolves `href` against `base` and normalizes the result
///
/// Used for links found on rendered pages.
pub fn resolve_url(href: &str, base: &Url) -> Result<Url, UrlError> {
    let url = base
        .join(href.trim())
        .map_err(|e| UrlError::Parse(e.to_string()))?;
    normalize_parsed(url)
}

fn normalize_parsed(mut url: Url) -> Result<Url, UrlError> {
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(url.scheme().to_string()));
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(UrlError::MissingHost);
    }

    let path = url.path();
    if path.contains("//") {
        let collapsed = collapse_slashes(path);
        url.set_path(&collapsed);
    }

    url.set_fragment(None);

    if url.query() == Some("") {
        url.set_query(None);
    }

    Ok(url)
}

/// Collapses runs of `/` into a single slash
fn collapse_slashes(path: &str) -> String {
    let mut result = String::with_capacity(path.len());
    let mut previous_slash = false;
    for c in path.chars() {
        if c == '/' {
            if !previous_slash {
                result.push(c);
            }
            previous_slash = true;
        } else {
            result.push(c);
            previous_slash = false;
        }
    }
    result
}
