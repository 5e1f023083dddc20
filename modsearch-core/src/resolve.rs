//! URL resolution against the catalog's directory, plus cache-busting
//!
//! Group paths in a catalog are either absolute `http(s)://` URLs or paths
//! relative to the directory holding the catalog document. Every outbound
//! fetch of one request carries the same [`CacheBuster`] token.

use reqwest::Url;

use crate::error::{Result, SearchError};

/// Query parameter carrying the cache-bust token, inbound and outbound
pub const CACHE_BUST_PARAM: &str = "ts";

/// Directory containing `catalog_url`, with query and fragment removed
///
/// `https://h/x/modules/catalog.json?v=1` becomes `https://h/x/modules/`.
/// A URL that already ends in `/` is returned as-is, so the function is
/// idempotent.
pub fn base_directory(catalog_url: &str) -> String {
    let without_query = catalog_url
        .split(['?', '#'])
        .next()
        .unwrap_or(catalog_url)
        .trim();

    let path_start = without_query.find("://").map(|i| i + 3).unwrap_or(0);

    match without_query[path_start..].rfind('/') {
        Some(i) => without_query[..path_start + i + 1].to_string(),
        None if path_start > 0 => format!("{without_query}/"),
        None => String::new(),
    }
}

/// Resolve a group path against `base` into an absolute URL
///
/// Absolute `http(s)://` URLs are returned unchanged. Anything else has
/// leading `./` and `/` stripped and is joined onto `base` as a relative
/// reference, so `sub/x.json` and `../x.json` both work.
pub fn resolve(path_or_url: &str, base: &str) -> Result<String> {
    let trimmed = path_or_url.trim();
    if has_http_scheme(trimmed) {
        return Ok(trimmed.to_string());
    }

    let mut relative = trimmed;
    loop {
        if let Some(rest) = relative.strip_prefix("./") {
            relative = rest;
        } else if let Some(rest) = relative.strip_prefix('/') {
            relative = rest;
        } else {
            break;
        }
    }

    let base_url = Url::parse(base).map_err(|_| SearchError::InvalidUrl {
        url: base.to_string(),
    })?;

    base_url
        .join(relative)
        .map(|u| u.to_string())
        .map_err(|_| SearchError::InvalidUrl {
            url: format!("{base}{relative}"),
        })
}

fn has_http_scheme(s: &str) -> bool {
    let lower = s.get(..8).unwrap_or(s).to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Request-scoped cache-bust token
///
/// One instance is created per incoming request and applied to the catalog
/// fetch and every group fetch that request triggers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheBuster {
    token: String,
}

impl Default for CacheBuster {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheBuster {
    /// Fresh token: millisecond timestamp plus a short random nonce
    pub fn new() -> Self {
        let nonce = uuid::Uuid::new_v4().simple().to_string();
        Self {
            token: format!("{}-{}", chrono::Utc::now().timestamp_millis(), &nonce[..8]),
        }
    }

    /// Reuse a caller-supplied token, or generate one when none is usable
    ///
    /// Characters outside the URL-unreserved set are dropped so the token
    /// never needs escaping.
    pub fn from_override(token: Option<&str>) -> Self {
        let cleaned: String = token
            .unwrap_or_default()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '~'))
            .collect();

        if cleaned.is_empty() {
            Self::new()
        } else {
            Self { token: cleaned }
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    /// Append `ts=<token>` with `&` or `?` as the URL requires
    pub fn apply(&self, url: &str) -> String {
        let (main, fragment) = match url.find('#') {
            Some(i) => (&url[..i], &url[i..]),
            None => (url, ""),
        };

        let separator = if main.ends_with('?') || main.ends_with('&') {
            ""
        } else if main.contains('?') {
            "&"
        } else {
            "?"
        };

        format!(
            "{main}{separator}{CACHE_BUST_PARAM}={}{fragment}",
            self.token
        )
    }
}
