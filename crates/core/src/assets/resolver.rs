//! Building public URLs for stored blobs.

use super::locator::{absolute_url, encode_key, escape};

/// Joins keys onto the public base URL (a CDN when configured, else the
/// provider endpoint).
#[derive(Debug, Clone)]
pub struct UrlResolver {
    base_url: String,
}

impl UrlResolver {
    /// Create a resolver. A non-blank `cdn_url` replaces `endpoint`.
    #[must_use]
    pub fn new(endpoint: &str, cdn_url: Option<&str>) -> Self {
        let base = cdn_url
            .map(str::trim)
            .filter(|cdn| !cdn.is_empty())
            .unwrap_or(endpoint);
        Self {
            base_url: base.trim_end_matches('/').to_string(),
        }
    }

    /// Base URL without a trailing slash.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute, escaped URL of `key` (`container/path`). Absolute input is
    /// returned unchanged.
    #[must_use]
    pub fn resolve(&self, key: &str) -> String {
        if absolute_url(key).is_some() {
            return key.to_string();
        }
        combine(&self.base_url, &escape(key.trim_start_matches(['/', '\\'])))
    }

    /// Absolute URL of a stored key. Segments are taken literally, so a `%`
    /// in the key is encoded rather than decoded.
    #[must_use]
    pub fn url_of(&self, container: &str, key: Option<&str>) -> String {
        combine(&self.base_url, &Self::relative_url(container, key))
    }

    /// Relative URL `/{container}/{key}` of a stored key, segments encoded
    /// literally.
    #[must_use]
    pub fn relative_url(container: &str, key: Option<&str>) -> String {
        match key {
            Some(key) if !key.is_empty() => {
                format!("/{}/{}", encode_key(container), encode_key(key))
            }
            _ => format!("/{}", encode_key(container)),
        }
    }
}

/// Join two URL parts with exactly one `/` between them.
#[must_use]
pub fn combine(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}
