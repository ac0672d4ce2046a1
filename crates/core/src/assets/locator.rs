//! Mapping between blob URLs and `(container, key)` locations.
//!
//! A URL is either absolute (`https://acct.blob.core.windows.net/c/a/b.png`,
//! possibly behind a CDN) or relative (`/c/a/b.png`, `c\a\b.png`). The first
//! path segment is the container, the rest joined with `/` is the key. A
//! trailing separator marks a folder.

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};
use url::Url;

use super::error::AssetError;

/// Characters escaped inside one path segment: all but RFC 3986 unreserved.
const SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

const SEPARATORS: [char; 2] = ['/', '\\'];

/// A resolved blob location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobLocation {
    container: String,
    key: Option<String>,
}

impl BlobLocation {
    /// Container (Azure) or bucket (S3) name.
    #[must_use]
    pub fn container(&self) -> &str {
        &self.container
    }

    /// Key inside the container, `None` for the container root.
    #[must_use]
    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    /// The key with a trailing `/`, used as a folder prefix.
    #[must_use]
    pub fn directory(&self) -> Option<String> {
        self.key.as_ref().map(|k| format!("{k}/"))
    }
}

/// Splits blob URLs into container and key.
#[derive(Debug, Clone, Default)]
pub struct UrlLocator {
    base_paths: Vec<BasePath>,
}

/// Path prefix of a public base URL, scoped to its host and port.
#[derive(Debug, Clone, PartialEq, Eq)]
struct BasePath {
    authority: String,
    segments: Vec<String>,
}

impl UrlLocator {
    /// Create a locator that treats the first path segment as the container.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a public base URL whose path prefix is stripped from absolute
    /// URLs, e.g. the `/devstoreaccount1` of an emulator endpoint.
    #[must_use]
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        if let Some(url) = absolute_url(base_url) {
            let base = BasePath {
                authority: authority(&url),
                segments: split_path(url.path()),
            };
            if !base.segments.is_empty() && !self.base_paths.contains(&base) {
                self.base_paths.push(base);
            }
        }
        self
    }

    /// Decoded path segments of `url`, leading and trailing empties removed.
    #[must_use]
    pub fn outline(&self, url: &str) -> Vec<String> {
        match absolute_url(url) {
            Some(parsed) => {
                let segments = split_path(parsed.path());
                let authority = authority(&parsed);
                match self.base_paths.iter().find(|base| {
                    base.authority == authority
                        && segments.len() > base.segments.len()
                        && segments.starts_with(&base.segments)
                }) {
                    Some(base) => segments[base.segments.len()..].to_vec(),
                    None => segments,
                }
            }
            None => split_path(url),
        }
    }

    /// Resolve `url` to a location.
    pub fn locate(&self, url: &str) -> Result<BlobLocation, AssetError> {
        if url.trim().is_empty() {
            return Err(AssetError::validation("blob URL must not be empty"));
        }

        let segments = self.outline(url);
        let Some((container, rest)) = segments.split_first() else {
            return Err(AssetError::validation(format!(
                "cannot get container name from URL '{url}'"
            )));
        };
        if container.is_empty() {
            return Err(AssetError::validation(format!(
                "cannot get container name from URL '{url}'"
            )));
        }

        let key = rest.join("/");
        Ok(BlobLocation {
            container: container.clone(),
            key: (!key.is_empty()).then_some(key),
        })
    }

    /// Container name of `url`.
    pub fn container(&self, url: &str) -> Result<String, AssetError> {
        self.locate(url).map(|l| l.container)
    }

    /// Key of `url`, `None` when the URL names only a container.
    pub fn file_path(&self, url: &str) -> Result<Option<String>, AssetError> {
        self.locate(url).map(|l| l.key)
    }

    /// Key of `url` with a trailing `/`.
    pub fn directory_path(&self, url: &str) -> Result<Option<String>, AssetError> {
        self.locate(url).map(|l| l.directory())
    }

    /// True when `url` names a folder: it ends with a separator or has no key.
    pub fn is_folder(&self, url: &str) -> Result<bool, AssetError> {
        let location = self.locate(url)?;
        let path = absolute_url(url).map_or_else(|| url.to_string(), |u| u.path().to_string());
        Ok(location.key.is_none() || path.trim_end().ends_with(SEPARATORS))
    }
}

fn split_path(path: &str) -> Vec<String> {
    let mut segments: Vec<String> = path.split(SEPARATORS).map(unescape).collect();
    while segments.last().is_some_and(String::is_empty) {
        segments.pop();
    }
    let leading = segments.iter().take_while(|s| s.is_empty()).count();
    segments.drain(..leading);
    segments
}

fn authority(url: &Url) -> String {
    format!(
        "{}:{}",
        url.host_str().unwrap_or_default(),
        url.port_or_known_default().unwrap_or_default()
    )
}

/// Parse `value` as an absolute URL with a host.
pub(crate) fn absolute_url(value: &str) -> Option<Url> {
    Url::parse(value.trim()).ok().filter(Url::has_host)
}

/// Percent-decode once. Invalid UTF-8 sequences are replaced.
#[must_use]
pub fn unescape(value: &str) -> String {
    percent_decode_str(value).decode_utf8_lossy().into_owned()
}

/// Escape one path segment. Already-escaped input is decoded first, so
/// escaping is idempotent.
#[must_use]
pub fn escape_segment(segment: &str) -> String {
    utf8_percent_encode(&unescape(segment), SEGMENT).to_string()
}

/// Percent-encode one literal segment, such as a stored key segment or a
/// folder name. Unlike [`escape_segment`], `%` is encoded as data.
#[must_use]
pub fn encode_segment(segment: &str) -> String {
    utf8_percent_encode(segment, SEGMENT).to_string()
}

/// Percent-encode a literal `/`-separated key segment by segment.
#[must_use]
pub fn encode_key(key: &str) -> String {
    key.split('/').map(encode_segment).collect::<Vec<_>>().join("/")
}

/// Escape a URL or `/`-separated path.
///
/// Absolute URLs are normalized by re-serializing them; relative paths are
/// escaped segment by segment with the `/` separators preserved.
#[must_use]
pub fn escape(value: &str) -> String {
    if let Some(url) = absolute_url(value) {
        return url.to_string();
    }
    value
        .split('/')
        .map(escape_segment)
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    fn locator() -> UrlLocator {
        UrlLocator::new().with_base_url("http://127.0.0.1:10000/devstoreaccount1")
    }

    #[rstest]
    #[case("/catalog/images/a.png", "catalog", Some("images/a.png"))]
    #[case("catalog/images/a.png", "catalog", Some("images/a.png"))]
    #[case("catalog\\images\\a.png", "catalog", Some("images/a.png"))]
    #[case("catalog", "catalog", None)]
    #[case("/catalog/", "catalog", None)]
    #[case("https://acme.blob.core.windows.net/catalog/images/a.png", "catalog", Some("images/a.png"))]
    #[case("https://cdn.example.com/catalog/a%20b.png", "catalog", Some("a b.png"))]
    #[case("http://127.0.0.1:10000/devstoreaccount1/catalog/x/y.txt", "catalog", Some("x/y.txt"))]
    #[case("/catalog/caf%C3%A9/menu.pdf", "catalog", Some("café/menu.pdf"))]
    fn test_locate(#[case] url: &str, #[case] container: &str, #[case] key: Option<&str>) {
        let location = locator().locate(url).expect("valid url");
        assert_eq!(location.container(), container);
        assert_eq!(location.key(), key);
    }

    #[rstest]
    #[case("")]
    #[case("   ")]
    #[case("/")]
    #[case("https://acme.blob.core.windows.net/")]
    fn test_locate_rejects_urls_without_container(#[case] url: &str) {
        assert!(matches!(
            locator().locate(url),
            Err(AssetError::Validation(_))
        ));
    }

    #[rstest]
    #[case("/catalog/images/", true)]
    #[case("/catalog/images\\", true)]
    #[case("/catalog", true)]
    #[case("https://cdn.example.com/catalog/images/", true)]
    #[case("/catalog/images/a.png", false)]
    #[case("https://cdn.example.com/catalog/a.png", false)]
    fn test_is_folder(#[case] url: &str, #[case] expected: bool) {
        assert_eq!(locator().is_folder(url).expect("valid url"), expected);
    }

    #[test]
    fn test_directory_path() {
        let locator = locator();
        assert_eq!(
            locator.directory_path("/catalog/images").expect("valid"),
            Some("images/".to_string())
        );
        assert_eq!(locator.directory_path("/catalog").expect("valid"), None);
        assert_eq!(
            locator.file_path("/catalog/images/a.png").expect("valid"),
            Some("images/a.png".to_string())
        );
        assert_eq!(locator.container("catalog/a.png").expect("valid"), "catalog");
    }

    #[test]
    fn test_base_path_only_stripped_on_its_host() {
        let location = locator()
            .locate("https://acme.blob.core.windows.net/devstoreaccount1/a.txt")
            .expect("valid url");
        assert_eq!(location.container(), "devstoreaccount1");
        assert_eq!(location.key(), Some("a.txt"));
    }

    #[test]
    fn test_container_named_like_base_path_is_kept() {
        let location = locator()
            .locate("http://127.0.0.1:10000/devstoreaccount1")
            .expect("valid url");
        assert_eq!(location.container(), "devstoreaccount1");
    }

    #[rstest]
    #[case("a b/c.png", "a%20b/c.png")]
    #[case("a%20b/c.png", "a%20b/c.png")]
    #[case("100%/x.txt", "100%25/x.txt")]
    #[case("images/", "images/")]
    #[case("https://cdn.example.com/a b", "https://cdn.example.com/a%20b")]
    fn test_escape(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(escape(input), expected);
    }

    #[rstest]
    #[case("a%41.txt", "a%2541.txt")]
    #[case("docs/50%20off/a b.png", "docs/50%2520off/a%20b.png")]
    #[case("deep/", "deep/")]
    fn test_encode_key_keeps_percent_literal(#[case] key: &str, #[case] expected: &str) {
        assert_eq!(encode_key(key), expected);
    }

    proptest! {
        #[test]
        fn prop_escape_is_idempotent(value in "[^:]{0,40}") {
            let once = escape(&value);
            prop_assert_eq!(escape(&once), once);
        }

        #[test]
        fn prop_locate_reverses_encode_key(
            segments in prop::collection::vec("[^/\\\\]{1,12}", 1..4),
        ) {
            let key = segments.join("/");
            let location = UrlLocator::new()
                .locate(&format!("assets/{}", encode_key(&key)))
                .expect("encoded key");
            prop_assert_eq!(location.key(), Some(key.as_str()));
        }

        #[test]
        fn prop_unescape_reverses_segment_escape(segment in "[^%/]{0,20}") {
            prop_assert_eq!(unescape(&escape_segment(&segment)), segment);
        }
    }
}
