//! Content type lookup by file name.

/// Maps a file name to the content type stored with the blob.
pub trait MimeResolver: Send + Sync {
    /// Content type for `file_name`.
    fn resolve_content_type(&self, file_name: &str) -> String;
}

/// Resolver backed by the `mime_guess` extension table.
#[derive(Debug, Clone, Copy, Default)]
pub struct GuessMimeResolver;

impl MimeResolver for GuessMimeResolver {
    fn resolve_content_type(&self, file_name: &str) -> String {
        mime_guess::from_path(file_name)
            .first_or_octet_stream()
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("a.png", "image/png")]
    #[case("docs/report.PDF", "application/pdf")]
    #[case("index.html", "text/html")]
    #[case("noextension", "application/octet-stream")]
    #[case(".keep", "application/octet-stream")]
    fn test_guess(#[case] name: &str, #[case] expected: &str) {
        assert_eq!(GuessMimeResolver.resolve_content_type(name), expected);
    }
}
