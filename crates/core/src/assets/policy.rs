//! Upload extension policy.

use std::collections::HashSet;

use super::error::AssetError;

/// Rejects writes of blacklisted file extensions.
///
/// Extensions are compared case-insensitively, with or without a leading dot.
#[derive(Debug, Clone, Default)]
pub struct ExtensionPolicy {
    blacklist: HashSet<String>,
}

impl ExtensionPolicy {
    /// Build a policy from configured extensions such as `exe` or `.BAT`.
    pub fn new<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let blacklist = extensions
            .into_iter()
            .map(|ext| ext.as_ref().trim().trim_start_matches('.').to_lowercase())
            .filter(|ext| !ext.is_empty())
            .collect();
        Self { blacklist }
    }

    /// True when the extension of `path` is blacklisted.
    #[must_use]
    pub fn is_blacklisted(&self, path: &str) -> bool {
        extension_of(path).is_some_and(|ext| self.blacklist.contains(&ext))
    }

    /// Fail with [`AssetError::ExtensionNotAllowed`] for blacklisted paths.
    pub fn ensure_allowed(&self, path: &str) -> Result<(), AssetError> {
        if self.is_blacklisted(path) {
            return Err(AssetError::extension_not_allowed(path));
        }
        Ok(())
    }
}

/// Lowercased extension of the last path segment. Trailing dots and spaces
/// are ignored, as Windows ignores them when the file is saved.
fn extension_of(path: &str) -> Option<String> {
    let name = path.rsplit(['/', '\\']).next()?;
    let name = name.trim_end_matches(['.', ' ']);
    let (_, ext) = name.rsplit_once('.')?;
    (!ext.is_empty()).then(|| ext.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn policy() -> ExtensionPolicy {
        ExtensionPolicy::new([".exe", "BAT", " ps1 ", ""])
    }

    #[rstest]
    #[case("tools/setup.exe", true)]
    #[case("tools/SETUP.EXE", true)]
    #[case("run.bat", true)]
    #[case("script.Ps1", true)]
    #[case("setup.exe.", true)]
    #[case("setup.exe ", true)]
    #[case("dir.exe\\readme.txt", false)]
    #[case("images/a.png", false)]
    #[case("exe", false)]
    #[case("folder/", false)]
    #[case("archive.exe.zip", false)]
    fn test_is_blacklisted(#[case] path: &str, #[case] expected: bool) {
        assert_eq!(policy().is_blacklisted(path), expected);
    }

    #[test]
    fn test_ensure_allowed() {
        assert!(policy().ensure_allowed("a.png").is_ok());
        assert!(matches!(
            policy().ensure_allowed("a.exe"),
            Err(AssetError::ExtensionNotAllowed { .. })
        ));
    }

    #[test]
    fn test_empty_policy_allows_everything() {
        assert!(!ExtensionPolicy::default().is_blacklisted("a.exe"));
    }
}
