//! Storage error types.

use thiserror::Error;

/// Storage operation errors.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Object or container not found in storage.
    #[error("not found: {key}")]
    NotFound {
        /// Storage key (or container name) that was not found.
        key: String,
    },

    /// Operation not supported by the storage provider.
    #[error("operation not supported by storage provider: {0}")]
    Unsupported(String),

    /// Storage provider configuration error.
    #[error("storage configuration error: {0}")]
    Configuration(String),

    /// Backend operation error.
    #[error("storage operation failed: {0}")]
    Operation(String),

    /// Invalid storage key format.
    #[error("invalid storage key: {0}")]
    InvalidKey(String),

    /// The writer has already committed or aborted its upload.
    #[error("writer for '{key}' is already closed")]
    WriterClosed {
        /// Key the writer was opened for.
        key: String,
    },
}

impl StorageError {
    /// Create a not found error.
    #[must_use]
    pub fn not_found(key: impl Into<String>) -> Self {
        Self::NotFound { key: key.into() }
    }

    /// Create a configuration error.
    #[must_use]
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Create an operation error.
    #[must_use]
    pub fn operation(msg: impl Into<String>) -> Self {
        Self::Operation(msg.into())
    }

    /// Create an invalid key error.
    #[must_use]
    pub fn invalid_key(msg: impl Into<String>) -> Self {
        Self::InvalidKey(msg.into())
    }

    /// Returns true when the error means the object or container is absent.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Attach the storage key to an OpenDAL error.
    pub(crate) fn with_key(key: &str) -> impl Fn(opendal::Error) -> Self + '_ {
        move |err| match err.kind() {
            opendal::ErrorKind::NotFound => Self::not_found(key),
            _ => Self::from(err),
        }
    }
}

impl From<opendal::Error> for StorageError {
    fn from(err: opendal::Error) -> Self {
        match err.kind() {
            opendal::ErrorKind::NotFound => Self::NotFound {
                key: err.to_string(),
            },
            opendal::ErrorKind::Unsupported => Self::Unsupported(err.to_string()),
            opendal::ErrorKind::ConfigInvalid => Self::Configuration(err.to_string()),
            _ => Self::Operation(err.to_string()),
        }
    }
}

impl From<::s3::error::S3Error> for StorageError {
    fn from(err: ::s3::error::S3Error) -> Self {
        Self::Operation(format!("S3 request failed: {err}"))
    }
}

impl From<reqwest::Error> for StorageError {
    fn from(err: reqwest::Error) -> Self {
        Self::Operation(format!("Azure request failed: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_is_distinguishable() {
        assert!(StorageError::not_found("a/b.png").is_not_found());
        assert!(!StorageError::operation("boom").is_not_found());
        assert!(!StorageError::configuration("bad").is_not_found());
    }

    #[test]
    fn test_opendal_not_found_keeps_key() {
        let err = opendal::Error::new(opendal::ErrorKind::NotFound, "object missing");
        let mapped = StorageError::with_key("docs/a.txt")(err);
        assert!(matches!(mapped, StorageError::NotFound { ref key } if key == "docs/a.txt"));
    }

    #[test]
    fn test_opendal_other_errors_map_to_operation() {
        let err = opendal::Error::new(opendal::ErrorKind::PermissionDenied, "denied");
        assert!(matches!(StorageError::from(err), StorageError::Operation(_)));

        let err = opendal::Error::new(opendal::ErrorKind::Unsupported, "no copy");
        assert!(matches!(StorageError::from(err), StorageError::Unsupported(_)));
    }
}
