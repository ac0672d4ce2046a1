//! Gateway error types.

use std::fmt;

use blobgate_shared::AppError;
use thiserror::Error;

use crate::storage::StorageError;

/// Errors surfaced by [`super::BlobGateway`].
#[derive(Debug, Error)]
pub enum AssetError {
    /// The URL cannot be mapped to a container and key.
    #[error("invalid blob URL: {0}")]
    Validation(String),

    /// Writing a file with this extension is not allowed.
    #[error("file extension of '{path}' is not allowed")]
    ExtensionNotAllowed {
        /// Rejected path.
        path: String,
    },

    /// The blob or container does not exist.
    #[error("blob not found: {0}")]
    NotFound(String),

    /// The provider failed.
    #[error(transparent)]
    Storage(StorageError),

    /// Some items of a batch failed.
    #[error(transparent)]
    Batch(#[from] BatchError),
}

impl AssetError {
    /// Create a validation error.
    #[must_use]
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create an extension-policy error.
    #[must_use]
    pub fn extension_not_allowed(path: impl Into<String>) -> Self {
        Self::ExtensionNotAllowed { path: path.into() }
    }

    /// Returns true when the target does not exist.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl From<StorageError> for AssetError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound { key } => Self::NotFound(key),
            StorageError::InvalidKey(msg) => Self::Validation(msg),
            other => Self::Storage(other),
        }
    }
}

impl From<AssetError> for AppError {
    fn from(err: AssetError) -> Self {
        let message = err.to_string();
        match err {
            AssetError::Validation(_) => Self::Validation(message),
            AssetError::ExtensionNotAllowed { .. } => Self::PolicyViolation(message),
            AssetError::NotFound(_) => Self::NotFound(message),
            AssetError::Storage(StorageError::Configuration(_)) => Self::Internal(message),
            AssetError::Storage(_) => Self::Storage(message),
            AssetError::Batch(_) => Self::PartialFailure(message),
        }
    }
}

/// One failed item of a batch.
#[derive(Debug)]
pub struct BatchFailure {
    /// Item the failure belongs to (URL or key).
    pub target: String,
    /// What went wrong.
    pub error: AssetError,
}

/// Aggregated failures of a batch operation.
///
/// Every item is attempted; the failures are kept in the order they were
/// observed.
#[derive(Debug)]
pub struct BatchError {
    operation: &'static str,
    total: usize,
    failures: Vec<BatchFailure>,
}

impl BatchError {
    /// Turn the outcome of a batch into a result.
    ///
    /// A batch of one that failed returns that item's error unchanged.
    pub fn into_result(
        operation: &'static str,
        total: usize,
        mut failures: Vec<BatchFailure>,
    ) -> Result<(), AssetError> {
        match failures.len() {
            0 => Ok(()),
            1 if total == 1 => Err(failures.remove(0).error),
            _ => Err(AssetError::Batch(Self {
                operation,
                total,
                failures,
            })),
        }
    }

    /// Operation name, e.g. `move`.
    #[must_use]
    pub fn operation(&self) -> &'static str {
        self.operation
    }

    /// Number of items attempted.
    #[must_use]
    pub fn total(&self) -> usize {
        self.total
    }

    /// All failures in the order they were observed.
    #[must_use]
    pub fn failures(&self) -> &[BatchFailure] {
        &self.failures
    }

    /// The first failure observed.
    #[must_use]
    pub fn first_failure(&self) -> Option<&BatchFailure> {
        self.failures.first()
    }
}

impl fmt::Display for BatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} failed for {} of {} item(s)",
            self.operation,
            self.failures.len(),
            self.total
        )?;
        if let Some(first) = self.first_failure() {
            write!(f, "; first failure at '{}': {}", first.target, first.error)?;
        }
        Ok(())
    }
}

impl std::error::Error for BatchError {}

#[cfg(test)]
mod tests {
    use super::*;

    fn failure(target: &str) -> BatchFailure {
        BatchFailure {
            target: target.to_string(),
            error: AssetError::Storage(StorageError::operation("timeout")),
        }
    }

    #[test]
    fn test_empty_batch_is_ok() {
        assert!(BatchError::into_result("remove", 3, Vec::new()).is_ok());
    }

    #[test]
    fn test_single_item_batch_unwraps_error() {
        let err = BatchError::into_result("move", 1, vec![failure("a.txt")]).unwrap_err();
        assert!(matches!(err, AssetError::Storage(_)));
    }

    #[test]
    fn test_batch_keeps_every_failure() {
        let err = BatchError::into_result("move", 5, vec![failure("a.txt"), failure("b.txt")])
            .unwrap_err();
        let AssetError::Batch(batch) = err else {
            panic!("expected batch error");
        };
        assert_eq!(batch.total(), 5);
        assert_eq!(batch.failures().len(), 2);
        assert_eq!(batch.first_failure().map(|f| f.target.as_str()), Some("a.txt"));
        assert!(batch.to_string().starts_with("move failed for 2 of 5 item(s)"));
    }

    #[test]
    fn test_storage_not_found_becomes_asset_not_found() {
        let err = AssetError::from(StorageError::not_found("c/a.txt"));
        assert!(err.is_not_found());
    }

    #[test]
    fn test_app_error_mapping() {
        let app: AppError = AssetError::extension_not_allowed("a.exe").into();
        assert_eq!(app.status_code(), 403);

        let app: AppError = AssetError::validation("empty").into();
        assert_eq!(app.status_code(), 400);

        let app: AppError = AssetError::Storage(StorageError::operation("503")).into();
        assert_eq!(app.error_code(), "STORAGE_ERROR");

        let batch = BatchError::into_result("remove", 2, vec![failure("a"), failure("b")])
            .unwrap_err();
        let app: AppError = batch.into();
        assert_eq!(app.error_code(), "PARTIAL_FAILURE");
    }
}
