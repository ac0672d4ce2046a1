//! Commit-once object writer.
//!
//! Uploads are staged by the provider while chunks are written and become
//! visible only when [`BlobWriter::close`] commits them. `flush` never
//! commits, so callers that flush repeatedly (or flush and then close) still
//! produce exactly one upload.
//!
//! A writer dropped before `close` never commits. When dropped inside a
//! Tokio runtime it spawns an abort so the provider can release a started
//! multipart or block upload. Outside a runtime the staged parts are left to
//! the provider's own expiry (S3 lifecycle rules, Azure's uncommitted block
//! garbage collection).

use bytes::Bytes;
use opendal::Writer;
use tokio::runtime::Handle;
use tracing::{debug, warn};

use super::error::StorageError;

/// Streaming writer for one object.
///
/// Call [`close`](Self::close) to commit or [`abort`](Self::abort) to discard.
/// Dropping an open writer aborts in the background when a runtime is
/// available.
pub struct BlobWriter {
    key: String,
    inner: Option<Writer>,
    bytes_written: u64,
}

impl BlobWriter {
    pub(crate) fn new(key: impl Into<String>, inner: Writer) -> Self {
        Self {
            key: key.into(),
            inner: Some(inner),
            bytes_written: 0,
        }
    }

    /// Key this writer uploads to.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Bytes accepted so far.
    #[must_use]
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// True once the upload has been committed or aborted.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.is_none()
    }

    /// Append a chunk to the pending upload.
    pub async fn write(&mut self, chunk: impl Into<Bytes>) -> Result<(), StorageError> {
        let chunk = chunk.into();
        let len = u64::try_from(chunk.len()).unwrap_or(u64::MAX);
        let writer = self.inner.as_mut().ok_or_else(|| StorageError::WriterClosed {
            key: self.key.clone(),
        })?;

        writer.write(chunk).await.map_err(StorageError::with_key(&self.key))?;
        self.bytes_written = self.bytes_written.saturating_add(len);
        Ok(())
    }

    /// No-op kept for stream-like callers; data is committed by `close`.
    #[allow(clippy::unused_async)]
    pub async fn flush(&mut self) -> Result<(), StorageError> {
        Ok(())
    }

    /// Commit the upload. Calling `close` again after a commit is a no-op.
    pub async fn close(&mut self) -> Result<u64, StorageError> {
        if let Some(mut writer) = self.inner.take() {
            writer.close().await.map_err(StorageError::with_key(&self.key))?;
            debug!(key = %self.key, bytes = self.bytes_written, "blob upload committed");
        }
        Ok(self.bytes_written)
    }

    /// Discard the pending upload.
    pub async fn abort(&mut self) -> Result<(), StorageError> {
        if let Some(mut writer) = self.inner.take() {
            writer.abort().await.map_err(StorageError::with_key(&self.key))?;
            debug!(key = %self.key, "blob upload aborted");
        }
        Ok(())
    }
}

impl Drop for BlobWriter {
    fn drop(&mut self) {
        let Some(mut writer) = self.inner.take() else {
            return;
        };
        warn!(key = %self.key, "blob writer dropped without close, upload discarded");

        let Ok(handle) = Handle::try_current() else {
            warn!(
                key = %self.key,
                "no runtime to abort dropped upload, staged parts left to the provider"
            );
            return;
        };
        let key = std::mem::take(&mut self.key);
        handle.spawn(async move {
            if let Err(e) = writer.abort().await {
                warn!(key = %key, error = %e, "failed to abort dropped upload");
            }
        });
    }
}

impl std::fmt::Debug for BlobWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlobWriter")
            .field("key", &self.key)
            .field("bytes_written", &self.bytes_written)
            .field("closed", &self.is_closed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opendal::{Operator, services};

    fn memory_operator() -> Operator {
        Operator::new(services::Memory::default())
            .expect("memory operator")
            .finish()
    }

    #[tokio::test]
    async fn test_close_commits_once() {
        let op = memory_operator();
        let mut writer = BlobWriter::new("a.txt", op.writer("a.txt").await.expect("writer"));

        writer.write(Bytes::from_static(b"abc")).await.expect("write");
        writer.flush().await.expect("flush");
        writer.flush().await.expect("flush again");
        assert_eq!(writer.close().await.expect("close"), 3);
        assert_eq!(writer.close().await.expect("second close is a no-op"), 3);
        assert!(writer.is_closed());

        let data = op.read("a.txt").await.expect("read back").to_vec();
        assert_eq!(data, b"abc");
    }

    #[tokio::test]
    async fn test_write_after_close_fails() {
        let op = memory_operator();
        let mut writer = BlobWriter::new("a.txt", op.writer("a.txt").await.expect("writer"));
        writer.close().await.expect("close");

        let err = writer.write(Bytes::from_static(b"late")).await.unwrap_err();
        assert!(matches!(err, StorageError::WriterClosed { .. }));
    }

    #[tokio::test]
    async fn test_nothing_visible_before_close() {
        let op = memory_operator();
        let mut writer = BlobWriter::new("pending.txt", op.writer("pending.txt").await.expect("writer"));
        writer.write(Bytes::from_static(b"data")).await.expect("write");
        writer.flush().await.expect("flush");

        assert!(!op.exists("pending.txt").await.expect("exists"));
        writer.close().await.expect("close");
        assert!(op.exists("pending.txt").await.expect("exists"));
    }

    #[tokio::test]
    async fn test_drop_without_close_aborts_in_background() {
        let op = memory_operator();
        let mut writer = BlobWriter::new("dropped.txt", op.writer("dropped.txt").await.expect("writer"));
        writer.write(Bytes::from_static(b"partial")).await.expect("write");
        drop(writer);
        tokio::task::yield_now().await;

        assert!(!op.exists("dropped.txt").await.expect("exists"));

        let mut retry = BlobWriter::new("dropped.txt", op.writer("dropped.txt").await.expect("writer"));
        retry.write(Bytes::from_static(b"full")).await.expect("write");
        assert_eq!(retry.close().await.expect("close"), 4);
        assert_eq!(op.read("dropped.txt").await.expect("read").to_vec(), b"full");
    }

    #[test]
    fn test_drop_outside_runtime_does_not_panic() {
        let runtime = tokio::runtime::Runtime::new().expect("runtime");
        let op = memory_operator();
        let writer = runtime.block_on(async {
            let mut writer =
                BlobWriter::new("orphan.txt", op.writer("orphan.txt").await.expect("writer"));
            writer.write(Bytes::from_static(b"data")).await.expect("write");
            writer
        });

        drop(writer);

        let visible = runtime
            .block_on(op.exists("orphan.txt"))
            .expect("exists");
        assert!(!visible);
    }
}
