//! Streaming object reader.

use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::{Bytes, BytesMut};
use futures::stream::BoxStream;
use futures::{Stream, StreamExt, TryStreamExt};

use super::backend::ObjectMeta;
use super::error::StorageError;

/// Byte stream of one object together with its metadata.
pub struct BlobReader {
    meta: ObjectMeta,
    stream: BoxStream<'static, Result<Bytes, StorageError>>,
}

impl BlobReader {
    /// Wrap a byte stream.
    #[must_use]
    pub fn new(meta: ObjectMeta, stream: BoxStream<'static, Result<Bytes, StorageError>>) -> Self {
        Self { meta, stream }
    }

    /// Metadata captured when the reader was opened.
    #[must_use]
    pub fn metadata(&self) -> &ObjectMeta {
        &self.meta
    }

    /// Split into metadata and the raw stream.
    #[must_use]
    pub fn into_parts(self) -> (ObjectMeta, BoxStream<'static, Result<Bytes, StorageError>>) {
        (self.meta, self.stream)
    }

    /// Buffer the whole object in memory.
    pub async fn read_to_end(self) -> Result<Bytes, StorageError> {
        let capacity = usize::try_from(self.meta.size).unwrap_or(0);
        let buf = self
            .stream
            .try_fold(BytesMut::with_capacity(capacity), |mut buf, chunk| async move {
                buf.extend_from_slice(&chunk);
                Ok(buf)
            })
            .await?;
        Ok(buf.freeze())
    }
}

impl Stream for BlobReader {
    type Item = Result<Bytes, StorageError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().stream.poll_next_unpin(cx)
    }
}

impl std::fmt::Debug for BlobReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlobReader").field("meta", &self.meta).finish_non_exhaustive()
    }
}
