//! The provider-neutral backend contract.
//!
//! A [`BlobBackend`] exposes a flat key/value namespace per container plus
//! container administration. Everything folder-shaped is layered on top by the
//! gateway; backends never see URLs.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::stream::BoxStream;

use super::error::StorageError;
use super::reader::BlobReader;
use super::writer::BlobWriter;

/// Metadata of a stored object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectMeta {
    /// Full key inside the container.
    pub key: String,
    /// Size in bytes.
    pub size: u64,
    /// Content type reported by the provider, if any.
    pub content_type: Option<String>,
    /// Last modification time, if reported.
    pub last_modified: Option<DateTime<Utc>>,
}

/// A container (Azure) or bucket (S3).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerInfo {
    /// Container name.
    pub name: String,
    /// Last modification time, if the provider reports one.
    pub last_modified: Option<DateTime<Utc>>,
}

impl ContainerInfo {
    /// Create container info without a timestamp.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            last_modified: None,
        }
    }
}

/// How a listing treats the `/` delimiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListMode {
    /// One level: direct objects plus common prefixes.
    Hierarchy,
    /// Every object below the prefix.
    Flat,
}

/// One entry produced by a listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListItem {
    /// A common prefix, always ending in `/`.
    Prefix(String),
    /// A stored object.
    Object(ObjectMeta),
}

impl ListItem {
    /// The key or prefix of this entry.
    #[must_use]
    pub fn key(&self) -> &str {
        match self {
            Self::Prefix(prefix) => prefix,
            Self::Object(meta) => &meta.key,
        }
    }
}

/// Options applied when an object is written.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteOptions {
    /// Content type to store with the object.
    pub content_type: Option<String>,
    /// Cache-Control header to store with the object.
    pub cache_control: Option<String>,
}

impl WriteOptions {
    /// Create empty write options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the content type.
    #[must_use]
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Set the Cache-Control header.
    #[must_use]
    pub fn with_cache_control(mut self, cache_control: impl Into<String>) -> Self {
        self.cache_control = Some(cache_control.into());
        self
    }
}

/// Lazily paged listing results.
pub type ListStream = BoxStream<'static, Result<ListItem, StorageError>>;

/// Storage backend for one provider.
///
/// All methods take the container explicitly; one backend serves every
/// container of an account.
#[async_trait]
pub trait BlobBackend: Send + Sync {
    /// Short provider name, e.g. `azure_blob`.
    fn provider_name(&self) -> &'static str;

    /// Public base URL under which `container/key` paths are served.
    fn public_endpoint(&self) -> &str;

    /// Metadata of an object, `None` when the object or its container is absent.
    async fn stat(&self, container: &str, key: &str) -> Result<Option<ObjectMeta>, StorageError>;

    /// Whether an object exists. Absence is `Ok(false)`, never an error.
    async fn exists(&self, container: &str, key: &str) -> Result<bool, StorageError> {
        Ok(self.stat(container, key).await?.is_some())
    }

    /// Open a streaming reader for an object.
    async fn open_read(&self, container: &str, key: &str) -> Result<BlobReader, StorageError>;

    /// Open a writer, creating the container first if needed. Data is
    /// committed when the writer is closed.
    async fn open_write(
        &self,
        container: &str,
        key: &str,
        options: WriteOptions,
    ) -> Result<BlobWriter, StorageError>;

    /// Write a whole object in one call.
    async fn put(
        &self,
        container: &str,
        key: &str,
        data: Bytes,
        options: WriteOptions,
    ) -> Result<(), StorageError> {
        let mut writer = self.open_write(container, key, options).await?;
        if !data.is_empty() {
            writer.write(data).await?;
        }
        writer.close().await?;
        Ok(())
    }

    /// List objects under a key prefix.
    async fn list(
        &self,
        container: &str,
        prefix: &str,
        mode: ListMode,
    ) -> Result<ListStream, StorageError>;

    /// Server-side copy inside one container.
    async fn copy(&self, container: &str, from: &str, to: &str) -> Result<(), StorageError>;

    /// Delete an object. Deleting an absent object succeeds.
    async fn delete(&self, container: &str, key: &str) -> Result<(), StorageError>;

    /// Create a container unless it already exists.
    async fn create_container(&self, container: &str) -> Result<(), StorageError>;

    /// Delete a container with everything in it. Returns false if it did not exist.
    async fn delete_container(&self, container: &str) -> Result<bool, StorageError>;

    /// Properties of a container, `None` when it does not exist.
    async fn container_info(&self, container: &str) -> Result<Option<ContainerInfo>, StorageError>;

    /// Every container of the account.
    async fn list_containers(&self) -> Result<Vec<ContainerInfo>, StorageError>;
}
