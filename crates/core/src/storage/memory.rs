//! In-process backend for development and tests.

use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use opendal::{Operator, services};
use tracing::debug;

use super::backend::{BlobBackend, ContainerInfo, ListMode, ListStream, ObjectMeta, WriteOptions};
use super::error::StorageError;
use super::objects::{self, Pipe};
use super::reader::BlobReader;
use super::writer::BlobWriter;

/// Endpoint reported by a memory backend unless another one is set.
pub const DEFAULT_MEMORY_ENDPOINT: &str = "http://localhost/blobs";

#[derive(Clone)]
struct MemoryContainer {
    operator: Operator,
    created: DateTime<Utc>,
}

/// Backend keeping one OpenDAL memory operator per container.
pub struct MemoryBackend {
    endpoint: String,
    containers: RwLock<BTreeMap<String, MemoryContainer>>,
}

impl MemoryBackend {
    /// Create an empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::with_endpoint(DEFAULT_MEMORY_ENDPOINT)
    }

    /// Create an empty backend reporting a custom public endpoint.
    #[must_use]
    pub fn with_endpoint(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            containers: RwLock::new(BTreeMap::new()),
        }
    }

    fn operator(&self, container: &str) -> Option<Operator> {
        self.containers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(container)
            .map(|c| c.operator.clone())
    }

    fn ensure_container(&self, container: &str) -> Result<Operator, StorageError> {
        if let Some(op) = self.operator(container) {
            return Ok(op);
        }

        let mut containers = self.containers.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = containers.get(container) {
            return Ok(existing.operator.clone());
        }

        let operator = Operator::new(services::Memory::default())
            .map_err(|e| StorageError::configuration(e.to_string()))?
            .finish();
        containers.insert(
            container.to_string(),
            MemoryContainer {
                operator: operator.clone(),
                created: Utc::now(),
            },
        );
        debug!(container, "memory container created");
        operator.pipe(Ok)
    }

    fn require(&self, container: &str) -> Result<Operator, StorageError> {
        self.operator(container)
            .ok_or_else(|| StorageError::not_found(container))
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BlobBackend for MemoryBackend {
    fn provider_name(&self) -> &'static str {
        "memory"
    }

    fn public_endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn stat(&self, container: &str, key: &str) -> Result<Option<ObjectMeta>, StorageError> {
        match self.operator(container) {
            Some(op) => objects::stat(&op, key).await,
            None => Ok(None),
        }
    }

    async fn open_read(&self, container: &str, key: &str) -> Result<BlobReader, StorageError> {
        let op = self
            .operator(container)
            .ok_or_else(|| StorageError::not_found(key))?;
        objects::open_read(&op, key).await
    }

    async fn open_write(
        &self,
        container: &str,
        key: &str,
        options: WriteOptions,
    ) -> Result<BlobWriter, StorageError> {
        let op = self.ensure_container(container)?;
        objects::open_write(&op, key, &options).await
    }

    async fn list(
        &self,
        container: &str,
        prefix: &str,
        mode: ListMode,
    ) -> Result<ListStream, StorageError> {
        let op = self.require(container)?;
        objects::list_by_scan(&op, prefix, mode).await
    }

    async fn copy(&self, container: &str, from: &str, to: &str) -> Result<(), StorageError> {
        let op = self.require(container)?;
        objects::copy(&op, from, to).await
    }

    async fn delete(&self, container: &str, key: &str) -> Result<(), StorageError> {
        match self.operator(container) {
            Some(op) => objects::delete(&op, key).await,
            None => Ok(()),
        }
    }

    async fn create_container(&self, container: &str) -> Result<(), StorageError> {
        self.ensure_container(container).map(|_| ())
    }

    async fn delete_container(&self, container: &str) -> Result<bool, StorageError> {
        let removed = self
            .containers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(container)
            .is_some();
        if removed {
            debug!(container, "memory container deleted");
        }
        Ok(removed)
    }

    async fn container_info(&self, container: &str) -> Result<Option<ContainerInfo>, StorageError> {
        Ok(self
            .containers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(container)
            .map(|c| ContainerInfo {
                name: container.to_string(),
                last_modified: Some(c.created),
            }))
    }

    async fn list_containers(&self) -> Result<Vec<ContainerInfo>, StorageError> {
        Ok(self
            .containers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(name, c)| ContainerInfo {
                name: name.clone(),
                last_modified: Some(c.created),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    #[tokio::test]
    async fn test_write_creates_container() {
        let backend = MemoryBackend::new();
        assert!(backend.container_info("assets").await.expect("info").is_none());

        backend
            .put("assets", "a.txt", Bytes::from_static(b"hi"), WriteOptions::new())
            .await
            .expect("put");

        assert!(backend.container_info("assets").await.expect("info").is_some());
        assert!(backend.exists("assets", "a.txt").await.expect("exists"));
    }

    #[tokio::test]
    async fn test_missing_container_reads_as_absent() {
        let backend = MemoryBackend::new();
        assert!(!backend.exists("nope", "a.txt").await.expect("exists"));
        assert!(backend.delete("nope", "a.txt").await.is_ok());
        assert!(matches!(
            backend.open_read("nope", "a.txt").await,
            Err(StorageError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_delete_container_drops_objects() {
        let backend = MemoryBackend::new();
        backend
            .put("tmp", "x/y.txt", Bytes::from_static(b"1"), WriteOptions::new())
            .await
            .expect("put");

        assert!(backend.delete_container("tmp").await.expect("delete"));
        assert!(!backend.delete_container("tmp").await.expect("delete again"));
        assert!(!backend.exists("tmp", "x/y.txt").await.expect("exists"));
        assert!(backend.list_containers().await.expect("list").is_empty());
    }
}
