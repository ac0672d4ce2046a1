//! Azure Blob Storage backend.
//!
//! Object traffic goes through a per-container OpenDAL `azblob` operator;
//! container lifecycle goes through [`admin::ContainerAdmin`].

mod admin;

use async_trait::async_trait;
use opendal::{Operator, services};
use tracing::info;

use super::backend::{BlobBackend, ContainerInfo, ListMode, ListStream, ObjectMeta, WriteOptions};
use super::connection::AzureConnection;
use super::error::StorageError;
use super::objects::{self, Pipe};
use super::reader::BlobReader;
use super::writer::BlobWriter;
use admin::ContainerAdmin;

/// Backend for an Azure storage account (or Azurite).
pub struct AzureBackend {
    connection: AzureConnection,
    admin: ContainerAdmin,
}

impl AzureBackend {
    /// Connect using an Azure storage connection string.
    pub fn new(connection_string: &str) -> Result<Self, StorageError> {
        let connection = AzureConnection::parse(connection_string)?;
        let admin = ContainerAdmin::new(&connection)?;
        info!(
            account = %connection.account_name,
            endpoint = %connection.blob_endpoint,
            "Azure Blob backend initialized"
        );
        Ok(Self { connection, admin })
    }

    fn operator(&self, container: &str) -> Result<Operator, StorageError> {
        let builder = services::Azblob::default()
            .endpoint(&self.connection.blob_endpoint)
            .account_name(&self.connection.account_name)
            .account_key(&self.connection.account_key)
            .container(container);

        Operator::new(builder)
            .map_err(|e| StorageError::configuration(e.to_string()))?
            .finish()
            .pipe(Ok)
    }
}

#[async_trait]
impl BlobBackend for AzureBackend {
    fn provider_name(&self) -> &'static str {
        "azure_blob"
    }

    fn public_endpoint(&self) -> &str {
        &self.connection.blob_endpoint
    }

    async fn stat(&self, container: &str, key: &str) -> Result<Option<ObjectMeta>, StorageError> {
        objects::stat(&self.operator(container)?, key).await
    }

    async fn open_read(&self, container: &str, key: &str) -> Result<BlobReader, StorageError> {
        objects::open_read(&self.operator(container)?, key).await
    }

    async fn open_write(
        &self,
        container: &str,
        key: &str,
        options: WriteOptions,
    ) -> Result<BlobWriter, StorageError> {
        self.admin.create(container).await?;
        objects::open_write(&self.operator(container)?, key, &options).await
    }

    async fn list(
        &self,
        container: &str,
        prefix: &str,
        mode: ListMode,
    ) -> Result<ListStream, StorageError> {
        objects::list(&self.operator(container)?, prefix, mode).await
    }

    async fn copy(&self, container: &str, from: &str, to: &str) -> Result<(), StorageError> {
        objects::copy(&self.operator(container)?, from, to).await
    }

    async fn delete(&self, container: &str, key: &str) -> Result<(), StorageError> {
        objects::delete(&self.operator(container)?, key).await
    }

    async fn create_container(&self, container: &str) -> Result<(), StorageError> {
        self.admin.create(container).await.map(|_| ())
    }

    async fn delete_container(&self, container: &str) -> Result<bool, StorageError> {
        self.admin.delete(container).await
    }

    async fn container_info(&self, container: &str) -> Result<Option<ContainerInfo>, StorageError> {
        self.admin.properties(container).await
    }

    async fn list_containers(&self) -> Result<Vec<ContainerInfo>, StorageError> {
        self.admin.list().await
    }
}
