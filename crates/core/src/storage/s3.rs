//! S3-compatible backend (AWS S3, MinIO).
//!
//! Objects are served by a per-bucket OpenDAL `s3` operator. Bucket
//! lifecycle uses rust-s3 with path-style addressing so MinIO endpoints work
//! without wildcard DNS.

use async_trait::async_trait;
use opendal::{Operator, services};
use s3::creds::Credentials;
use s3::{Bucket, BucketConfiguration, Region};
use tracing::{debug, info};

use super::backend::{BlobBackend, ContainerInfo, ListMode, ListStream, ObjectMeta, WriteOptions};
use super::connection::S3Connection;
use super::error::StorageError;
use super::objects::{self, Pipe};
use super::reader::BlobReader;
use super::writer::BlobWriter;

/// Backend for an S3-compatible endpoint.
pub struct S3Backend {
    connection: S3Connection,
    region: Region,
    credentials: Credentials,
}

impl S3Backend {
    /// Connect using an `Endpoint=...;AccessKey=...;SecretKey=...` string.
    pub fn new(connection_string: &str) -> Result<Self, StorageError> {
        let connection = S3Connection::parse(connection_string)?;
        let credentials = Credentials::new(
            Some(&connection.access_key),
            Some(&connection.secret_key),
            None,
            None,
            None,
        )
        .map_err(|e| StorageError::configuration(format!("invalid S3 credentials: {e}")))?;
        let region = Region::Custom {
            region: connection.region.clone(),
            endpoint: connection.endpoint.clone(),
        };

        info!(
            endpoint = %connection.endpoint,
            region = %connection.region,
            "S3 backend initialized"
        );
        Ok(Self {
            connection,
            region,
            credentials,
        })
    }

    fn operator(&self, bucket: &str) -> Result<Operator, StorageError> {
        let builder = services::S3::default()
            .endpoint(&self.connection.endpoint)
            .bucket(bucket)
            .region(&self.connection.region)
            .access_key_id(&self.connection.access_key)
            .secret_access_key(&self.connection.secret_key);

        Operator::new(builder)
            .map_err(|e| StorageError::configuration(e.to_string()))?
            .finish()
            .pipe(Ok)
    }

    fn bucket(&self, name: &str) -> Result<Box<Bucket>, StorageError> {
        let mut bucket = Bucket::new(name, self.region.clone(), self.credentials.clone())?;
        bucket.set_path_style();
        Ok(bucket)
    }
}

fn already_exists(message: &str) -> bool {
    message.contains("BucketAlreadyOwnedByYou")
        || message.contains("BucketAlreadyExists")
        || message.contains("already own it")
}

#[async_trait]
impl BlobBackend for S3Backend {
    fn provider_name(&self) -> &'static str {
        "s3"
    }

    fn public_endpoint(&self) -> &str {
        &self.connection.endpoint
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
        self.create_container(container).await?;
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
        if self.bucket(container)?.exists().await? {
            return Ok(());
        }

        match Bucket::create_with_path_style(
            container,
            self.region.clone(),
            self.credentials.clone(),
            BucketConfiguration::default(),
        )
        .await
        {
            Ok(response) if response.success() || already_exists(&response.response_text) => {
                info!(bucket = container, "S3 bucket created");
                Ok(())
            }
            Ok(response) => Err(StorageError::operation(format!(
                "failed to create bucket '{container}': HTTP {} {}",
                response.response_code, response.response_text
            ))),
            Err(e) if already_exists(&e.to_string()) => {
                debug!(bucket = container, "S3 bucket already exists");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn delete_container(&self, container: &str) -> Result<bool, StorageError> {
        let bucket = self.bucket(container)?;
        if !bucket.exists().await? {
            return Ok(false);
        }

        // S3 refuses to delete a bucket that still holds objects.
        objects::purge(&self.operator(container)?).await?;
        let status = bucket.delete().await?;
        if !(200..300).contains(&status) {
            return Err(StorageError::operation(format!(
                "failed to delete bucket '{container}': HTTP {status}"
            )));
        }

        info!(bucket = container, "S3 bucket deleted");
        Ok(true)
    }

    async fn container_info(&self, container: &str) -> Result<Option<ContainerInfo>, StorageError> {
        Ok(self
            .bucket(container)?
            .exists()
            .await?
            .then(|| ContainerInfo::named(container)))
    }

    async fn list_containers(&self) -> Result<Vec<ContainerInfo>, StorageError> {
        let response = Bucket::list_buckets(self.region.clone(), self.credentials.clone()).await?;
        Ok(response.bucket_names().map(ContainerInfo::named).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_from_connection_string() {
        let backend = S3Backend::new(
            "Endpoint=http://localhost:9000;AccessKey=minio;SecretKey=minio123",
        )
        .expect("backend");

        assert_eq!(backend.provider_name(), "s3");
        assert_eq!(backend.public_endpoint(), "http://localhost:9000");
        assert!(backend.operator("assets").is_ok());
        assert!(backend.bucket("assets").is_ok());
    }

    #[test]
    fn test_backend_requires_credentials() {
        let result = S3Backend::new("Endpoint=http://localhost:9000;AccessKey=minio");
        assert!(matches!(result, Err(StorageError::Configuration(_))));
    }

    #[test]
    fn test_already_exists_detection() {
        assert!(already_exists("<Code>BucketAlreadyOwnedByYou</Code>"));
        assert!(already_exists("Your previous request to create the named bucket succeeded and you already own it."));
        assert!(!already_exists("AccessDenied"));
    }
}
