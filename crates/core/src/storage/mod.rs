//! Provider backends built on Apache OpenDAL.
//!
//! This module provides vendor-agnostic object storage with support for:
//! - Azure Blob Storage (and the Azurite emulator)
//! - S3-compatible: AWS S3, MinIO
//! - In-process memory (development and tests)
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                  BlobBackend (container, key)                    │
//! ├──────────────────────────────┬──────────────────────────────────┤
//! │ objects: OpenDAL Operator    │ container admin                  │
//! │ stat / read / write / list   │ Azure: Shared Key REST calls     │
//! │ copy / delete                │ S3: rust-s3 bucket calls         │
//! └──────────────────────────────┴──────────────────────────────────┘
//! ```

mod azure;
mod backend;
mod config;
mod connection;
mod error;
mod memory;
mod objects;
mod reader;
mod s3;
mod writer;

use std::sync::Arc;

pub use azure::AzureBackend;
pub use backend::{
    BlobBackend, ContainerInfo, ListItem, ListMode, ListStream, ObjectMeta, WriteOptions,
};
pub use config::{StorageConfig, StorageProvider};
pub use connection::{AzureConnection, ConnectionString, S3Connection};
pub use error::StorageError;
pub use memory::MemoryBackend;
pub use reader::BlobReader;
pub use self::s3::S3Backend;
pub use writer::BlobWriter;

/// Build the backend selected by `provider`.
pub fn connect(provider: &StorageProvider) -> Result<Arc<dyn BlobBackend>, StorageError> {
    let backend: Arc<dyn BlobBackend> = match provider {
        StorageProvider::AzureBlob { connection_string } => {
            Arc::new(AzureBackend::new(connection_string)?)
        }
        StorageProvider::S3 { connection_string } => Arc::new(S3Backend::new(connection_string)?),
        StorageProvider::Memory => Arc::new(MemoryBackend::new()),
    };
    Ok(backend)
}
