//! Synchronous wrapper over [`BlobGateway`] for callers without a runtime.

use bytes::Bytes;
use tokio::runtime::{Builder, Runtime};

use super::error::AssetError;
use super::gateway::BlobGateway;
use super::types::{BlobEntrySearchResult, BlobFolder, BlobInfo};

/// Blocking gateway driving its own current-thread runtime.
///
/// Every call blocks the calling thread until the operation finishes. Calling
/// it from inside an async runtime panics.
#[derive(Debug)]
pub struct BlockingBlobGateway {
    gateway: BlobGateway,
    runtime: Runtime,
}

impl BlockingBlobGateway {
    /// Wrap a gateway.
    pub fn new(gateway: BlobGateway) -> std::io::Result<Self> {
        let runtime = Builder::new_current_thread().enable_all().build()?;
        Ok(Self { gateway, runtime })
    }

    /// The wrapped async gateway.
    #[must_use]
    pub fn gateway(&self) -> &BlobGateway {
        &self.gateway
    }

    /// See [`BlobGateway::exists`].
    pub fn exists(&self, url: &str) -> Result<bool, AssetError> {
        self.runtime.block_on(self.gateway.exists(url))
    }

    /// Read a whole blob into memory.
    pub fn read(&self, url: &str) -> Result<Bytes, AssetError> {
        self.runtime.block_on(async {
            let reader = self.gateway.open_read(url).await?;
            Ok(reader.read_to_end().await?)
        })
    }

    /// See [`BlobGateway::write`].
    pub fn write(&self, url: &str, data: impl Into<Bytes>) -> Result<u64, AssetError> {
        self.runtime.block_on(self.gateway.write(url, data.into()))
    }

    /// See [`BlobGateway::blob_info`].
    pub fn blob_info(&self, url: &str) -> Result<BlobInfo, AssetError> {
        self.runtime.block_on(self.gateway.blob_info(url))
    }

    /// See [`BlobGateway::remove`].
    pub fn remove<S: AsRef<str>>(&self, urls: &[S]) -> Result<(), AssetError> {
        self.runtime.block_on(self.gateway.remove(urls))
    }

    /// See [`BlobGateway::search`].
    pub fn search(
        &self,
        folder_url: Option<&str>,
        keyword: Option<&str>,
    ) -> Result<BlobEntrySearchResult, AssetError> {
        self.runtime.block_on(self.gateway.search(folder_url, keyword))
    }

    /// See [`BlobGateway::create_folder`].
    pub fn create_folder(&self, folder: &BlobFolder) -> Result<(), AssetError> {
        self.runtime.block_on(self.gateway.create_folder(folder))
    }

    /// See [`BlobGateway::move_blob`].
    pub fn move_blob(&self, old_url: &str, new_url: &str) -> Result<(), AssetError> {
        self.runtime.block_on(self.gateway.move_blob(old_url, new_url))
    }

    /// See [`BlobGateway::copy_blob`].
    pub fn copy_blob(&self, old_url: &str, new_url: &str) -> Result<(), AssetError> {
        self.runtime.block_on(self.gateway.copy_blob(old_url, new_url))
    }

    /// See [`BlobGateway::absolute_url`].
    #[must_use]
    pub fn absolute_url(&self, key: &str) -> String {
        self.gateway.absolute_url(key)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::storage::{MemoryBackend, StorageConfig, StorageProvider};

    fn blocking() -> BlockingBlobGateway {
        let config = StorageConfig::new(StorageProvider::memory());
        let gateway = BlobGateway::new(Arc::new(MemoryBackend::new()), &config);
        BlockingBlobGateway::new(gateway).expect("runtime")
    }

    #[test]
    fn test_blocking_round_trip() {
        let gateway = blocking();
        assert_eq!(gateway.write("assets/notes/a.txt", "hello").expect("write"), 5);
        assert!(gateway.exists("assets/notes/a.txt").expect("exists"));
        assert_eq!(gateway.read("assets/notes/a.txt").expect("read"), "hello");
        assert_eq!(gateway.blob_info("assets/notes/a.txt").expect("info").size, 5);
    }

    #[test]
    fn test_blocking_folder_operations() {
        let gateway = blocking();
        gateway
            .create_folder(&BlobFolder::new("notes", Some("assets".to_string())))
            .expect("create");
        gateway.write("assets/notes/a.txt", "a").expect("write");
        gateway.copy_blob("assets/notes/", "assets/archive/").expect("copy");
        gateway.move_blob("assets/archive/a.txt", "assets/archive/b.txt").expect("move");

        let archive = gateway.search(Some("assets/archive/"), None).expect("search");
        let names: Vec<&str> = archive.blobs().map(|b| b.name.as_str()).collect();
        assert_eq!(names, [".keep", "b.txt"]);

        gateway.remove(&["assets/notes/", "assets/archive/"]).expect("remove");
        let root = gateway.search(Some("assets"), None).expect("search");
        assert_eq!(root.total_count, 0);
    }

    #[test]
    fn test_blocking_absolute_url() {
        assert_eq!(
            blocking().absolute_url("assets/a.txt"),
            "http://localhost/blobs/assets/a.txt"
        );
    }
}
