//! The blob gateway: URL-addressed file and folder operations over any
//! [`BlobBackend`].

use std::pin::pin;
use std::sync::Arc;

use bytes::Bytes;
use futures::future::{self, BoxFuture};
use futures::{FutureExt, Stream, StreamExt, TryStreamExt, stream};
use tracing::{debug, info, instrument, warn};

use super::error::{AssetError, BatchError, BatchFailure};
use super::locator::{BlobLocation, UrlLocator, encode_segment};
use super::mime::{GuessMimeResolver, MimeResolver};
use super::policy::ExtensionPolicy;
use super::resolver::{UrlResolver, combine};
use super::types::{BlobEntry, BlobEntrySearchResult, BlobFolder, BlobInfo};
use crate::storage::{
    self, BlobBackend, BlobReader, BlobWriter, ContainerInfo, ListItem, ListMode, ObjectMeta,
    StorageConfig, StorageError, WriteOptions,
};

/// Cache-Control stored with every uploaded blob (7 days).
pub const CACHE_CONTROL: &str = "public, max-age=604800";

/// Zero-byte object that keeps an otherwise empty folder listable.
pub const FOLDER_MARKER: &str = ".keep";

/// Pair a batch task with its target. A fn item (not a closure) so it stays
/// generic over the task lifetime, keeping `fan_out` futures `Send`.
fn tag_outcome<'a>(
    (target, task): (String, BoxFuture<'a, Result<(), AssetError>>),
) -> future::Map<BoxFuture<'a, Result<(), AssetError>>, impl FnOnce(Result<(), AssetError>) -> (String, Result<(), AssetError>)>
{
    task.map(move |outcome| (target, outcome))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Transfer {
    Copy,
    Move,
}

impl Transfer {
    fn operation(self) -> &'static str {
        match self {
            Self::Copy => "copy",
            Self::Move => "move",
        }
    }
}

/// URL-addressed blob storage with emulated folders.
#[derive(Clone)]
pub struct BlobGateway {
    backend: Arc<dyn BlobBackend>,
    locator: UrlLocator,
    resolver: UrlResolver,
    policy: Arc<ExtensionPolicy>,
    mime: Arc<dyn MimeResolver>,
    max_concurrency: usize,
}

impl BlobGateway {
    /// Connect to the configured provider and build a gateway over it.
    pub fn from_config(config: &StorageConfig) -> Result<Self, StorageError> {
        let backend = storage::connect(&config.provider)?;
        Ok(Self::new(backend, config))
    }

    /// Build a gateway over an existing backend.
    #[must_use]
    pub fn new(backend: Arc<dyn BlobBackend>, config: &StorageConfig) -> Self {
        let endpoint = backend.public_endpoint().to_string();
        let cdn_url = config.cdn_url.as_deref();

        let mut locator = UrlLocator::new().with_base_url(&endpoint);
        if let Some(cdn) = cdn_url {
            locator = locator.with_base_url(cdn);
        }

        info!(
            provider = backend.provider_name(),
            endpoint = %endpoint,
            cdn = cdn_url.unwrap_or("-"),
            "blob gateway ready"
        );

        Self {
            resolver: UrlResolver::new(&endpoint, cdn_url),
            locator,
            policy: Arc::new(ExtensionPolicy::new(&config.extension_blacklist)),
            mime: Arc::new(GuessMimeResolver),
            max_concurrency: config.max_concurrency.max(1),
            backend,
        }
    }

    /// Replace the content type resolver.
    #[must_use]
    pub fn with_mime_resolver(mut self, mime: Arc<dyn MimeResolver>) -> Self {
        self.mime = mime;
        self
    }

    /// The underlying backend.
    #[must_use]
    pub fn backend(&self) -> &Arc<dyn BlobBackend> {
        &self.backend
    }

    /// URL to location mapping used by this gateway.
    #[must_use]
    pub fn locator(&self) -> &UrlLocator {
        &self.locator
    }

    /// Public URL builder used by this gateway.
    #[must_use]
    pub fn resolver(&self) -> &UrlResolver {
        &self.resolver
    }

    // ========================================================================
    // Single-blob operations
    // ========================================================================

    /// Absolute public URL of a relative key (`container/path`).
    #[must_use]
    pub fn absolute_url(&self, key: &str) -> String {
        self.resolver.resolve(key)
    }

    /// Whether the blob (or, for a container URL, the container) exists.
    ///
    /// Absence is `Ok(false)`. Any other failure is logged and returned, so a
    /// provider outage is never mistaken for a missing blob.
    #[instrument(skip(self))]
    pub async fn exists(&self, url: &str) -> Result<bool, AssetError> {
        let location = self.locator.locate(url)?;
        let result = match location.key() {
            Some(key) => self.backend.exists(location.container(), key).await,
            None => self
                .backend
                .container_info(location.container())
                .await
                .map(|info| info.is_some()),
        };

        match result {
            Ok(found) => Ok(found),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => {
                warn!(url, error = %e, "existence check failed");
                Err(e.into())
            }
        }
    }

    /// Metadata of a blob.
    pub async fn blob_info(&self, url: &str) -> Result<BlobInfo, AssetError> {
        let (location, key) = self.file_location(url)?;
        let meta = self
            .backend
            .stat(location.container(), &key)
            .await?
            .ok_or_else(|| AssetError::NotFound(url.to_string()))?;
        Ok(self.blob_info_from(location.container(), &meta))
    }

    /// Open a streaming reader.
    pub async fn open_read(&self, url: &str) -> Result<BlobReader, AssetError> {
        let (location, key) = self.file_location(url)?;
        self.backend
            .open_read(location.container(), &key)
            .await
            .map_err(|e| match e {
                StorageError::NotFound { .. } => AssetError::NotFound(url.to_string()),
                other => other.into(),
            })
    }

    /// Open a writer. The container is created if needed; the upload is
    /// committed when the writer is closed.
    #[instrument(skip(self))]
    pub async fn open_write(&self, url: &str) -> Result<BlobWriter, AssetError> {
        let (location, key) = self.file_location(url)?;
        self.policy.ensure_allowed(&key)?;

        let content_type = self.mime.resolve_content_type(file_name(&key));
        let options = WriteOptions::new()
            .with_content_type(content_type)
            .with_cache_control(CACHE_CONTROL);

        debug!(container = location.container(), key = %key, "opening blob writer");
        Ok(self
            .backend
            .open_write(location.container(), &key, options)
            .await?)
    }

    /// Upload a whole blob and return its size.
    pub async fn write(&self, url: &str, data: Bytes) -> Result<u64, AssetError> {
        let mut writer = self.open_write(url).await?;
        if !data.is_empty()
            && let Err(e) = writer.write(data).await
        {
            let _ = writer.abort().await;
            return Err(e.into());
        }
        Ok(writer.close().await?)
    }

    // ========================================================================
    // Folder operations
    // ========================================================================

    /// List containers (no `folder_url`) or the direct children of a folder.
    ///
    /// `keyword` is appended to the folder prefix, so it matches names that
    /// start with it. A missing container yields an empty result.
    #[instrument(skip(self))]
    pub async fn search(
        &self,
        folder_url: Option<&str>,
        keyword: Option<&str>,
    ) -> Result<BlobEntrySearchResult, AssetError> {
        let mut result = BlobEntrySearchResult::default();

        let Some(folder_url) = folder_url.filter(|u| !u.trim().is_empty()) else {
            for container in self.backend.list_containers().await? {
                result.push(BlobEntry::Folder(self.container_folder(&container)));
            }
            return Ok(result);
        };

        let location = self.locator.locate(folder_url)?;
        let Some(container) = self.backend.container_info(location.container()).await? else {
            debug!(container = location.container(), "search in missing container");
            return Ok(result);
        };

        let mut prefix = location.directory().unwrap_or_default();
        if let Some(keyword) = keyword.map(str::trim).filter(|k| !k.is_empty()) {
            prefix.push_str(keyword);
        }

        let mut listing = self
            .backend
            .list(&container.name, &prefix, ListMode::Hierarchy)
            .await?;
        while let Some(item) = listing.try_next().await? {
            match item {
                ListItem::Prefix(folder_prefix) => {
                    result.push(BlobEntry::Folder(self.prefix_folder(&container, &folder_prefix)));
                }
                ListItem::Object(meta) => {
                    let info = self.blob_info_from(&container.name, &meta);
                    if !info.name.is_empty() {
                        result.push(BlobEntry::Blob(info));
                    }
                }
            }
        }

        Ok(result)
    }

    /// Create a container, or a folder inside one by writing a marker object.
    #[instrument(skip(self), fields(name = %folder.name))]
    pub async fn create_folder(&self, folder: &BlobFolder) -> Result<(), AssetError> {
        let name = encode_segment(folder.name.trim_matches(['/', '\\']));
        let path = match folder.parent_url.as_deref().filter(|p| !p.trim().is_empty()) {
            Some(parent) => combine(parent, &name),
            None => name,
        };

        let location = self.locator.locate(&path)?;
        self.backend.create_container(location.container()).await?;

        if let Some(key) = location.key() {
            let marker = format!("{}/{FOLDER_MARKER}", key.trim_end_matches('/'));
            self.backend
                .put(location.container(), &marker, Bytes::new(), WriteOptions::new())
                .await?;
            info!(container = location.container(), folder = key, "folder created");
        }
        Ok(())
    }

    /// Delete blobs, folders (everything under the prefix) or whole
    /// containers. Every URL is attempted; failures are aggregated.
    #[instrument(skip(self, urls))]
    pub async fn remove<S: AsRef<str>>(&self, urls: &[S]) -> Result<(), AssetError> {
        let mut total = 0;
        let mut failures = Vec::new();

        for url in urls.iter().map(|u| u.as_ref()).filter(|u| !u.trim().is_empty()) {
            total += 1;
            if let Err(error) = self.remove_one(url).await {
                warn!(url, error = %error, "remove failed");
                failures.push(BatchFailure {
                    target: url.to_string(),
                    error,
                });
            }
        }

        BatchError::into_result("remove", total, failures)
    }

    async fn remove_one(&self, url: &str) -> Result<(), AssetError> {
        let location = self.locator.locate(url)?;
        let container = location.container();
        let is_folder = self.locator.is_folder(url)?;

        match location.key() {
            None => {
                let deleted = self.backend.delete_container(container).await?;
                info!(container, deleted, "container removed");
                Ok(())
            }
            Some(_) if is_folder => {
                let prefix = location.directory().unwrap_or_default();
                self.remove_prefix(container, &prefix).await
            }
            Some(key) => Ok(self.backend.delete(container, key).await?),
        }
    }

    async fn remove_prefix(&self, container: &str, prefix: &str) -> Result<(), AssetError> {
        let listing = match self.backend.list(container, prefix, ListMode::Flat).await {
            Ok(listing) => listing,
            Err(e) if e.is_not_found() => return Ok(()),
            Err(e) => return Err(e.into()),
        };

        let tasks = listing.map(move |item| match item {
            Ok(item) => {
                let key = item.key().to_string();
                let task = async move {
                    self.backend
                        .delete(container, &key)
                        .await
                        .map_err(AssetError::from)
                };
                (item.key().to_string(), task.boxed())
            }
            Err(e) => (
                format!("{container}/{prefix}"),
                future::ready(Err(AssetError::from(e))).boxed(),
            ),
        });

        self.fan_out("remove", tasks).await
    }

    /// Move a blob, or every blob under a folder, within one container.
    pub async fn move_blob(&self, old_url: &str, new_url: &str) -> Result<(), AssetError> {
        self.transfer(old_url, new_url, Transfer::Move).await
    }

    /// Copy a blob, or every blob under a folder, within one container.
    pub async fn copy_blob(&self, old_url: &str, new_url: &str) -> Result<(), AssetError> {
        self.transfer(old_url, new_url, Transfer::Copy).await
    }

    #[instrument(skip(self))]
    async fn transfer(&self, old_url: &str, new_url: &str, mode: Transfer) -> Result<(), AssetError> {
        let source = self.locator.locate(old_url)?;
        let target = self.locator.locate(new_url)?;
        if source.container() != target.container() {
            return Err(AssetError::validation(format!(
                "cannot {} between containers ('{}' to '{}')",
                mode.operation(),
                source.container(),
                target.container()
            )));
        }
        let container = source.container();

        let is_folder = self.locator.is_folder(old_url)?;
        let (old_path, new_path) = if is_folder {
            (source.directory(), target.directory())
        } else {
            (source.key().map(String::from), target.key().map(String::from))
        };
        let (Some(old_path), Some(new_path)) = (old_path, new_path) else {
            return Err(AssetError::validation(format!(
                "cannot {} a container root",
                mode.operation()
            )));
        };

        let plan: Vec<(String, String)> = if is_folder {
            self.backend
                .list(container, &old_path, ListMode::Flat)
                .await?
                .try_filter_map(|item| {
                    let pair = match item {
                        ListItem::Object(meta) => meta
                            .key
                            .strip_prefix(old_path.as_str())
                            .map(|rest| (meta.key.clone(), format!("{new_path}{rest}"))),
                        ListItem::Prefix(_) => None,
                    };
                    future::ready(Ok(pair))
                })
                .try_collect()
                .await?
        } else {
            vec![(old_path, new_path)]
        };

        for (_, destination) in &plan {
            self.policy.ensure_allowed(destination)?;
        }

        info!(
            container,
            from = old_url,
            to = new_url,
            objects = plan.len(),
            operation = mode.operation(),
            "transferring blobs"
        );

        let tasks = stream::iter(plan).map(move |(from, to)| {
            let target = from.clone();
            (target, self.transfer_object(container, from, to, mode).boxed())
        });
        self.fan_out(mode.operation(), tasks).await
    }

    async fn transfer_object(
        &self,
        container: &str,
        from: String,
        to: String,
        mode: Transfer,
    ) -> Result<(), AssetError> {
        if self.backend.exists(container, &to).await? {
            debug!(container, to = %to, "destination exists, skipping");
            return Ok(());
        }
        if !self.backend.exists(container, &from).await? {
            debug!(container, from = %from, "source vanished, skipping");
            return Ok(());
        }

        self.backend.copy(container, &from, &to).await?;
        if mode == Transfer::Move {
            self.backend.delete(container, &from).await?;
        }
        Ok(())
    }

    /// Run per-object tasks with bounded concurrency and aggregate failures.
    async fn fan_out<'a, S>(&self, operation: &'static str, tasks: S) -> Result<(), AssetError>
    where
        S: Stream<Item = (String, BoxFuture<'a, Result<(), AssetError>>)>,
    {
        let mut total = 0;
        let mut failures = Vec::new();

        let outcomes = tasks
            .map(tag_outcome)
            .buffer_unordered(self.max_concurrency);
        let mut outcomes = pin!(outcomes);

        while let Some((target, outcome)) = outcomes.next().await {
            total += 1;
            if let Err(error) = outcome {
                warn!(operation, target = %target, error = %error, "batch item failed");
                failures.push(BatchFailure { target, error });
            }
        }

        if total > 0 {
            debug!(operation, total, failed = failures.len(), "batch finished");
        }
        BatchError::into_result(operation, total, failures)
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    fn file_location(&self, url: &str) -> Result<(BlobLocation, String), AssetError> {
        let location = self.locator.locate(url)?;
        let key = location
            .key()
            .map(String::from)
            .ok_or_else(|| AssetError::validation(format!("cannot get file path from URL '{url}'")))?;
        Ok((location, key))
    }

    fn blob_info_from(&self, container: &str, meta: &ObjectMeta) -> BlobInfo {
        let name = file_name(&meta.key).to_string();
        let content_type = meta
            .content_type
            .clone()
            .filter(|ct| !ct.is_empty())
            .unwrap_or_else(|| self.mime.resolve_content_type(&name));

        BlobInfo {
            url: self.resolver.url_of(container, Some(&meta.key)),
            relative_url: UrlResolver::relative_url(container, Some(&meta.key)),
            name,
            content_type,
            size: meta.size,
            created_date: meta.last_modified,
            modified_date: meta.last_modified,
        }
    }

    fn container_folder(&self, container: &ContainerInfo) -> BlobFolder {
        BlobFolder {
            name: container.name.clone(),
            url: self.resolver.url_of(&container.name, None),
            relative_url: UrlResolver::relative_url(&container.name, None),
            parent_url: None,
            created_date: container.last_modified,
            modified_date: container.last_modified,
        }
    }

    fn prefix_folder(&self, container: &ContainerInfo, prefix: &str) -> BlobFolder {
        let segments: Vec<&str> = prefix.split('/').filter(|s| !s.is_empty()).collect();
        let name = segments.last().copied().unwrap_or_default().to_string();
        let parent = segments[..segments.len().saturating_sub(1)].join("/");

        BlobFolder {
            name,
            url: self.resolver.url_of(&container.name, Some(prefix)),
            relative_url: UrlResolver::relative_url(&container.name, Some(prefix)),
            parent_url: Some(self.resolver.url_of(&container.name, Some(&parent))),
            created_date: container.last_modified,
            modified_date: container.last_modified,
        }
    }
}

impl std::fmt::Debug for BlobGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlobGateway")
            .field("provider", &self.backend.provider_name())
            .field("base_url", &self.resolver.base_url())
            .field("max_concurrency", &self.max_concurrency)
            .finish_non_exhaustive()
    }
}

fn file_name(key: &str) -> &str {
    key.rsplit('/').next().unwrap_or(key)
}

#[cfg(test)]
#[path = "gateway_tests.rs"]
mod tests;
