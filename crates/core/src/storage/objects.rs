//! Object operations shared by every OpenDAL-backed provider.

use std::collections::HashSet;
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use futures::{StreamExt, TryStreamExt, future};
use opendal::{Entry, ErrorKind, Metadata, Operator};

use super::backend::{ListItem, ListMode, ListStream, ObjectMeta, WriteOptions};
use super::error::StorageError;
use super::reader::BlobReader;
use super::writer::BlobWriter;

pub(crate) fn object_meta(key: &str, meta: &Metadata) -> ObjectMeta {
    ObjectMeta {
        key: key.to_string(),
        size: meta.content_length(),
        content_type: meta.content_type().map(String::from),
        last_modified: meta
            .last_modified()
            .map(|ts| DateTime::<Utc>::from(SystemTime::from(ts))),
    }
}

pub(crate) async fn stat(op: &Operator, key: &str) -> Result<Option<ObjectMeta>, StorageError> {
    match op.stat(key).await {
        Ok(meta) if meta.is_dir() => Ok(None),
        Ok(meta) => Ok(Some(object_meta(key, &meta))),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(StorageError::from(e)),
    }
}

pub(crate) async fn open_read(op: &Operator, key: &str) -> Result<BlobReader, StorageError> {
    let meta = stat(op, key)
        .await?
        .ok_or_else(|| StorageError::not_found(key))?;

    let reader = op.reader(key).await.map_err(StorageError::with_key(key))?;
    let owned_key = key.to_string();
    let stream = reader
        .into_bytes_stream(..)
        .await
        .map_err(StorageError::with_key(key))?
        .map_err(move |e| StorageError::operation(format!("error reading '{owned_key}': {e}")));

    Ok(BlobReader::new(meta, stream.boxed()))
}

pub(crate) async fn open_write(
    op: &Operator,
    key: &str,
    options: &WriteOptions,
) -> Result<BlobWriter, StorageError> {
    let capability = op.info().full_capability();
    let mut request = op.writer_with(key);
    if let Some(content_type) = options.content_type.as_deref()
        && capability.write_with_content_type
    {
        request = request.content_type(content_type);
    }
    if let Some(cache_control) = options.cache_control.as_deref()
        && capability.write_with_cache_control
    {
        request = request.cache_control(cache_control);
    }

    let writer = request.await.map_err(StorageError::with_key(key))?;
    Ok(BlobWriter::new(key, writer))
}

/// Copy server-side when the provider supports it, else read and rewrite.
pub(crate) async fn copy(op: &Operator, from: &str, to: &str) -> Result<(), StorageError> {
    if op.info().full_capability().copy {
        return op.copy(from, to).await.map_err(StorageError::with_key(from));
    }

    let meta = op.stat(from).await.map_err(StorageError::with_key(from))?;
    let data = op.read(from).await.map_err(StorageError::with_key(from))?;
    let mut options = WriteOptions::new();
    if let Some(content_type) = meta.content_type() {
        options = options.with_content_type(content_type);
    }
    if let Some(cache_control) = meta.cache_control() {
        options = options.with_cache_control(cache_control);
    }

    let mut writer = open_write(op, to, &options).await?;
    writer.write(data.to_bytes()).await?;
    writer.close().await?;
    Ok(())
}

pub(crate) async fn delete(op: &Operator, key: &str) -> Result<(), StorageError> {
    op.delete(key).await.map_err(StorageError::from)
}

/// Delete every object (and directory marker) of the operator's root.
pub(crate) async fn purge(op: &Operator) -> Result<(), StorageError> {
    let mut lister = op
        .lister_with("")
        .recursive(true)
        .await
        .map_err(StorageError::from)?;
    while let Some(entry) = lister.try_next().await.map_err(StorageError::from)? {
        if entry.path() != "/" {
            delete(op, entry.path()).await?;
        }
    }
    Ok(())
}

/// List with the provider's native delimiter support.
pub(crate) async fn list(
    op: &Operator,
    prefix: &str,
    mode: ListMode,
) -> Result<ListStream, StorageError> {
    let lister = op
        .lister_with(prefix)
        .recursive(mode == ListMode::Flat)
        .await
        .map_err(StorageError::with_key(prefix))?;

    let prefix = prefix.to_string();
    let stream = lister
        .map_err(StorageError::from)
        .try_filter_map(move |entry| future::ready(Ok(list_item(&prefix, &entry))));

    Ok(stream.boxed())
}

fn list_item(prefix: &str, entry: &Entry) -> Option<ListItem> {
    let path = entry.path();
    if path == prefix || path == "/" || !path.starts_with(prefix) {
        return None;
    }
    if entry.metadata().is_dir() {
        return Some(ListItem::Prefix(path.to_string()));
    }
    Some(ListItem::Object(object_meta(path, entry.metadata())))
}

/// List by scanning the whole operator and folding keys into a hierarchy
/// client-side. Used by providers without prefix-scoped listing.
pub(crate) async fn list_by_scan(
    op: &Operator,
    prefix: &str,
    mode: ListMode,
) -> Result<ListStream, StorageError> {
    let lister = op
        .lister_with("")
        .recursive(true)
        .await
        .map_err(StorageError::from)?;

    let prefix = prefix.to_string();
    let mut seen_prefixes = HashSet::new();
    let stream = lister.map_err(StorageError::from).try_filter_map(move |entry| {
        let path = entry.path();
        let item = if entry.metadata().is_dir() || path == prefix || !path.starts_with(&prefix) {
            None
        } else {
            match (mode, path[prefix.len()..].find('/')) {
                (ListMode::Hierarchy, Some(pos)) => {
                    let common = &path[..prefix.len() + pos + 1];
                    seen_prefixes
                        .insert(common.to_string())
                        .then(|| ListItem::Prefix(common.to_string()))
                }
                _ => Some(ListItem::Object(object_meta(path, entry.metadata()))),
            }
        };
        future::ready(Ok(item))
    });

    Ok(stream.boxed())
}

/// Extension trait for pipe operator.
pub(crate) trait Pipe: Sized {
    fn pipe<F, R>(self, f: F) -> R
    where
        F: FnOnce(Self) -> R,
    {
        f(self)
    }
}

impl<T> Pipe for T {}

#[cfg(test)]
mod tests {
    use super::*;
    use opendal::services;

    async fn seeded() -> Operator {
        let op = Operator::new(services::Memory::default())
            .expect("memory operator")
            .finish();
        for key in ["a.txt", "docs/b.txt", "docs/deep/c.txt", "docs/deep/d.txt", "img/e.png"] {
            op.write(key, key.as_bytes().to_vec()).await.expect("seed");
        }
        op
    }

    async fn keys(stream: ListStream) -> Vec<String> {
        let mut keys: Vec<String> = stream
            .map_ok(|item| match item {
                ListItem::Prefix(p) => format!("[{p}]"),
                ListItem::Object(meta) => meta.key,
            })
            .try_collect()
            .await
            .expect("listing");
        keys.sort();
        keys
    }

    #[tokio::test]
    async fn test_scan_hierarchy_at_root() {
        let op = seeded().await;
        let listed = keys(list_by_scan(&op, "", ListMode::Hierarchy).await.expect("list")).await;
        assert_eq!(listed, vec!["[docs/]", "[img/]", "a.txt"]);
    }

    #[tokio::test]
    async fn test_scan_hierarchy_nested() {
        let op = seeded().await;
        let listed = keys(list_by_scan(&op, "docs/", ListMode::Hierarchy).await.expect("list")).await;
        assert_eq!(listed, vec!["[docs/deep/]", "docs/b.txt"]);
    }

    #[tokio::test]
    async fn test_scan_flat_with_partial_prefix() {
        let op = seeded().await;
        let listed = keys(list_by_scan(&op, "docs/de", ListMode::Flat).await.expect("list")).await;
        assert_eq!(listed, vec!["docs/deep/c.txt", "docs/deep/d.txt"]);
    }

    #[tokio::test]
    async fn test_stat_absent_is_none() {
        let op = seeded().await;
        assert!(stat(&op, "missing.txt").await.expect("stat").is_none());
        let meta = stat(&op, "a.txt").await.expect("stat").expect("present");
        assert_eq!(meta.size, 5);
    }

    #[tokio::test]
    async fn test_copy_preserves_content() {
        let op = seeded().await;
        copy(&op, "docs/b.txt", "copies/b.txt").await.expect("copy");
        let data = op.read("copies/b.txt").await.expect("read").to_vec();
        assert_eq!(data, b"docs/b.txt");
        assert!(op.exists("docs/b.txt").await.expect("exists"));
    }
}
