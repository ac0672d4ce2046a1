//! Entries returned by the gateway.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A stored file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobInfo {
    /// Absolute public URL.
    pub url: String,
    /// `/{container}/{key}`.
    pub relative_url: String,
    /// Last path segment of the key.
    pub name: String,
    /// Content type.
    pub content_type: String,
    /// Size in bytes.
    pub size: u64,
    /// Creation time, when known.
    pub created_date: Option<DateTime<Utc>>,
    /// Last modification time, when known.
    pub modified_date: Option<DateTime<Utc>>,
}

/// A container or a virtual folder (a key prefix ending in `/`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobFolder {
    /// Folder name (last segment).
    pub name: String,
    /// Absolute public URL.
    #[serde(default)]
    pub url: String,
    /// `/{container}[/{prefix}]`.
    #[serde(default)]
    pub relative_url: String,
    /// URL of the enclosing folder or container; `None` for containers.
    #[serde(default)]
    pub parent_url: Option<String>,
    /// Creation time, when known.
    #[serde(default)]
    pub created_date: Option<DateTime<Utc>>,
    /// Last modification time, when known.
    #[serde(default)]
    pub modified_date: Option<DateTime<Utc>>,
}

impl BlobFolder {
    /// Folder to be created under `parent_url` (a container at the root when
    /// `None`).
    #[must_use]
    pub fn new(name: impl Into<String>, parent_url: Option<String>) -> Self {
        Self {
            name: name.into(),
            parent_url,
            ..Self::default()
        }
    }
}

/// One search result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BlobEntry {
    /// A file.
    Blob(BlobInfo),
    /// A container or folder.
    Folder(BlobFolder),
}

impl BlobEntry {
    /// Entry name.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Blob(blob) => &blob.name,
            Self::Folder(folder) => &folder.name,
        }
    }

    /// Absolute URL of the entry.
    #[must_use]
    pub fn url(&self) -> &str {
        match self {
            Self::Blob(blob) => &blob.url,
            Self::Folder(folder) => &folder.url,
        }
    }
}

/// Folders and files found by a search.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BlobEntrySearchResult {
    /// Entries in listing order.
    pub results: Vec<BlobEntry>,
    /// Number of entries in `results`.
    pub total_count: usize,
}

impl BlobEntrySearchResult {
    pub(crate) fn push(&mut self, entry: BlobEntry) {
        self.results.push(entry);
        self.total_count = self.results.len();
    }

    /// Folder entries only.
    pub fn folders(&self) -> impl Iterator<Item = &BlobFolder> {
        self.results.iter().filter_map(|entry| match entry {
            BlobEntry::Folder(folder) => Some(folder),
            BlobEntry::Blob(_) => None,
        })
    }

    /// File entries only.
    pub fn blobs(&self) -> impl Iterator<Item = &BlobInfo> {
        self.results.iter().filter_map(|entry| match entry {
            BlobEntry::Blob(blob) => Some(blob),
            BlobEntry::Folder(_) => None,
        })
    }
}
