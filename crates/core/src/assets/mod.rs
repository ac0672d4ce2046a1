//! URL-addressed blob storage with virtual folders.
//!
//! This module provides the gateway applications talk to:
//! - URL to `(container, key)` mapping, with CDN and endpoint base paths
//! - Public URL generation
//! - Upload extension policy
//! - Folder emulation, recursive move/copy/remove with aggregated failures
//! - A blocking facade for synchronous callers

mod blocking;
mod error;
mod gateway;
mod locator;
mod mime;
mod policy;
mod resolver;
mod types;

pub use blocking::BlockingBlobGateway;
pub use error::{AssetError, BatchError, BatchFailure};
pub use gateway::{BlobGateway, CACHE_CONTROL, FOLDER_MARKER};
pub use locator::{
    BlobLocation, UrlLocator, encode_key, encode_segment, escape, escape_segment, unescape,
};
pub use mime::{GuessMimeResolver, MimeResolver};
pub use policy::ExtensionPolicy;
pub use resolver::{UrlResolver, combine};
pub use types::{BlobEntry, BlobEntrySearchResult, BlobFolder, BlobInfo};
