//! Core logic for Blobgate.
//!
//! This crate holds the storage-agnostic blob gateway and the provider
//! backends behind it. It has no web dependencies.
//!
//! # Modules
//!
//! - `assets` - URL mapping, folder emulation and the [`assets::BlobGateway`]
//! - `storage` - The [`storage::BlobBackend`] contract with Azure Blob, S3 and memory backends

pub mod assets;
pub mod storage;
