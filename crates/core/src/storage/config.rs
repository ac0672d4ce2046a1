//! Storage configuration types.

use std::fmt;

use blobgate_shared::config::{AssetProvider, AssetsConfig};
use serde::{Deserialize, Serialize};

use super::error::StorageError;

/// Storage provider configuration.
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StorageProvider {
    /// Azure Blob Storage (or the Azurite emulator).
    AzureBlob {
        /// Azure storage connection string.
        connection_string: String,
    },
    /// S3-compatible storage: AWS S3, MinIO.
    S3 {
        /// `Endpoint=...;AccessKey=...;SecretKey=...[;Region=...]`
        connection_string: String,
    },
    /// In-process storage (development and tests only).
    Memory,
}

impl StorageProvider {
    /// Create Azure Blob Storage provider.
    #[must_use]
    pub fn azure_blob(connection_string: impl Into<String>) -> Self {
        Self::AzureBlob {
            connection_string: connection_string.into(),
        }
    }

    /// Create S3-compatible provider.
    #[must_use]
    pub fn s3(connection_string: impl Into<String>) -> Self {
        Self::S3 {
            connection_string: connection_string.into(),
        }
    }

    /// Create in-process provider.
    #[must_use]
    pub fn memory() -> Self {
        Self::Memory
    }

    /// Get the provider name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::AzureBlob { .. } => "azure_blob",
            Self::S3 { .. } => "s3",
            Self::Memory => "memory",
        }
    }
}

impl fmt::Debug for StorageProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageProvider")
            .field("type", &self.name())
            .finish_non_exhaustive()
    }
}

/// Gateway configuration.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Storage provider configuration.
    pub provider: StorageProvider,
    /// Public base URL replacing the provider endpoint in generated links.
    pub cdn_url: Option<String>,
    /// File extensions that may not be written.
    pub extension_blacklist: Vec<String>,
    /// Upper bound on concurrent per-object operations in batch work.
    pub max_concurrency: usize,
}

impl StorageConfig {
    /// Default concurrency for folder copy/move/remove.
    pub const DEFAULT_MAX_CONCURRENCY: usize = 16;

    /// Create a new storage config with default settings.
    #[must_use]
    pub fn new(provider: StorageProvider) -> Self {
        Self {
            provider,
            cdn_url: None,
            extension_blacklist: Self::default_extension_blacklist(),
            max_concurrency: Self::DEFAULT_MAX_CONCURRENCY,
        }
    }

    /// Set the CDN base URL. Blank values are ignored.
    #[must_use]
    pub fn with_cdn_url(mut self, cdn_url: impl Into<String>) -> Self {
        let cdn_url = cdn_url.into();
        self.cdn_url = (!cdn_url.trim().is_empty()).then_some(cdn_url);
        self
    }

    /// Set the extension blacklist.
    #[must_use]
    pub fn with_extension_blacklist(mut self, extensions: Vec<String>) -> Self {
        self.extension_blacklist = extensions;
        self
    }

    /// Set the batch concurrency. Zero is raised to one.
    #[must_use]
    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.max(1);
        self
    }

    /// Executable and script types refused by default.
    #[must_use]
    pub fn default_extension_blacklist() -> Vec<String> {
        ["exe", "dll", "bat", "cmd", "com", "msi", "ps1", "vbs", "scr"]
            .into_iter()
            .map(String::from)
            .collect()
    }
}

impl TryFrom<&AssetsConfig> for StorageConfig {
    type Error = StorageError;

    fn try_from(assets: &AssetsConfig) -> Result<Self, Self::Error> {
        let options = assets.active_options();
        let connection_string = || {
            options
                .map(|o| o.connection_string.clone())
                .filter(|cs| !cs.trim().is_empty())
                .ok_or_else(|| {
                    StorageError::configuration(format!(
                        "no connection string configured for provider '{}'",
                        assets.provider.name()
                    ))
                })
        };

        let provider = match assets.provider {
            AssetProvider::AzureBlob => StorageProvider::azure_blob(connection_string()?),
            AssetProvider::S3 => StorageProvider::s3(connection_string()?),
            AssetProvider::Memory => StorageProvider::memory(),
        };

        let mut config = Self::new(provider)
            .with_extension_blacklist(assets.file_extensions_blacklist.clone())
            .with_max_concurrency(assets.max_concurrency);
        if let Some(cdn_url) = options.and_then(|o| o.cdn_url.clone()) {
            config = config.with_cdn_url(cdn_url);
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blobgate_shared::config::BlobStorageOptions;

    fn assets(provider: AssetProvider) -> AssetsConfig {
        AssetsConfig {
            provider,
            azure_blob_storage: Some(BlobStorageOptions {
                connection_string: "UseDevelopmentStorage=true".to_string(),
                cdn_url: Some("https://cdn.example.com".to_string()),
            }),
            s3_blob_storage: None,
            file_extensions_blacklist: vec!["exe".to_string()],
            max_concurrency: 4,
        }
    }

    #[test]
    fn test_storage_provider_names() {
        assert_eq!(StorageProvider::azure_blob("x").name(), "azure_blob");
        assert_eq!(StorageProvider::s3("x").name(), "s3");
        assert_eq!(StorageProvider::memory().name(), "memory");
    }

    #[test]
    fn test_storage_config_defaults() {
        let config = StorageConfig::new(StorageProvider::memory());
        assert_eq!(config.max_concurrency, StorageConfig::DEFAULT_MAX_CONCURRENCY);
        assert!(config.cdn_url.is_none());
        assert!(config.extension_blacklist.contains(&"exe".to_string()));
    }

    #[test]
    fn test_blank_cdn_is_ignored() {
        let config = StorageConfig::new(StorageProvider::memory()).with_cdn_url("  ");
        assert!(config.cdn_url.is_none());
    }

    #[test]
    fn test_debug_hides_connection_string() {
        let provider = StorageProvider::azure_blob("AccountName=a;AccountKey=topsecret");
        assert!(!format!("{provider:?}").contains("topsecret"));
    }

    #[test]
    fn test_from_assets_config() {
        let config = StorageConfig::try_from(&assets(AssetProvider::AzureBlob)).expect("valid");
        assert_eq!(config.provider.name(), "azure_blob");
        assert_eq!(config.cdn_url.as_deref(), Some("https://cdn.example.com"));
        assert_eq!(config.extension_blacklist, vec!["exe".to_string()]);
        assert_eq!(config.max_concurrency, 4);
    }

    #[test]
    fn test_from_assets_config_missing_options() {
        let result = StorageConfig::try_from(&assets(AssetProvider::S3));
        assert!(matches!(result, Err(StorageError::Configuration(_))));
    }

    #[test]
    fn test_from_assets_config_memory_needs_no_options() {
        let config = StorageConfig::try_from(&assets(AssetProvider::Memory)).expect("valid");
        assert_eq!(config.provider.name(), "memory");
    }
}
