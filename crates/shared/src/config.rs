//! Application configuration management.

use std::fmt;

use serde::Deserialize;
use thiserror::Error;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Asset storage configuration.
    pub assets: AssetsConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Largest accepted upload body in bytes.
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_max_upload_bytes() -> usize {
    256 * 1024 * 1024
}

/// Which storage provider backs the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetProvider {
    /// Azure Blob Storage.
    AzureBlob,
    /// S3-compatible storage.
    S3,
    /// In-process storage.
    Memory,
}

impl AssetProvider {
    /// Configuration name of the provider.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::AzureBlob => "azure_blob",
            Self::S3 => "s3",
            Self::Memory => "memory",
        }
    }
}

/// Connection settings of one provider.
#[derive(Clone, Default, Deserialize)]
pub struct BlobStorageOptions {
    /// Provider connection string.
    #[serde(default)]
    pub connection_string: String,
    /// Public base URL replacing the provider endpoint in generated links.
    #[serde(default)]
    pub cdn_url: Option<String>,
}

impl fmt::Debug for BlobStorageOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlobStorageOptions")
            .field("connection_string", &"***")
            .field("cdn_url", &self.cdn_url)
            .finish()
    }
}

/// Asset storage configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AssetsConfig {
    /// Active provider.
    pub provider: AssetProvider,
    /// Settings used when `provider = "azure_blob"`.
    #[serde(default)]
    pub azure_blob_storage: Option<BlobStorageOptions>,
    /// Settings used when `provider = "s3"`.
    #[serde(default)]
    pub s3_blob_storage: Option<BlobStorageOptions>,
    /// File extensions that may not be uploaded, with or without a leading dot.
    #[serde(default)]
    pub file_extensions_blacklist: Vec<String>,
    /// Concurrency of folder-wide copy, move and remove.
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
}

fn default_max_concurrency() -> usize {
    16
}

impl AssetsConfig {
    /// Settings of the active provider, if any are configured.
    #[must_use]
    pub fn active_options(&self) -> Option<&BlobStorageOptions> {
        match self.provider {
            AssetProvider::AzureBlob => self.azure_blob_storage.as_ref(),
            AssetProvider::S3 => self.s3_blob_storage.as_ref(),
            AssetProvider::Memory => None,
        }
    }
}

/// Configuration rejected at startup.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigValidationError {
    /// The active provider has no connection string.
    #[error("assets.{section}.connection_string is required for provider '{provider}'")]
    MissingConnectionString {
        /// Provider name.
        provider: &'static str,
        /// Config section that should hold the string.
        section: &'static str,
    },

    /// `max_concurrency` must allow at least one operation.
    #[error("assets.max_concurrency must be greater than zero")]
    InvalidConcurrency,

    /// The CDN URL is not an absolute http(s) URL.
    #[error("assets.{section}.cdn_url must start with http:// or https://")]
    InvalidCdnUrl {
        /// Config section holding the bad value.
        section: &'static str,
    },
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// Sources, later ones overriding earlier ones: `config/default`,
    /// `config/{RUN_MODE}`, then `BLOBGATE__`-prefixed environment variables
    /// (`BLOBGATE__ASSETS__PROVIDER=s3`).
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(
                config::Environment::with_prefix("BLOBGATE")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("assets.file_extensions_blacklist")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Check cross-field rules that serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        let assets = &self.assets;
        if assets.max_concurrency == 0 {
            return Err(ConfigValidationError::InvalidConcurrency);
        }

        let section = match assets.provider {
            AssetProvider::AzureBlob => "azure_blob_storage",
            AssetProvider::S3 => "s3_blob_storage",
            AssetProvider::Memory => return Ok(()),
        };

        let options = assets
            .active_options()
            .filter(|o| !o.connection_string.trim().is_empty())
            .ok_or(ConfigValidationError::MissingConnectionString {
                provider: assets.provider.name(),
                section,
            })?;

        if let Some(cdn) = options.cdn_url.as_deref().map(str::trim)
            && !cdn.is_empty()
            && !(cdn.starts_with("http://") || cdn.starts_with("https://"))
        {
            return Err(ConfigValidationError::InvalidCdnUrl { section });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_env<F: FnOnce()>(vars: &[(&str, Option<&str>)], f: F) {
        temp_env::with_vars(vars.to_vec(), f);
    }

    #[test]
    fn test_load_from_environment() {
        with_env(
            &[
                ("BLOBGATE__ASSETS__PROVIDER", Some("azure_blob")),
                (
                    "BLOBGATE__ASSETS__AZURE_BLOB_STORAGE__CONNECTION_STRING",
                    Some("UseDevelopmentStorage=true"),
                ),
                (
                    "BLOBGATE__ASSETS__AZURE_BLOB_STORAGE__CDN_URL",
                    Some("https://cdn.example.com"),
                ),
                ("BLOBGATE__ASSETS__FILE_EXTENSIONS_BLACKLIST", Some("exe,.bat")),
                ("BLOBGATE__SERVER__PORT", Some("9090")),
            ],
            || {
                let config = AppConfig::load().expect("config should load");
                assert_eq!(config.server.port, 9090);
                assert_eq!(config.assets.provider, AssetProvider::AzureBlob);
                assert_eq!(
                    config.assets.file_extensions_blacklist,
                    vec!["exe".to_string(), ".bat".to_string()]
                );
                let options = config.assets.active_options().expect("azure options");
                assert_eq!(options.connection_string, "UseDevelopmentStorage=true");
                assert_eq!(options.cdn_url.as_deref(), Some("https://cdn.example.com"));
                assert_eq!(config.assets.max_concurrency, 16);
                assert!(config.validate().is_ok());
            },
        );
    }

    #[test]
    fn test_load_without_provider_fails() {
        with_env(&[("BLOBGATE__ASSETS__PROVIDER", None)], || {
            assert!(AppConfig::load().is_err());
        });
    }

    fn assets(provider: AssetProvider) -> AppConfig {
        AppConfig {
            server: ServerConfig::default(),
            assets: AssetsConfig {
                provider,
                azure_blob_storage: None,
                s3_blob_storage: None,
                file_extensions_blacklist: Vec::new(),
                max_concurrency: 16,
            },
        }
    }

    #[test]
    fn test_validate_missing_connection_string() {
        let config = assets(AssetProvider::S3);
        assert_eq!(
            config.validate(),
            Err(ConfigValidationError::MissingConnectionString {
                provider: "s3",
                section: "s3_blob_storage",
            })
        );
    }

    #[test]
    fn test_validate_memory_needs_nothing() {
        assert!(assets(AssetProvider::Memory).validate().is_ok());
    }

    #[test]
    fn test_validate_concurrency() {
        let mut config = assets(AssetProvider::Memory);
        config.assets.max_concurrency = 0;
        assert_eq!(
            config.validate(),
            Err(ConfigValidationError::InvalidConcurrency)
        );
    }

    #[test]
    fn test_validate_cdn_scheme() {
        let mut config = assets(AssetProvider::AzureBlob);
        config.assets.azure_blob_storage = Some(BlobStorageOptions {
            connection_string: "UseDevelopmentStorage=true".to_string(),
            cdn_url: Some("cdn.example.com".to_string()),
        });
        assert_eq!(
            config.validate(),
            Err(ConfigValidationError::InvalidCdnUrl {
                section: "azure_blob_storage"
            })
        );
    }

    #[test]
    fn test_debug_hides_connection_string() {
        let options = BlobStorageOptions {
            connection_string: "AccountKey=topsecret".to_string(),
            cdn_url: None,
        };
        assert!(!format!("{options:?}").contains("topsecret"));
    }
}
