//! Connection string parsing for the supported providers.
//!
//! Both providers are configured with a `Key=Value;Key=Value` string. Keys are
//! matched case-insensitively and values may themselves contain `=` (base64
//! account keys do).

use std::fmt;
use std::str::FromStr;

use super::error::StorageError;

/// Account name used by the Azurite emulator.
pub const DEVELOPMENT_ACCOUNT_NAME: &str = "devstoreaccount1";

/// Well-known account key used by the Azurite emulator.
pub const DEVELOPMENT_ACCOUNT_KEY: &str =
    "Eby8vdM02xNOcqFlqUwJPLlmEtlCDXJ1OUzFT50uSRZ6IFsuFq2UVErCz4I6tq/K1SZFPTOtr/KBHBeksoGMGw==";

/// Blob endpoint of a locally running Azurite emulator.
pub const DEVELOPMENT_BLOB_ENDPOINT: &str = "http://127.0.0.1:10000/devstoreaccount1";

/// Region used for S3 when the connection string does not name one.
pub const DEFAULT_S3_REGION: &str = "us-east-1";

/// Parsed `Key=Value;...` pairs.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionString {
    pairs: Vec<(String, String)>,
}

impl ConnectionString {
    /// Look up a value by key, ignoring key case. Blank values count as absent.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
            .filter(|v| !v.is_empty())
    }

    /// Look up a required value.
    pub fn require(&self, key: &str) -> Result<&str, StorageError> {
        self.get(key).ok_or_else(|| {
            StorageError::configuration(format!("connection string is missing '{key}'"))
        })
    }
}

impl FromStr for ConnectionString {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut pairs = Vec::new();
        for part in s.split(';').map(str::trim).filter(|p| !p.is_empty()) {
            let (key, value) = part.split_once('=').ok_or_else(|| {
                StorageError::configuration(format!(
                    "malformed connection string segment '{}'",
                    part.split('=').next().unwrap_or_default()
                ))
            })?;
            pairs.push((key.trim().to_string(), value.trim().to_string()));
        }

        if pairs.is_empty() {
            return Err(StorageError::configuration("connection string is empty"));
        }

        Ok(Self { pairs })
    }
}

// Values are secrets; only the keys are printed.
impl fmt::Debug for ConnectionString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set()
            .entries(self.pairs.iter().map(|(k, _)| k))
            .finish()
    }
}

/// Azure Blob Storage account settings.
#[derive(Clone)]
pub struct AzureConnection {
    /// Storage account name.
    pub account_name: String,
    /// Base64 shared key of the account.
    pub account_key: String,
    /// Blob service endpoint without a trailing slash.
    pub blob_endpoint: String,
}

impl AzureConnection {
    /// Parse an Azure storage connection string.
    ///
    /// Supports `UseDevelopmentStorage=true`, an explicit `BlobEndpoint`, or an
    /// endpoint derived from `DefaultEndpointsProtocol`, `AccountName` and
    /// `EndpointSuffix`.
    pub fn parse(connection_string: &str) -> Result<Self, StorageError> {
        let cs: ConnectionString = connection_string.parse()?;

        let development = cs
            .get("UseDevelopmentStorage")
            .is_some_and(|v| v.eq_ignore_ascii_case("true"));
        if development {
            return Ok(Self {
                account_name: DEVELOPMENT_ACCOUNT_NAME.to_string(),
                account_key: DEVELOPMENT_ACCOUNT_KEY.to_string(),
                blob_endpoint: DEVELOPMENT_BLOB_ENDPOINT.to_string(),
            });
        }

        let account_name = cs.require("AccountName")?.to_string();
        let account_key = cs.require("AccountKey")?.to_string();

        let blob_endpoint = match cs.get("BlobEndpoint") {
            Some(endpoint) => endpoint.trim_end_matches('/').to_string(),
            None => {
                let protocol = cs.get("DefaultEndpointsProtocol").unwrap_or("https");
                let suffix = cs.get("EndpointSuffix").unwrap_or("core.windows.net");
                format!("{protocol}://{account_name}.blob.{suffix}")
            }
        };

        Ok(Self {
            account_name,
            account_key,
            blob_endpoint,
        })
    }
}

impl fmt::Debug for AzureConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AzureConnection")
            .field("account_name", &self.account_name)
            .field("account_key", &"***")
            .field("blob_endpoint", &self.blob_endpoint)
            .finish()
    }
}

/// S3-compatible endpoint settings.
#[derive(Clone)]
pub struct S3Connection {
    /// Service endpoint, e.g. `http://localhost:9000` for MinIO.
    pub endpoint: String,
    /// Access key id.
    pub access_key: String,
    /// Secret access key.
    pub secret_key: String,
    /// Signing region.
    pub region: String,
}

impl S3Connection {
    /// Parse an S3 connection string with `Endpoint`, `AccessKey`,
    /// `SecretKey` and optional `Region`.
    pub fn parse(connection_string: &str) -> Result<Self, StorageError> {
        let cs: ConnectionString = connection_string.parse()?;

        Ok(Self {
            endpoint: cs.require("Endpoint")?.trim_end_matches('/').to_string(),
            access_key: cs.require("AccessKey")?.to_string(),
            secret_key: cs.require("SecretKey")?.to_string(),
            region: cs.get("Region").unwrap_or(DEFAULT_S3_REGION).to_string(),
        })
    }
}

impl fmt::Debug for S3Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("S3Connection")
            .field("endpoint", &self.endpoint)
            .field("access_key", &self.access_key)
            .field("secret_key", &"***")
            .field("region", &self.region)
            .finish()
    }
}
