//! Container administration through the Blob service REST API.
//!
//! OpenDAL's azblob service is scoped to one container and cannot create,
//! delete or enumerate containers, so these calls are signed with the
//! account's Shared Key and sent directly.

use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use reqwest::header::{AUTHORIZATION, CONTENT_LENGTH, LAST_MODIFIED};
use reqwest::{Client, Method, Response, StatusCode};
use sha2::Sha256;
use tracing::{debug, info};
use url::Url;

use crate::storage::backend::ContainerInfo;
use crate::storage::connection::AzureConnection;
use crate::storage::error::StorageError;

const AZURE_API_VERSION: &str = "2021-08-06";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

type HmacSha256 = Hmac<Sha256>;

pub(crate) struct ContainerAdmin {
    client: Client,
    endpoint: Url,
    account: String,
    key: Vec<u8>,
}

impl ContainerAdmin {
    pub(crate) fn new(connection: &AzureConnection) -> Result<Self, StorageError> {
        let key = BASE64.decode(&connection.account_key).map_err(|e| {
            StorageError::configuration(format!("AccountKey is not valid base64: {e}"))
        })?;
        let endpoint = Url::parse(&connection.blob_endpoint).map_err(|e| {
            StorageError::configuration(format!(
                "invalid blob endpoint '{}': {e}",
                connection.blob_endpoint
            ))
        })?;
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| StorageError::configuration(format!("HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint,
            account: connection.account_name.clone(),
            key,
        })
    }

    /// Create the container with blob-level public read access. Returns false
    /// if it already existed.
    pub(crate) async fn create(&self, container: &str) -> Result<bool, StorageError> {
        let url = self.container_url(container, &[("restype", "container")]);
        let response = self
            .send(Method::PUT, url, &[("x-ms-blob-public-access", "blob")])
            .await?;

        match response.status() {
            StatusCode::CREATED => {
                info!(container, "Azure container created");
                Ok(true)
            }
            StatusCode::CONFLICT if error_code(&response) == Some("ContainerAlreadyExists") => {
                Ok(false)
            }
            status => Err(failure("create container", container, status, response).await),
        }
    }

    /// Delete the container and all of its blobs.
    pub(crate) async fn delete(&self, container: &str) -> Result<bool, StorageError> {
        let url = self.container_url(container, &[("restype", "container")]);
        let response = self.send(Method::DELETE, url, &[]).await?;

        match response.status() {
            StatusCode::ACCEPTED => {
                info!(container, "Azure container deleted");
                Ok(true)
            }
            StatusCode::NOT_FOUND => Ok(false),
            status => Err(failure("delete container", container, status, response).await),
        }
    }

    pub(crate) async fn properties(
        &self,
        container: &str,
    ) -> Result<Option<ContainerInfo>, StorageError> {
        let url = self.container_url(container, &[("restype", "container")]);
        let response = self.send(Method::HEAD, url, &[]).await?;

        match response.status() {
            StatusCode::OK => {
                let last_modified = response
                    .headers()
                    .get(LAST_MODIFIED)
                    .and_then(|v| v.to_str().ok())
                    .and_then(parse_http_date);
                Ok(Some(ContainerInfo {
                    name: container.to_string(),
                    last_modified,
                }))
            }
            StatusCode::NOT_FOUND => Ok(None),
            status => Err(failure("get container properties", container, status, response).await),
        }
    }

    pub(crate) async fn list(&self) -> Result<Vec<ContainerInfo>, StorageError> {
        let mut containers = Vec::new();
        let mut marker: Option<String> = None;

        loop {
            let mut url = self.endpoint.clone();
            url.query_pairs_mut().append_pair("comp", "list");
            if let Some(m) = marker.as_deref() {
                url.query_pairs_mut().append_pair("marker", m);
            }

            let response = self.send(Method::GET, url, &[]).await?;
            let status = response.status();
            if !status.is_success() {
                return Err(failure("list containers", &self.account, status, response).await);
            }

            let body = response.text().await?;
            let (page, next_marker) = parse_container_list(&body);
            debug!(count = page.len(), "Azure container page listed");
            containers.extend(page);

            match next_marker {
                Some(next) => marker = Some(next),
                None => break,
            }
        }

        Ok(containers)
    }

    fn container_url(&self, container: &str, query: &[(&str, &str)]) -> Url {
        let mut url = self.endpoint.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(container);
        }
        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (k, v) in query {
                pairs.append_pair(k, v);
            }
        }
        url
    }

    async fn send(
        &self,
        method: Method,
        url: Url,
        ms_headers: &[(&str, &str)],
    ) -> Result<Response, StorageError> {
        let date = Utc::now().format("%a, %d %b %Y %H:%M:%S GMT").to_string();
        let mut headers: Vec<(String, String)> = vec![
            ("x-ms-date".to_string(), date),
            ("x-ms-version".to_string(), AZURE_API_VERSION.to_string()),
        ];
        headers.extend(ms_headers.iter().map(|(k, v)| (k.to_lowercase(), (*v).to_string())));

        let authorization = self.authorization(&string_to_sign(
            &method,
            &url,
            &self.account,
            &headers,
        ))?;

        let mut request = self
            .client
            .request(method.clone(), url)
            .header(AUTHORIZATION, authorization);
        for (name, value) in &headers {
            request = request.header(name.as_str(), value.as_str());
        }
        if method == Method::PUT {
            request = request.header(CONTENT_LENGTH, 0);
        }

        Ok(request.send().await?)
    }

    fn authorization(&self, string_to_sign: &str) -> Result<String, StorageError> {
        let mut mac = HmacSha256::new_from_slice(&self.key)
            .map_err(|e| StorageError::configuration(format!("HMAC key error: {e}")))?;
        mac.update(string_to_sign.as_bytes());
        let signature = BASE64.encode(mac.finalize().into_bytes());
        Ok(format!("SharedKey {}:{signature}", self.account))
    }
}

/// Shared Key string-to-sign for a request without a body.
///
/// ```text
/// VERB\n + 11 empty standard headers\n + CanonicalizedHeaders + CanonicalizedResource
/// ```
fn string_to_sign(method: &Method, url: &Url, account: &str, headers: &[(String, String)]) -> String {
    let mut headers = headers.to_vec();
    headers.sort();
    let canonical_headers: String = headers
        .iter()
        .map(|(k, v)| format!("{k}:{v}\n"))
        .collect();

    let mut resource = format!("/{account}{}", url.path());
    let mut params: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| (k.to_lowercase(), v.into_owned()))
        .collect();
    params.sort();
    for (k, v) in params {
        resource.push('\n');
        resource.push_str(&k);
        resource.push(':');
        resource.push_str(&v);
    }

    format!("{method}\n\n\n\n\n\n\n\n\n\n\n\n{canonical_headers}{resource}")
}

fn error_code(response: &Response) -> Option<&str> {
    response
        .headers()
        .get("x-ms-error-code")
        .and_then(|v| v.to_str().ok())
}

async fn failure(
    operation: &str,
    target: &str,
    status: StatusCode,
    response: Response,
) -> StorageError {
    let code = error_code(&response).unwrap_or_default().to_string();
    let body = response.text().await.unwrap_or_default();
    StorageError::operation(format!(
        "Azure {operation} '{target}': HTTP {status} {code} {body}"
    ))
}

fn parse_http_date(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(value)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Extract containers and the continuation marker from a List Containers body.
fn parse_container_list(body: &str) -> (Vec<ContainerInfo>, Option<String>) {
    let containers = elements(body, "Container")
        .into_iter()
        .filter_map(|xml| {
            let name = first_text(xml, "Name")?;
            Some(ContainerInfo {
                name: name.to_string(),
                last_modified: first_text(xml, "Last-Modified").and_then(parse_http_date),
            })
        })
        .collect();

    let next_marker = first_text(body, "NextMarker")
        .filter(|m| !m.is_empty())
        .map(str::to_string);

    (containers, next_marker)
}

fn elements<'a>(xml: &'a str, tag: &str) -> Vec<&'a str> {
    let open = format!("<{tag}>");
    let close = format!("</{tag}>");
    let mut found = Vec::new();
    let mut rest = xml;
    while let Some(start) = rest.find(&open) {
        let body = &rest[start + open.len()..];
        let Some(end) = body.find(&close) else { break };
        found.push(&body[..end]);
        rest = &body[end + close.len()..];
    }
    found
}

fn first_text<'a>(xml: &'a str, tag: &str) -> Option<&'a str> {
    elements(xml, tag).into_iter().next().map(str::trim)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::connection::AzureConnection;

    fn admin(cs: &str) -> ContainerAdmin {
        ContainerAdmin::new(&AzureConnection::parse(cs).expect("connection")).expect("admin")
    }

    #[test]
    fn test_container_url_for_cloud_and_emulator() {
        let cloud = admin("AccountName=acme;AccountKey=a2V5");
        assert_eq!(
            cloud
                .container_url("assets", &[("restype", "container")])
                .as_str(),
            "https://acme.blob.core.windows.net/assets?restype=container"
        );

        let emulator = admin("UseDevelopmentStorage=true");
        assert_eq!(
            emulator.container_url("assets", &[]).as_str(),
            "http://127.0.0.1:10000/devstoreaccount1/assets"
        );
    }

    #[test]
    fn test_string_to_sign_layout() {
        let url = Url::parse("https://acme.blob.core.windows.net/assets?restype=container")
            .expect("url");
        let headers = vec![
            ("x-ms-version".to_string(), AZURE_API_VERSION.to_string()),
            ("x-ms-date".to_string(), "Mon, 01 Jan 2024 00:00:00 GMT".to_string()),
        ];

        let signed = string_to_sign(&Method::DELETE, &url, "acme", &headers);
        assert_eq!(
            signed,
            "DELETE\n\n\n\n\n\n\n\n\n\n\n\n\
             x-ms-date:Mon, 01 Jan 2024 00:00:00 GMT\n\
             x-ms-version:2021-08-06\n\
             /acme/assets\nrestype:container"
        );
    }

    #[test]
    fn test_authorization_header_format() {
        let admin = admin("AccountName=acme;AccountKey=a2V5");
        let header = admin.authorization("GET\n").expect("sign");
        assert!(header.starts_with("SharedKey acme:"));
        assert!(header.len() > "SharedKey acme:".len());
    }

    #[test]
    fn test_parse_container_list() {
        let body = r#"<?xml version="1.0" encoding="utf-8"?>
<EnumerationResults ServiceEndpoint="https://acme.blob.core.windows.net/">
  <Containers>
    <Container>
      <Name>assets</Name>
      <Properties><Last-Modified>Wed, 13 Mar 2024 10:15:00 GMT</Last-Modified></Properties>
    </Container>
    <Container>
      <Name>catalog</Name>
      <Properties></Properties>
    </Container>
  </Containers>
  <NextMarker>/acme/catalog</NextMarker>
</EnumerationResults>"#;

        let (containers, marker) = parse_container_list(body);
        assert_eq!(containers.len(), 2);
        assert_eq!(containers[0].name, "assets");
        assert!(containers[0].last_modified.is_some());
        assert_eq!(containers[1].name, "catalog");
        assert!(containers[1].last_modified.is_none());
        assert_eq!(marker.as_deref(), Some("/acme/catalog"));
    }

    #[test]
    fn test_parse_container_list_last_page() {
        let body = "<EnumerationResults><Containers /><NextMarker /></EnumerationResults>";
        let (containers, marker) = parse_container_list(body);
        assert!(containers.is_empty());
        assert!(marker.is_none());
    }
}
