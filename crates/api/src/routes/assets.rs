//! Blob and folder routes.

use axum::{
    Json, Router,
    body::Body,
    extract::{Query, State},
    http::{HeaderValue, StatusCode, Uri, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::AppState;
use crate::routes::{asset_error, error_response};
use blobgate_core::assets::{
    BlobEntrySearchResult, BlobFolder, BlobInfo, CACHE_CONTROL, GuessMimeResolver, MimeResolver,
};
use blobgate_shared::AppError;

/// Path segment after which blob content routes carry the blob URL.
const CONTENT_PREFIX: &str = "/assets/content/";

/// Creates the asset routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/assets", get(search))
        .route("/assets/exists", get(exists))
        .route("/assets/info", get(blob_info))
        .route("/assets/absolute-url", get(absolute_url))
        .route(
            "/assets/content/{*path}",
            get(download_content).put(upload_content),
        )
        .route("/assets/remove", post(remove))
        .route("/assets/folders", post(create_folder))
        .route("/assets/move", post(move_blob))
        .route("/assets/copy", post(copy_blob))
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Query for folder search.
#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    /// Folder to list; containers are listed when absent.
    #[serde(default)]
    pub folder_url: Option<String>,
    /// Name prefix filter.
    #[serde(default)]
    pub keyword: Option<String>,
}

/// Query carrying a single blob URL.
#[derive(Debug, Deserialize)]
pub struct UrlQuery {
    /// Absolute or relative blob URL.
    pub url: String,
}

/// Query for absolute URL generation.
#[derive(Debug, Deserialize)]
pub struct KeyQuery {
    /// Relative key (`container/path`).
    pub key: String,
}

/// Response for an existence check.
#[derive(Debug, Serialize)]
pub struct ExistsResponse {
    /// URL that was checked.
    pub url: String,
    /// Whether the blob or container exists.
    pub exists: bool,
}

/// Response carrying a generated URL.
#[derive(Debug, Serialize)]
pub struct UrlResponse {
    /// Absolute public URL.
    pub url: String,
}

/// Response for a finished upload.
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    /// Absolute public URL of the stored blob.
    pub url: String,
    /// Bytes written.
    pub size: u64,
}

/// Request body for removing blobs, folders or containers.
#[derive(Debug, Deserialize)]
pub struct RemoveRequest {
    /// URLs to remove. A trailing `/` marks a folder.
    pub urls: Vec<String>,
}

/// Request body for creating a folder.
#[derive(Debug, Deserialize)]
pub struct CreateFolderRequest {
    /// Folder name.
    pub name: String,
    /// Enclosing folder or container; a container is created when absent.
    #[serde(default)]
    pub parent_url: Option<String>,
}

/// Request body for move and copy.
#[derive(Debug, Deserialize)]
pub struct TransferRequest {
    /// Source blob or folder URL.
    pub src_url: String,
    /// Destination blob or folder URL in the same container.
    pub dest_url: String,
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Blob URL carried by a content route, still percent-encoded.
fn content_url(uri: &Uri) -> Result<&str, Response> {
    uri.path()
        .split_once(CONTENT_PREFIX)
        .map(|(_, rest)| rest)
        .filter(|rest| !rest.is_empty())
        .ok_or_else(|| {
            error_response(&AppError::Validation(
                "blob path is missing from the request".to_string(),
            ))
        })
}

fn header_value(value: &str) -> HeaderValue {
    HeaderValue::from_str(value)
        .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"))
}

// ============================================================================
// Route Handlers
// ============================================================================

/// GET `/assets`
/// List containers, or the direct children of a folder.
async fn search(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<BlobEntrySearchResult>, Response> {
    state
        .gateway
        .search(query.folder_url.as_deref(), query.keyword.as_deref())
        .await
        .map(Json)
        .map_err(asset_error)
}

/// GET `/assets/exists`
async fn exists(
    State(state): State<AppState>,
    Query(query): Query<UrlQuery>,
) -> Result<Json<ExistsResponse>, Response> {
    let exists = state.gateway.exists(&query.url).await.map_err(asset_error)?;
    Ok(Json(ExistsResponse {
        url: query.url,
        exists,
    }))
}

/// GET `/assets/info`
async fn blob_info(
    State(state): State<AppState>,
    Query(query): Query<UrlQuery>,
) -> Result<Json<BlobInfo>, Response> {
    state
        .gateway
        .blob_info(&query.url)
        .await
        .map(Json)
        .map_err(asset_error)
}

/// GET `/assets/absolute-url`
async fn absolute_url(
    State(state): State<AppState>,
    Query(query): Query<KeyQuery>,
) -> Json<UrlResponse> {
    Json(UrlResponse {
        url: state.gateway.absolute_url(&query.key),
    })
}

/// GET `/assets/content/{*path}`
/// Stream a blob to the client.
async fn download_content(State(state): State<AppState>, uri: Uri) -> Response {
    let url = match content_url(&uri) {
        Ok(url) => url,
        Err(response) => return response,
    };

    let reader = match state.gateway.open_read(url).await {
        Ok(reader) => reader,
        Err(e) => return asset_error(e),
    };
    let (meta, stream) = reader.into_parts();
    let content_type = meta.content_type.clone().unwrap_or_else(|| {
        let name = meta.key.rsplit('/').next().unwrap_or(&meta.key);
        GuessMimeResolver.resolve_content_type(name)
    });

    debug!(url, size = meta.size, "Streaming blob");
    (
        [
            (header::CONTENT_TYPE, header_value(&content_type)),
            (header::CONTENT_LENGTH, HeaderValue::from(meta.size)),
            (header::CACHE_CONTROL, HeaderValue::from_static(CACHE_CONTROL)),
        ],
        Body::from_stream(stream),
    )
        .into_response()
}

/// PUT `/assets/content/{*path}`
/// Stream the request body into a blob; it becomes visible once fully written.
async fn upload_content(State(state): State<AppState>, uri: Uri, body: Body) -> Response {
    let url = match content_url(&uri) {
        Ok(url) => url,
        Err(response) => return response,
    };

    let mut writer = match state.gateway.open_write(url).await {
        Ok(writer) => writer,
        Err(e) => return asset_error(e),
    };

    let mut chunks = body.into_data_stream();
    while let Some(chunk) = chunks.next().await {
        let outcome = match chunk {
            Ok(bytes) => writer.write(bytes).await.map_err(|e| asset_error(e.into())),
            Err(e) => Err(error_response(&AppError::Validation(format!(
                "failed to read request body: {e}"
            )))),
        };
        if let Err(response) = outcome {
            let _ = writer.abort().await;
            return response;
        }
    }

    let size = match writer.close().await {
        Ok(size) => size,
        Err(e) => return asset_error(e.into()),
    };

    info!(url, size, "Blob uploaded");
    (
        StatusCode::CREATED,
        Json(UploadResponse {
            url: state.gateway.absolute_url(url),
            size,
        }),
    )
        .into_response()
}

/// POST `/assets/remove`
async fn remove(
    State(state): State<AppState>,
    Json(request): Json<RemoveRequest>,
) -> Result<StatusCode, Response> {
    state
        .gateway
        .remove(&request.urls)
        .await
        .map_err(asset_error)?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST `/assets/folders`
async fn create_folder(
    State(state): State<AppState>,
    Json(request): Json<CreateFolderRequest>,
) -> Result<StatusCode, Response> {
    let folder = BlobFolder::new(request.name, request.parent_url);
    state
        .gateway
        .create_folder(&folder)
        .await
        .map_err(asset_error)?;
    Ok(StatusCode::CREATED)
}

/// POST `/assets/move`
async fn move_blob(
    State(state): State<AppState>,
    Json(request): Json<TransferRequest>,
) -> Result<StatusCode, Response> {
    state
        .gateway
        .move_blob(&request.src_url, &request.dest_url)
        .await
        .map_err(asset_error)?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST `/assets/copy`
async fn copy_blob(
    State(state): State<AppState>,
    Json(request): Json<TransferRequest>,
) -> Result<StatusCode, Response> {
    state
        .gateway
        .copy_blob(&request.src_url, &request.dest_url)
        .await
        .map_err(asset_error)?;
    Ok(StatusCode::NO_CONTENT)
}
