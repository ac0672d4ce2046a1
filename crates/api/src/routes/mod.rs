//! API route definitions.

use axum::{
    Json, Router,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::{error, warn};

use blobgate_core::assets::AssetError;
use blobgate_shared::AppError;

use crate::AppState;

pub mod assets;
pub mod health;

/// Creates the API router with all routes.
pub fn api_routes() -> Router<AppState> {
    Router::new().merge(health::routes()).merge(assets::routes())
}

/// JSON error body `{"error": code, "message": text}` with the matching status.
pub fn error_response(err: &AppError) -> Response {
    let status =
        StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (
        status,
        Json(json!({
            "error": err.error_code(),
            "message": err.to_string(),
        })),
    )
        .into_response()
}

/// Log a gateway failure and turn it into an error response.
pub(crate) fn asset_error(err: AssetError) -> Response {
    let app_error = AppError::from(err);
    if app_error.status_code() >= 500 {
        error!(error = %app_error, "Blob operation failed");
    } else {
        warn!(error = %app_error, "Blob request rejected");
    }
    error_response(&app_error)
}
