//! HTTP API layer with Axum routes.
//!
//! This crate provides:
//! - REST routes over the blob gateway
//! - Streaming upload and download of blob content
//! - Mapping of gateway errors to JSON error responses

pub mod routes;

use axum::Router;
use blobgate_core::assets::BlobGateway;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

/// Default upper bound on request bodies (256 MiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 256 * 1024 * 1024;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Blob gateway over the configured provider.
    pub gateway: Arc<BlobGateway>,
    /// Largest accepted request body in bytes.
    pub max_upload_bytes: usize,
}

impl AppState {
    /// Create state with the default upload limit.
    #[must_use]
    pub fn new(gateway: BlobGateway) -> Self {
        Self {
            gateway: Arc::new(gateway),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }

    /// Set the largest accepted request body.
    #[must_use]
    pub fn with_max_upload_bytes(mut self, max_upload_bytes: usize) -> Self {
        self.max_upload_bytes = max_upload_bytes;
        self
    }
}

/// Creates the main application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", routes::api_routes())
        .layer(RequestBodyLimitLayer::new(state.max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
