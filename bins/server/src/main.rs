//! Blobgate API Server
//!
//! Main entry point for the blob gateway service.

use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use blobgate_api::{AppState, create_router};
use blobgate_core::assets::BlobGateway;
use blobgate_core::storage::StorageConfig;
use blobgate_shared::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "blobgate=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load and validate configuration
    let config = AppConfig::load()?;
    config.validate()?;

    // Connect the storage provider
    let storage_config = StorageConfig::try_from(&config.assets)?;
    let gateway = BlobGateway::from_config(&storage_config)?;
    info!(
        provider = config.assets.provider.name(),
        max_concurrency = storage_config.max_concurrency,
        "Blob storage configured"
    );

    // Create application state and router
    let state = AppState::new(gateway).with_max_upload_bytes(config.server.max_upload_bytes);
    let app = create_router(state);

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
