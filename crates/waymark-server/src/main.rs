//! # waymark-server
//!
//! HTTP backend for Waymark, the geo-social pin board.
//!
//! This binary provides:
//! - **REST API** (axum) for pins, friends, messaging, events, media, and
//!   discovery
//! - **Identity provider**: argon2 password hashing and Ed25519-signed
//!   bearer tokens, with sandboxed guest accounts
//! - **Document store**: SQLite via `waymark-store`
//! - **Blob store**: content-addressed media storage on disk

mod api;
mod auth;
mod config;
mod error;

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::info;
use tracing_subscriber::EnvFilter;

use waymark_core::{
    BlobStore, ContentService, DiscoveryService, EventService, FriendGraph, MediaService,
    MessagingService, SharedDatabase,
};
use waymark_shared::constants::APP_NAME;
use waymark_store::Database;

use crate::api::AppState;
use crate::auth::TokenSigner;
use crate::config::ServerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // -----------------------------------------------------------------------
    // 1. Initialize tracing (respects RUST_LOG env var)
    // -----------------------------------------------------------------------
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,waymark_server=debug")),
        )
        .init();

    info!("Starting {} server v{}", APP_NAME, env!("CARGO_PKG_VERSION"));

    // -----------------------------------------------------------------------
    // 2. Load configuration
    // -----------------------------------------------------------------------
    let config = ServerConfig::from_env();
    info!(
        http_addr = %config.http_addr,
        database = %config.database_path.display(),
        blobs = %config.blob_storage_path.display(),
        "Loaded configuration"
    );

    // -----------------------------------------------------------------------
    // 3. Initialize subsystems
    // -----------------------------------------------------------------------

    // Document store (runs migrations on open)
    let db: SharedDatabase = Arc::new(Mutex::new(Database::open_at(&config.database_path)?));

    // Blob store (creates directory if missing)
    let blobs = Arc::new(BlobStore::new(config.blob_storage_path.clone(), config.max_blob_size).await?);

    // Token signer: seeded from config, or ephemeral for development
    let signer = match &config.token_secret {
        Some(seed) => Arc::new(TokenSigner::from_seed(seed)),
        None => {
            tracing::warn!("TOKEN_SECRET not set; using an ephemeral signing key (tokens die on restart)");
            Arc::new(TokenSigner::generate())
        }
    };

    // Core services, each handed its collaborator handles
    let app_state = AppState {
        content: Arc::new(ContentService::new(db.clone(), blobs.clone())),
        discovery: Arc::new(DiscoveryService::new(db.clone())),
        friends: Arc::new(FriendGraph::new(db.clone())),
        media: Arc::new(MediaService::new(db.clone(), blobs.clone())),
        messaging: Arc::new(MessagingService::new(db.clone())),
        events: Arc::new(EventService::new(db.clone())),
        db,
        signer,
        config: Arc::new(config.clone()),
    };

    // -----------------------------------------------------------------------
    // 4. Run the HTTP API server (blocks until shutdown)
    // -----------------------------------------------------------------------
    tokio::select! {
        result = api::serve(app_state, config.http_addr) => {
            if let Err(e) = result {
                tracing::error!(error = %e, "HTTP server failed");
                return Err(e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
