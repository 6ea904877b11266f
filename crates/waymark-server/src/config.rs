//! Server configuration loaded from environment variables.
//!
//! All settings have sensible defaults so the server can start with zero
//! configuration for local development.

use std::net::SocketAddr;
use std::path::PathBuf;

use waymark_shared::constants::{
    DEFAULT_HTTP_PORT, GUEST_TOKEN_TTL_HOURS, MAX_BLOB_SIZE, TOKEN_TTL_HOURS,
};

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Socket address for the HTTP (axum) API server.
    /// Env: `HTTP_ADDR`
    /// Default: `0.0.0.0:8080`
    pub http_addr: SocketAddr,

    /// Filesystem path of the SQLite document store.
    /// Env: `DATABASE_PATH`
    /// Default: `./data/waymark.db`
    pub database_path: PathBuf,

    /// Filesystem path where media blobs are stored.
    /// Env: `BLOB_STORAGE_PATH`
    /// Default: `./blobs`
    pub blob_storage_path: PathBuf,

    /// Maximum blob size in bytes (50 MiB).
    pub max_blob_size: usize,

    /// Ed25519 seed for signing session tokens (hex-encoded, 64 chars).
    /// Env: `TOKEN_SECRET`
    /// Default: none; an ephemeral key is generated at startup, which
    /// invalidates all tokens on restart.
    pub token_secret: Option<[u8; 32]>,

    /// Session token lifetime for registered users, in hours.
    pub token_ttl_hours: i64,

    /// Session token lifetime for guest accounts, in hours.
    pub guest_token_ttl_hours: i64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: ([0, 0, 0, 0], DEFAULT_HTTP_PORT).into(),
            database_path: PathBuf::from("./data/waymark.db"),
            blob_storage_path: PathBuf::from("./blobs"),
            max_blob_size: MAX_BLOB_SIZE,
            token_secret: None,
            token_ttl_hours: TOKEN_TTL_HOURS,
            guest_token_ttl_hours: GUEST_TOKEN_TTL_HOURS,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables, falling back to
    /// defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(addr) = std::env::var("HTTP_ADDR") {
            if let Ok(parsed) = addr.parse::<SocketAddr>() {
                config.http_addr = parsed;
            } else {
                tracing::warn!(value = %addr, "Invalid HTTP_ADDR, using default");
            }
        }

        if let Ok(path) = std::env::var("DATABASE_PATH") {
            config.database_path = PathBuf::from(path);
        }

        if let Ok(path) = std::env::var("BLOB_STORAGE_PATH") {
            config.blob_storage_path = PathBuf::from(path);
        }

        if let Ok(hex_seed) = std::env::var("TOKEN_SECRET") {
            match parse_hex_seed(&hex_seed) {
                Ok(seed) => config.token_secret = Some(seed),
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        "Invalid TOKEN_SECRET, falling back to an ephemeral key"
                    );
                }
            }
        }

        // RUST_LOG is handled directly by tracing-subscriber's EnvFilter,
        // so we do not store it here.

        config
    }
}

/// Parse a 64-character hex string into a 32-byte seed.
fn parse_hex_seed(raw: &str) -> Result<[u8; 32], String> {
    let raw = raw.trim();
    if raw.len() != 64 {
        return Err(format!("expected 64 hex chars, got {}", raw.len()));
    }

    let bytes = hex::decode(raw).map_err(|e| format!("invalid hex: {e}"))?;
    let mut seed = [0u8; 32];
    seed.copy_from_slice(&bytes);
    Ok(seed)
}
