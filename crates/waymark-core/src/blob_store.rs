//! Content-addressable binary storage with metadata.
//!
//! A blob's id is the BLAKE3 hex digest of its bytes; the data file and a
//! JSON metadata sidecar live side by side under the configured directory.
//! The two writes (and the two removals on delete) are independent steps
//! with no two-phase guarantee: an interrupted upload can strand a data
//! file without metadata, and metadata deletion can outlive a failed data
//! deletion. Orphans are tolerated.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{debug, info, warn};

use crate::error::{CoreError, Result};

/// Metadata stored alongside each blob.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct BlobMeta {
    file_name: String,
    content_type: String,
    size: usize,
    created_at: DateTime<Utc>,
}

/// A fetched blob: the raw bytes plus the declared content type, for the
/// consumer to encode however it transports media.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobPayload {
    pub data: Vec<u8>,
    pub content_type: String,
    pub file_name: String,
}

#[derive(Debug, Clone)]
pub struct BlobStore {
    base_path: PathBuf,
    max_size: usize,
}

impl BlobStore {
    pub async fn new(base_path: PathBuf, max_size: usize) -> Result<Self> {
        fs::create_dir_all(&base_path).await.map_err(|e| {
            CoreError::BlobStorage(format!(
                "Failed to create blob directory '{}': {}",
                base_path.display(),
                e
            ))
        })?;

        info!(path = %base_path.display(), "Blob store initialized");

        Ok(Self {
            base_path,
            max_size,
        })
    }

    /// Store a blob and return its content hash id. Re-uploading identical
    /// bytes lands on the same id and simply rewrites the same files.
    pub async fn upload(&self, data: &[u8], file_name: &str, content_type: &str) -> Result<String> {
        if data.is_empty() {
            return Err(CoreError::InvalidInput("Empty blob".to_string()));
        }
        if data.len() > self.max_size {
            return Err(CoreError::InvalidInput(format!(
                "Blob too large: {} bytes (max {})",
                data.len(),
                self.max_size
            )));
        }

        let id = blake3::hash(data).to_hex().to_string();
        let data_path = self.data_path(&id)?;

        fs::write(&data_path, data)
            .await
            .map_err(|e| CoreError::BlobStorage(format!("Failed to write blob {id}: {e}")))?;

        let meta = BlobMeta {
            file_name: file_name.to_string(),
            content_type: content_type.to_string(),
            size: data.len(),
            created_at: Utc::now(),
        };
        let meta_json = serde_json::to_vec(&meta)
            .map_err(|e| CoreError::BlobStorage(format!("Failed to encode blob meta: {e}")))?;
        fs::write(self.meta_path(&id)?, meta_json)
            .await
            .map_err(|e| CoreError::BlobStorage(format!("Failed to write blob meta {id}: {e}")))?;

        debug!(id = %id, size = data.len(), content_type, "Stored blob");
        Ok(id)
    }

    /// Retrieve a blob's bytes and declared content type.
    pub async fn fetch(&self, id: &str) -> Result<BlobPayload> {
        let meta_path = self.meta_path(id)?;
        if !meta_path.exists() {
            return Err(CoreError::NotFound(format!("blob {id} not found")));
        }

        let meta_json = fs::read(&meta_path)
            .await
            .map_err(|e| CoreError::BlobStorage(format!("Failed to read blob meta {id}: {e}")))?;
        let meta: BlobMeta = serde_json::from_slice(&meta_json)
            .map_err(|e| CoreError::BlobStorage(format!("Malformed blob meta {id}: {e}")))?;

        let data = fs::read(self.data_path(id)?)
            .await
            .map_err(|e| CoreError::BlobStorage(format!("Failed to read blob {id}: {e}")))?;

        debug!(id = %id, size = data.len(), "Retrieved blob");
        Ok(BlobPayload {
            data,
            content_type: meta.content_type,
            file_name: meta.file_name,
        })
    }

    /// Delete a blob and its metadata. Fails with `NotFound` when absent.
    pub async fn delete(&self, id: &str) -> Result<()> {
        let meta_path = self.meta_path(id)?;
        if !meta_path.exists() {
            return Err(CoreError::NotFound(format!("blob {id} not found")));
        }

        fs::remove_file(&meta_path)
            .await
            .map_err(|e| CoreError::BlobStorage(format!("Failed to delete blob meta {id}: {e}")))?;
        fs::remove_file(self.data_path(id)?)
            .await
            .map_err(|e| CoreError::BlobStorage(format!("Failed to delete blob {id}: {e}")))?;

        debug!(id = %id, "Deleted blob");
        Ok(())
    }

    /// Best-effort delete for cascading cleanups: blob deletion is always a
    /// secondary effect of a metadata deletion that must succeed regardless,
    /// so failures are logged and swallowed.
    pub async fn delete_quiet(&self, id: &str) {
        if let Err(e) = self.delete(id).await {
            warn!(id = %id, error = %e, "Ignoring blob deletion failure");
        }
    }

    /// Validate a blob id and resolve the data file path. Ids are exactly
    /// 64 lowercase hex chars, so a valid id can never escape the base
    /// directory.
    fn data_path(&self, id: &str) -> Result<PathBuf> {
        if id.len() != 64 || !id.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f')) {
            return Err(CoreError::InvalidInput(format!("Invalid blob id: {id:?}")));
        }
        Ok(self.base_path.join(id))
    }

    fn meta_path(&self, id: &str) -> Result<PathBuf> {
        Ok(self.data_path(id)?.with_extension("meta.json"))
    }
}
