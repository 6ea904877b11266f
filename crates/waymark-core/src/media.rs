//! Media attachments and profile photos.
//!
//! A media row stores only the blob id; retrieval reconstructs the
//! self-describing payload from the blob store. Upload is blob write, then
//! row insert, then counter bump: three independent steps with no
//! two-phase guarantee. A failure between them strands a blob or lets
//! `media_count` drift; both are tolerated and logged, never repaired
//! in-line.

use std::sync::Arc;

use chrono::Utc;
use tracing::{error, warn};
use uuid::Uuid;

use waymark_shared::{MediaKind, Viewer};
use waymark_store::Media;

use crate::blob_store::{BlobPayload, BlobStore};
use crate::error::{CoreError, Result};
use crate::SharedDatabase;

/// A media row together with its binary payload.
#[derive(Debug, Clone)]
pub struct MediaItem {
    pub media: Media,
    pub payload: BlobPayload,
}

/// An incoming upload, as decoded by the transport layer.
#[derive(Debug, Clone)]
pub struct MediaUpload {
    pub data: Vec<u8>,
    pub file_name: String,
    pub content_type: String,
    pub caption: Option<String>,
}

pub struct MediaService {
    db: SharedDatabase,
    blobs: Arc<BlobStore>,
}

impl MediaService {
    pub fn new(db: SharedDatabase, blobs: Arc<BlobStore>) -> Self {
        Self { db, blobs }
    }

    /// Attach a media item to a pin owned by the viewer.
    pub async fn upload_media(
        &self,
        viewer: &Viewer,
        pin_id: Uuid,
        upload: MediaUpload,
    ) -> Result<Media> {
        let pin = {
            let db = self.db.lock().await;
            db.get_pin(pin_id).map_err(CoreError::missing("pin"))?
        };
        if pin.owner_id != viewer.id {
            return Err(CoreError::Forbidden("not the pin owner".to_string()));
        }

        let kind = MediaKind::from_content_type(&upload.content_type).ok_or_else(|| {
            CoreError::InvalidInput(format!(
                "unsupported media content type: {}",
                upload.content_type
            ))
        })?;

        let blob_id = self
            .blobs
            .upload(&upload.data, &upload.file_name, &upload.content_type)
            .await?;

        let media = Media {
            id: Uuid::new_v4(),
            pin_id,
            owner_id: viewer.id,
            blob_id,
            kind,
            caption: upload.caption,
            created_at: Utc::now(),
        };
        {
            let db = self.db.lock().await;
            db.insert_media(&media)?;
        }

        let bumped = {
            let db = self.db.lock().await;
            db.bump_media_count(pin_id, 1)?
        };
        if !bumped {
            warn!(pin = %pin_id, "media_count bump hit a missing pin; counter now stale");
        }

        Ok(media)
    }

    /// Every media item on a pin, with payloads. Unreadable blobs are
    /// logged and skipped rather than failing the whole listing.
    pub async fn list_media(&self, pin_id: Uuid) -> Result<Vec<MediaItem>> {
        hydrate_media(&self.db, &self.blobs, pin_id).await
    }

    /// Remove one media item owned by the viewer.
    pub async fn delete_media(&self, viewer: &Viewer, media_id: Uuid) -> Result<()> {
        let media = {
            let db = self.db.lock().await;
            db.get_media(media_id).map_err(CoreError::missing("media"))?
        };
        if media.owner_id != viewer.id {
            return Err(CoreError::Forbidden("not the media owner".to_string()));
        }

        self.blobs.delete_quiet(&media.blob_id).await;
        {
            let db = self.db.lock().await;
            db.delete_media(media_id)?;
        }
        {
            let db = self.db.lock().await;
            db.bump_media_count(media.pin_id, -1)?;
        }
        Ok(())
    }

    /// Replace the viewer's profile photo. Images only. The previous
    /// photo's blob, if any, is not reclaimed.
    pub async fn upload_profile_photo(
        &self,
        viewer: &Viewer,
        data: Vec<u8>,
        file_name: &str,
        content_type: &str,
    ) -> Result<String> {
        if !content_type.starts_with("image/") {
            return Err(CoreError::InvalidInput(
                "profile photos must be images".to_string(),
            ));
        }

        let blob_id = self.blobs.upload(&data, file_name, content_type).await?;
        {
            let db = self.db.lock().await;
            db.set_profile_photo(viewer.id, &blob_id)?;
        }
        Ok(blob_id)
    }

    /// Fetch a user's profile photo payload.
    pub async fn get_profile_photo(&self, user_id: Uuid) -> Result<BlobPayload> {
        let user = {
            let db = self.db.lock().await;
            db.get_user(user_id).map_err(CoreError::missing("user"))?
        };
        let blob_id = user
            .profile_photo
            .ok_or_else(|| CoreError::NotFound("profile photo not found".to_string()))?;

        self.blobs.fetch(&blob_id).await
    }
}

/// Load a pin's media rows and hydrate each with its blob payload. Shared
/// by the media listing and the feed.
pub(crate) async fn hydrate_media(
    db: &SharedDatabase,
    blobs: &BlobStore,
    pin_id: Uuid,
) -> Result<Vec<MediaItem>> {
    let rows = {
        let db = db.lock().await;
        db.list_media_for_pin(pin_id)?
    };

    let mut items = Vec::with_capacity(rows.len());
    for media in rows {
        match blobs.fetch(&media.blob_id).await {
            Ok(payload) => items.push(MediaItem { media, payload }),
            Err(e) => {
                error!(pin = %pin_id, media = %media.id, error = %e, "skipping unreadable media blob");
            }
        }
    }
    Ok(items)
}
