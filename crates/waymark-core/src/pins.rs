//! Pin content: creation, the visibility-composed feed, like toggles,
//! comments, and the cascading delete.

use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use waymark_shared::{Privacy, Viewer};
use waymark_store::{Comment, Pin};

use crate::blob_store::BlobStore;
use crate::error::{CoreError, Result};
use crate::media::{hydrate_media, MediaItem};
use crate::visibility;
use crate::SharedDatabase;

/// Fields for a new pin. Privacy defaults to the most restrictive tier.
#[derive(Debug, Clone, Deserialize)]
pub struct NewPin {
    pub title: String,
    pub description: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default = "default_privacy")]
    pub privacy: Privacy,
}

fn default_privacy() -> Privacy {
    Privacy::Private
}

/// A feed entry: the pin plus its hydrated media payloads.
#[derive(Debug, Clone)]
pub struct PinWithMedia {
    pub pin: Pin,
    pub media: Vec<MediaItem>,
}

/// Result of a like toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct LikeState {
    pub likes: usize,
    pub liked: bool,
}

pub struct ContentService {
    db: SharedDatabase,
    blobs: Arc<BlobStore>,
}

impl ContentService {
    pub fn new(db: SharedDatabase, blobs: Arc<BlobStore>) -> Self {
        Self { db, blobs }
    }

    pub async fn create_pin(&self, viewer: &Viewer, new: NewPin) -> Result<Pin> {
        let pin = Pin {
            id: Uuid::new_v4(),
            owner_id: viewer.id,
            username: viewer.username.clone(),
            title: new.title,
            description: new.description,
            latitude: new.latitude,
            longitude: new.longitude,
            privacy: new.privacy,
            likes: Default::default(),
            comments: Vec::new(),
            media_count: 0,
            created_at: Utc::now(),
        };

        let db = self.db.lock().await;
        db.insert_pin(&pin)?;
        Ok(pin)
    }

    /// The feed, newest first, each pin hydrated with its media.
    ///
    /// Guests see only their own pins here; everyone else gets the full
    /// composition (public not-own ∪ own ∪ friends-tier-of-friends). Note
    /// that [`get_pin`](Self::get_pin) does NOT apply the guest restriction:
    /// guests can fetch a public pin directly by id. That asymmetry is
    /// part of the contract.
    pub async fn list_feed(&self, viewer: &Viewer) -> Result<Vec<PinWithMedia>> {
        let pins = {
            let db = self.db.lock().await;
            if viewer.is_guest {
                db.list_pins_by_owner(viewer.id)?
            } else {
                db.list_feed_pins(viewer.id, &viewer.friends)?
            }
        };

        let mut feed = Vec::with_capacity(pins.len());
        for pin in pins {
            let media = hydrate_media(&self.db, &self.blobs, pin.id).await?;
            feed.push(PinWithMedia { pin, media });
        }
        Ok(feed)
    }

    /// Pins created by `user_id`, newest first. Only the owner may list
    /// their own collection.
    pub async fn list_user_pins(&self, viewer: &Viewer, user_id: Uuid) -> Result<Vec<Pin>> {
        if user_id != viewer.id {
            return Err(CoreError::Forbidden(
                "cannot list another user's pins".to_string(),
            ));
        }
        let db = self.db.lock().await;
        Ok(db.list_pins_by_owner(user_id)?)
    }

    /// Fetch one pin, applying the visibility policy.
    pub async fn get_pin(&self, viewer: &Viewer, id: Uuid) -> Result<Pin> {
        let pin = {
            let db = self.db.lock().await;
            db.get_pin(id).map_err(CoreError::missing("pin"))?
        };
        visibility::check_view(viewer, &pin)?;
        Ok(pin)
    }

    /// Delete a pin and cascade to its media: best-effort blob deletes,
    /// then the media rows, then the pin row. Three explicit steps; a
    /// failure partway leaves orphans rather than rolling back.
    pub async fn delete_pin(&self, viewer: &Viewer, id: Uuid) -> Result<()> {
        let pin = {
            let db = self.db.lock().await;
            db.get_pin(id).map_err(CoreError::missing("pin"))?
        };
        if pin.owner_id != viewer.id {
            return Err(CoreError::Forbidden("not the pin owner".to_string()));
        }

        let media = {
            let db = self.db.lock().await;
            db.list_media_for_pin(id)?
        };
        for item in &media {
            self.blobs.delete_quiet(&item.blob_id).await;
        }

        {
            let db = self.db.lock().await;
            db.delete_media_for_pin(id)?;
        }
        {
            let db = self.db.lock().await;
            db.delete_pin(id)?;
        }

        info!(pin = %id, media = media.len(), "deleted pin and its media");
        Ok(())
    }

    /// Toggle the viewer's membership in the pin's like set.
    ///
    /// Read and write are separate store calls; a concurrent toggle
    /// interleaved between them is lost (the later write wins).
    pub async fn toggle_like(&self, viewer: &Viewer, pin_id: Uuid) -> Result<LikeState> {
        let pin = {
            let db = self.db.lock().await;
            db.get_pin(pin_id).map_err(CoreError::missing("pin"))?
        };

        let mut likes = pin.likes;
        let liked = if likes.remove(&viewer.id) {
            false
        } else {
            likes.insert(viewer.id);
            true
        };

        {
            let db = self.db.lock().await;
            db.update_pin_likes(pin_id, &likes)?;
        }
        Ok(LikeState {
            likes: likes.len(),
            liked,
        })
    }

    /// Append a comment to a pin. Any authenticated viewer may comment; the
    /// pin only needs to exist.
    pub async fn add_comment(&self, viewer: &Viewer, pin_id: Uuid, text: String) -> Result<Comment> {
        let pin = {
            let db = self.db.lock().await;
            db.get_pin(pin_id).map_err(CoreError::missing("pin"))?
        };

        let comment = Comment {
            id: Uuid::new_v4(),
            user_id: viewer.id,
            username: viewer.username.clone(),
            text,
            created_at: Utc::now(),
        };

        let mut comments = pin.comments;
        comments.push(comment.clone());
        {
            let db = self.db.lock().await;
            db.update_pin_comments(pin_id, &comments)?;
        }

        Ok(comment)
    }

    /// Remove a comment from a pin the viewer owns. Pulling an id that is
    /// not present is a silent no-op.
    pub async fn delete_comment(
        &self,
        viewer: &Viewer,
        pin_id: Uuid,
        comment_id: Uuid,
    ) -> Result<()> {
        let pin = {
            let db = self.db.lock().await;
            db.get_pin(pin_id).map_err(CoreError::missing("pin"))?
        };
        if pin.owner_id != viewer.id {
            return Err(CoreError::Forbidden(
                "not authorized to delete comments on this pin".to_string(),
            ));
        }

        let mut comments = pin.comments;
        comments.retain(|c| c.id != comment_id);
        {
            let db = self.db.lock().await;
            db.update_pin_comments(pin_id, &comments)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;
    use std::sync::Arc;

    use tokio::sync::Mutex;

    use waymark_store::{Database, User};

    use super::*;
    use crate::media::MediaService;

    struct Fixture {
        db: SharedDatabase,
        service: ContentService,
        _dir: tempfile::TempDir,
    }

    async fn fixture() -> Fixture {
        let db: SharedDatabase = Arc::new(Mutex::new(Database::open_in_memory().unwrap()));
        let dir = tempfile::TempDir::new().unwrap();
        let blobs = Arc::new(
            BlobStore::new(dir.path().to_path_buf(), 1024 * 1024)
                .await
                .unwrap(),
        );
        Fixture {
            service: ContentService::new(db.clone(), blobs),
            db,
            _dir: dir,
        }
    }

    fn viewer(name: &str, is_guest: bool) -> Viewer {
        Viewer {
            id: Uuid::new_v4(),
            username: name.to_string(),
            friends: BTreeSet::new(),
            friend_requests: BTreeSet::new(),
            is_guest,
        }
    }

    async fn register(db: &SharedDatabase, v: &Viewer) {
        let user = User {
            id: v.id,
            username: v.username.clone(),
            email: format!("{}@example.com", v.username),
            password_hash: None,
            profile_photo: None,
            is_guest: v.is_guest,
            friends: v.friends.clone(),
            friend_requests: BTreeSet::new(),
            created_at: Utc::now(),
        };
        db.lock().await.insert_user(&user).unwrap();
    }

    fn new_pin(title: &str, privacy: Privacy) -> NewPin {
        NewPin {
            title: title.to_string(),
            description: "desc".to_string(),
            latitude: 37.0,
            longitude: -122.0,
            privacy,
        }
    }

    #[tokio::test]
    async fn private_pin_forbidden_to_others() {
        let fx = fixture().await;
        let owner = viewer("ada", false);
        let other = viewer("eve", false);
        register(&fx.db, &owner).await;

        let pin = fx
            .service
            .create_pin(&owner, new_pin("secret", Privacy::Private))
            .await
            .unwrap();

        assert!(fx.service.get_pin(&owner, pin.id).await.is_ok());
        assert!(matches!(
            fx.service.get_pin(&other, pin.id).await,
            Err(CoreError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn friends_tier_visible_iff_friend() {
        let fx = fixture().await;
        let owner = viewer("ada", false);
        let mut friend = viewer("bob", false);
        let stranger = viewer("eve", false);
        friend.friends.insert(owner.id);

        let pin = fx
            .service
            .create_pin(&owner, new_pin("for friends", Privacy::Friends))
            .await
            .unwrap();

        assert!(fx.service.get_pin(&friend, pin.id).await.is_ok());
        assert!(matches!(
            fx.service.get_pin(&stranger, pin.id).await,
            Err(CoreError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn guest_feed_isolation_but_direct_fetch_allowed() {
        let fx = fixture().await;
        let owner = viewer("ada", false);
        let guest = viewer("guest", true);

        let public = fx
            .service
            .create_pin(&owner, new_pin("public spot", Privacy::Public))
            .await
            .unwrap();
        let own = fx
            .service
            .create_pin(&guest, new_pin("guest note", Privacy::Private))
            .await
            .unwrap();

        // The guest's feed never includes another user's pins, public or not.
        let feed = fx.service.list_feed(&guest).await.unwrap();
        let ids: Vec<Uuid> = feed.iter().map(|e| e.pin.id).collect();
        assert_eq!(ids, vec![own.id]);

        // Documented asymmetry: a direct fetch by id is not guest-restricted.
        assert!(fx.service.get_pin(&guest, public.id).await.is_ok());
    }

    #[tokio::test]
    async fn feed_composes_public_own_and_friend_pins() {
        let fx = fixture().await;
        let owner = viewer("ada", false);
        let friend = viewer("bob", false);
        let stranger = viewer("eve", false);
        let mut me = viewer("sam", false);
        me.friends.insert(friend.id);

        fx.service
            .create_pin(&owner, new_pin("public", Privacy::Public))
            .await
            .unwrap();
        fx.service
            .create_pin(&friend, new_pin("friend tier", Privacy::Friends))
            .await
            .unwrap();
        fx.service
            .create_pin(&stranger, new_pin("hidden", Privacy::Friends))
            .await
            .unwrap();
        fx.service
            .create_pin(&me, new_pin("mine", Privacy::Private))
            .await
            .unwrap();

        let feed = fx.service.list_feed(&me).await.unwrap();
        let titles: BTreeSet<String> = feed.iter().map(|e| e.pin.title.clone()).collect();
        assert_eq!(
            titles,
            BTreeSet::from([
                "public".to_string(),
                "friend tier".to_string(),
                "mine".to_string()
            ])
        );
    }

    #[tokio::test]
    async fn toggle_like_twice_restores_original_state() {
        let fx = fixture().await;
        let owner = viewer("ada", false);
        let liker = viewer("bob", false);

        let pin = fx
            .service
            .create_pin(&owner, new_pin("likeable", Privacy::Public))
            .await
            .unwrap();

        let on = fx.service.toggle_like(&liker, pin.id).await.unwrap();
        assert_eq!(on, LikeState { likes: 1, liked: true });

        let off = fx.service.toggle_like(&liker, pin.id).await.unwrap();
        assert_eq!(off, LikeState { likes: 0, liked: false });

        let stored = fx.db.lock().await.get_pin(pin.id).unwrap();
        assert!(stored.likes.is_empty());
    }

    #[tokio::test]
    async fn comments_append_and_owner_only_delete() {
        let fx = fixture().await;
        let owner = viewer("ada", false);
        let commenter = viewer("bob", false);

        let pin = fx
            .service
            .create_pin(&owner, new_pin("discuss", Privacy::Public))
            .await
            .unwrap();

        let comment = fx
            .service
            .add_comment(&commenter, pin.id, "nice spot".to_string())
            .await
            .unwrap();

        // Only the pin owner may delete comments.
        assert!(matches!(
            fx.service
                .delete_comment(&commenter, pin.id, comment.id)
                .await,
            Err(CoreError::Forbidden(_))
        ));
        fx.service
            .delete_comment(&owner, pin.id, comment.id)
            .await
            .unwrap();

        // Pulling an absent comment id is a silent no-op.
        fx.service
            .delete_comment(&owner, pin.id, comment.id)
            .await
            .unwrap();

        let stored = fx.db.lock().await.get_pin(pin.id).unwrap();
        assert!(stored.comments.is_empty());
    }

    #[tokio::test]
    async fn delete_pin_cascades_and_refetch_is_not_found() {
        let fx = fixture().await;
        let owner = viewer("ada", false);
        let pin = fx
            .service
            .create_pin(&owner, new_pin("doomed", Privacy::Public))
            .await
            .unwrap();

        let media = MediaService::new(fx.db.clone(), {
            let dir = fx._dir.path().to_path_buf();
            Arc::new(BlobStore::new(dir, 1024 * 1024).await.unwrap())
        });
        media
            .upload_media(
                &owner,
                pin.id,
                crate::media::MediaUpload {
                    data: b"png".to_vec(),
                    file_name: "p.png".to_string(),
                    content_type: "image/png".to_string(),
                    caption: None,
                },
            )
            .await
            .unwrap();

        fx.service.delete_pin(&owner, pin.id).await.unwrap();

        assert!(matches!(
            fx.service.get_pin(&owner, pin.id).await,
            Err(CoreError::NotFound(_))
        ));
        assert!(media.list_media(pin.id).await.unwrap().is_empty());
        assert!(fx
            .db
            .lock()
            .await
            .list_media_for_pin(pin.id)
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn only_owner_deletes_pin() {
        let fx = fixture().await;
        let owner = viewer("ada", false);
        let other = viewer("eve", false);
        let pin = fx
            .service
            .create_pin(&owner, new_pin("mine", Privacy::Public))
            .await
            .unwrap();

        assert!(matches!(
            fx.service.delete_pin(&other, pin.id).await,
            Err(CoreError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn listing_another_users_pins_is_forbidden() {
        let fx = fixture().await;
        let me = viewer("ada", false);
        let other = viewer("eve", false);

        assert!(matches!(
            fx.service.list_user_pins(&me, other.id).await,
            Err(CoreError::Forbidden(_))
        ));
        assert!(fx.service.list_user_pins(&me, me.id).await.unwrap().is_empty());
    }
}
