//! Friendship graph: request/accept lifecycle and friend listings.
//!
//! The friends relation is mutual membership in each user's `friends` set,
//! established by request then accept. There is no reject, cancel, or
//! unfriend operation; that gap is deliberate, not an omission to patch
//! here.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use waymark_shared::Viewer;
use waymark_store::User;

use crate::error::{CoreError, Result};
use crate::SharedDatabase;

/// A user record sanitized for other viewers: no password hash, no friend
/// sets.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct UserProfile {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub profile_photo: Option<String>,
    pub is_guest: bool,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserProfile {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            profile_photo: user.profile_photo,
            is_guest: user.is_guest,
            created_at: user.created_at,
        }
    }
}

pub struct FriendGraph {
    db: SharedDatabase,
}

impl FriendGraph {
    pub fn new(db: SharedDatabase) -> Self {
        Self { db }
    }

    /// Send a friend request to `target_id`. Re-requesting while a request
    /// is already pending is an idempotent no-op union, not an error.
    pub async fn request_friend(&self, viewer: &Viewer, target_id: Uuid) -> Result<()> {
        if target_id == viewer.id {
            return Err(CoreError::Conflict(
                "cannot send a friend request to yourself".to_string(),
            ));
        }
        if viewer.is_friend(target_id) {
            return Err(CoreError::Conflict("already friends".to_string()));
        }

        let db = self.db.lock().await;
        let target = db.get_user(target_id).map_err(CoreError::missing("user"))?;

        let mut requests = target.friend_requests;
        requests.insert(viewer.id);
        db.update_friend_sets(target_id, &target.friends, &requests)?;

        tracing::debug!(from = %viewer.id, to = %target_id, "friend request recorded");
        Ok(())
    }

    /// Accept a pending friend request from `requester_id`.
    ///
    /// Two separate single-row updates: the accepter's side first, then the
    /// requester's. A crash between them leaves an asymmetric relation; no
    /// compensating transaction exists.
    pub async fn accept_friend(&self, viewer: &Viewer, requester_id: Uuid) -> Result<()> {
        if !viewer.friend_requests.contains(&requester_id) {
            return Err(CoreError::InvalidInput(
                "no pending friend request from this user".to_string(),
            ));
        }

        {
            let db = self.db.lock().await;
            let accepter = db.get_user(viewer.id).map_err(CoreError::missing("user"))?;
            let mut friends = accepter.friends;
            friends.insert(requester_id);
            let mut requests = accepter.friend_requests;
            requests.remove(&requester_id);
            db.update_friend_sets(viewer.id, &friends, &requests)?;
        }

        {
            let db = self.db.lock().await;
            let requester = db
                .get_user(requester_id)
                .map_err(CoreError::missing("user"))?;
            let mut friends = requester.friends;
            friends.insert(viewer.id);
            db.update_friend_sets(requester_id, &friends, &requester.friend_requests)?;
        }

        tracing::debug!(accepter = %viewer.id, requester = %requester_id, "friend request accepted");
        Ok(())
    }

    /// Pure membership query against the stored record of `a`.
    pub async fn is_friend(&self, a: Uuid, b: Uuid) -> Result<bool> {
        let db = self.db.lock().await;
        let user = db.get_user(a).map_err(CoreError::missing("user"))?;
        Ok(user.friends.contains(&b))
    }

    /// Resolve the viewer's friend set to sanitized profiles.
    pub async fn list_friends(&self, viewer: &Viewer) -> Result<Vec<UserProfile>> {
        let db = self.db.lock().await;
        let users = db.get_users_by_ids(&viewer.friends)?;
        Ok(users.into_iter().map(UserProfile::from).collect())
    }

    /// Resolve the viewer's pending requests to sanitized profiles.
    pub async fn list_friend_requests(&self, viewer: &Viewer) -> Result<Vec<UserProfile>> {
        let db = self.db.lock().await;
        let users = db.get_users_by_ids(&viewer.friend_requests)?;
        Ok(users.into_iter().map(UserProfile::from).collect())
    }
}
