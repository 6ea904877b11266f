//! Domain model structs persisted in the document store.
//!
//! Every struct derives `Serialize` and `Deserialize` so it can be handed
//! directly to the transport layer.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use waymark_shared::{MediaKind, Privacy};

// ---------------------------------------------------------------------------
// User
// ---------------------------------------------------------------------------

/// A registered (or guest) user account.
///
/// `friends` and `friend_requests` are id sets: the friends relation is
/// symmetric once an accept has completed both of its writes, and a user is
/// never a member of their own sets.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    /// Argon2 hash; `None` for guest accounts, which have no password.
    #[serde(default, skip_serializing)]
    pub password_hash: Option<String>,
    /// Blob id of the profile photo, if one has been uploaded.
    pub profile_photo: Option<String>,
    pub is_guest: bool,
    pub friends: BTreeSet<Uuid>,
    pub friend_requests: BTreeSet<Uuid>,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Pin
// ---------------------------------------------------------------------------

/// A comment embedded in a pin's comment list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Comment {
    pub id: Uuid,
    pub user_id: Uuid,
    pub username: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

/// A geo-tagged content post with a privacy tier, likes, comments, and zero
/// or more media items.
///
/// `media_count` is maintained by increment/decrement, not recomputed; it
/// can drift from the true media row count under partial failure.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Pin {
    pub id: Uuid,
    pub owner_id: Uuid,
    /// Denormalized owner username, captured at creation time.
    pub username: String,
    pub title: String,
    pub description: String,
    pub latitude: f64,
    pub longitude: f64,
    pub privacy: Privacy,
    pub likes: BTreeSet<Uuid>,
    pub comments: Vec<Comment>,
    pub media_count: i64,
    pub created_at: DateTime<Utc>,
}

impl Pin {
    pub fn like_count(&self) -> usize {
        self.likes.len()
    }
}

// ---------------------------------------------------------------------------
// Media
// ---------------------------------------------------------------------------

/// Metadata for one media item attached to a pin. The binary payload lives
/// in the blob store under `blob_id`, which must resolve while this row
/// exists (not enforced transactionally).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Media {
    pub id: Uuid,
    pub pin_id: Uuid,
    pub owner_id: Uuid,
    pub blob_id: String,
    pub kind: MediaKind,
    pub caption: Option<String>,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Event
// ---------------------------------------------------------------------------

/// A scheduled gathering at a location. Events carry no privacy tiering;
/// they are globally visible to any authenticated viewer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Event {
    pub id: Uuid,
    pub owner_id: Uuid,
    /// Denormalized owner username, captured at creation time.
    pub username: String,
    pub title: String,
    pub description: String,
    pub event_date: DateTime<Utc>,
    pub latitude: f64,
    pub longitude: f64,
    pub location_name: String,
    pub attendees: BTreeSet<Uuid>,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

/// A direct message between friends. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub sender_username: String,
    pub recipient_id: Uuid,
    pub recipient_username: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// The participant other than `user` in this message, used when grouping
    /// messages into conversations.
    pub fn peer_of(&self, user: Uuid) -> Uuid {
        if self.sender_id == user {
            self.recipient_id
        } else {
            self.sender_id
        }
    }
}
