//! # waymark-core
//!
//! The content-visibility, friend-authorization, discovery-ranking, and
//! binary-media subsystem of the Waymark backend.
//!
//! Every service takes its collaborator handles ([`SharedDatabase`], the
//! [`BlobStore`]) at construction time; the process entry point owns their
//! lifecycle. Operations are request-scoped: each one reads current state
//! from the store, decides, and writes back. A store access holds the
//! database lock for exactly one call, so multi-call sequences (toggles,
//! counter bumps, friend-accept's two-sided update, blob-then-row writes)
//! are not atomic. The consistency gaps this opens are part of the design
//! and are documented where they occur.

use std::sync::Arc;

use tokio::sync::Mutex;

use waymark_store::Database;

pub mod blob_store;
pub mod discovery;
pub mod events;
pub mod friends;
pub mod media;
pub mod messaging;
pub mod pins;
pub mod visibility;

mod error;

pub use blob_store::{BlobPayload, BlobStore};
pub use discovery::{DiscoveryService, NearbyPin};
pub use error::CoreError;
pub use events::{AttendanceState, EventService, NewEvent};
pub use friends::{FriendGraph, UserProfile};
pub use media::{MediaItem, MediaService, MediaUpload};
pub use messaging::MessagingService;
pub use pins::{ContentService, LikeState, NewPin, PinWithMedia};

/// The document-store handle shared by every service. The mutex makes each
/// store call an independent critical section; nothing holds it across two
/// calls on behalf of one logical operation.
pub type SharedDatabase = Arc<Mutex<Database>>;
