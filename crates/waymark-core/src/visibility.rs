//! Visibility policy engine.
//!
//! Decides, given a viewer and a pin, whether the viewer may see it.
//! Rules, in priority order:
//!
//! 1. the owner always sees their own pin regardless of tier;
//! 2. `public`: visible to any authenticated viewer, including guests on a
//!    direct fetch by id (guests are sandboxed from public content only in
//!    the feed composition, which lives in the store query and
//!    [`ContentService::list_feed`]);
//! 3. `friends`: visible only to the owner or a viewer whose friend set
//!    contains the owner;
//! 4. `private`: visible only to the owner.
//!
//! Search is a narrower, search-specific policy (public tier only,
//! regardless of viewer), enforced directly by the search queries.
//!
//! [`ContentService::list_feed`]: crate::ContentService::list_feed

use waymark_shared::{Privacy, Viewer};
use waymark_store::Pin;

use crate::error::{CoreError, Result};

/// Whether `viewer` may see `pin` on a direct fetch.
pub fn can_view(viewer: &Viewer, pin: &Pin) -> bool {
    if pin.owner_id == viewer.id {
        return true;
    }
    match pin.privacy {
        Privacy::Public => true,
        Privacy::Friends => viewer.is_friend(pin.owner_id),
        Privacy::Private => false,
    }
}

/// [`can_view`] as a typed failure.
pub fn check_view(viewer: &Viewer, pin: &Pin) -> Result<()> {
    if can_view(viewer, pin) {
        Ok(())
    } else {
        Err(CoreError::Forbidden("access denied".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use chrono::Utc;
    use uuid::Uuid;

    use super::*;

    fn viewer(id: Uuid, friends: &[Uuid], is_guest: bool) -> Viewer {
        Viewer {
            id,
            username: "viewer".to_string(),
            friends: friends.iter().copied().collect(),
            friend_requests: BTreeSet::new(),
            is_guest,
        }
    }

    fn pin(owner: Uuid, privacy: Privacy) -> Pin {
        Pin {
            id: Uuid::new_v4(),
            owner_id: owner,
            username: "owner".to_string(),
            title: "a pin".to_string(),
            description: String::new(),
            latitude: 0.0,
            longitude: 0.0,
            privacy,
            likes: BTreeSet::new(),
            comments: Vec::new(),
            media_count: 0,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn owner_sees_every_tier() {
        let owner = Uuid::new_v4();
        let v = viewer(owner, &[], false);
        for privacy in [Privacy::Public, Privacy::Friends, Privacy::Private] {
            assert!(can_view(&v, &pin(owner, privacy)));
        }
    }

    #[test]
    fn private_denied_to_everyone_else() {
        let p = pin(Uuid::new_v4(), Privacy::Private);
        let v = viewer(Uuid::new_v4(), &[p.owner_id], false);
        assert!(!can_view(&v, &p));
        assert!(check_view(&v, &p).is_err());
    }

    #[test]
    fn friends_tier_requires_friendship() {
        let owner = Uuid::new_v4();
        let p = pin(owner, Privacy::Friends);

        assert!(can_view(&viewer(Uuid::new_v4(), &[owner], false), &p));
        assert!(!can_view(&viewer(Uuid::new_v4(), &[], false), &p));
    }

    #[test]
    fn public_visible_to_any_viewer_even_guests() {
        let p = pin(Uuid::new_v4(), Privacy::Public);
        assert!(can_view(&viewer(Uuid::new_v4(), &[], false), &p));
        // Direct fetch by id is not guest-restricted; only the feed is.
        assert!(can_view(&viewer(Uuid::new_v4(), &[], true), &p));
    }
}
