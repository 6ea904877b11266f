use std::collections::BTreeSet;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Raised when a stored enum code does not match any known variant.
#[derive(Debug, Error)]
#[error("unknown {kind} code: {value:?}")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

/// Privacy tier of a pin. Controls who may see it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Privacy {
    /// Visible to any authenticated viewer.
    Public,
    /// Visible to the owner and the owner's friends.
    Friends,
    /// Visible to the owner only.
    Private,
}

impl Privacy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Privacy::Public => "public",
            Privacy::Friends => "friends",
            Privacy::Private => "private",
        }
    }
}

impl FromStr for Privacy {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "public" => Ok(Privacy::Public),
            "friends" => Ok(Privacy::Friends),
            "private" => Ok(Privacy::Private),
            other => Err(ParseEnumError {
                kind: "privacy",
                value: other.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for Privacy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of a media item attached to a pin.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Photo,
    Video,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Photo => "photo",
            MediaKind::Video => "video",
        }
    }

    /// Classify an upload by its declared MIME type. `image/*` is a photo,
    /// `video/*` is a video, anything else is unsupported.
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        if content_type.starts_with("image/") {
            Some(MediaKind::Photo)
        } else if content_type.starts_with("video/") {
            Some(MediaKind::Video)
        } else {
            None
        }
    }
}

impl FromStr for MediaKind {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "photo" => Ok(MediaKind::Photo),
            "video" => Ok(MediaKind::Video),
            other => Err(ParseEnumError {
                kind: "media kind",
                value: other.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The authenticated caller of a core operation, as resolved by the
/// identity provider. A snapshot of the user record at resolution time:
/// friend sets read here may be stale by the time the operation writes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Viewer {
    pub id: Uuid,
    pub username: String,
    pub friends: BTreeSet<Uuid>,
    pub friend_requests: BTreeSet<Uuid>,
    pub is_guest: bool,
}

impl Viewer {
    /// Membership test against this viewer's friend set.
    pub fn is_friend(&self, other: Uuid) -> bool {
        self.friends.contains(&other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn privacy_round_trip() {
        for p in [Privacy::Public, Privacy::Friends, Privacy::Private] {
            assert_eq!(p.as_str().parse::<Privacy>().unwrap(), p);
        }
        assert!("secret".parse::<Privacy>().is_err());
    }

    #[test]
    fn media_kind_from_content_type() {
        assert_eq!(
            MediaKind::from_content_type("image/png"),
            Some(MediaKind::Photo)
        );
        assert_eq!(
            MediaKind::from_content_type("video/mp4"),
            Some(MediaKind::Video)
        );
        assert_eq!(MediaKind::from_content_type("application/pdf"), None);
        assert_eq!(MediaKind::from_content_type(""), None);
    }

    #[test]
    fn viewer_friend_membership() {
        let friend = Uuid::new_v4();
        let viewer = Viewer {
            id: Uuid::new_v4(),
            username: "ada".into(),
            friends: BTreeSet::from([friend]),
            friend_requests: BTreeSet::new(),
            is_guest: false,
        };
        assert!(viewer.is_friend(friend));
        assert!(!viewer.is_friend(Uuid::new_v4()));
    }
}
