//! # waymark-shared
//!
//! Domain vocabulary shared by every Waymark crate: privacy tiers, media
//! kinds, the authenticated [`Viewer`](types::Viewer) record, and the
//! tunable limits in [`constants`].

pub mod constants;
pub mod types;

pub use types::{MediaKind, ParseEnumError, Privacy, Viewer};
