//! # waymark-store
//!
//! Document store for the Waymark backend, backed by SQLite.
//!
//! The crate exposes a synchronous [`Database`] handle that wraps a
//! `rusqlite::Connection` and provides typed CRUD helpers for every domain
//! model. Each helper issues exactly one SQL statement; that single-statement
//! atomicity is the only isolation guarantee the store offers. Set-valued
//! fields and embedded comment lists are stored as JSON text columns and
//! validated on read; malformed rows are rejected, not coerced.

pub mod database;
pub mod events;
pub mod media;
pub mod messages;
pub mod migrations;
pub mod models;
pub mod pins;
pub mod users;

mod codec;
mod error;

pub use database::Database;
pub use error::StoreError;
pub use models::*;
