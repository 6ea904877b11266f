//! CRUD and query operations for [`Pin`] records.

use std::collections::BTreeSet;

use rusqlite::params;
use uuid::Uuid;

use crate::codec;
use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::{Comment, Pin};

const PIN_COLUMNS: &str = "id, owner_id, username, title, description, latitude, longitude, \
     privacy, likes, comments, media_count, created_at";

impl Database {
    // ------------------------------------------------------------------
    // Create
    // ------------------------------------------------------------------

    /// Insert a new pin.
    pub fn insert_pin(&self, pin: &Pin) -> Result<()> {
        self.conn().execute(
            "INSERT INTO pins (id, owner_id, username, title, description, latitude, longitude,
                               privacy, likes, comments, media_count, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                pin.id.to_string(),
                pin.owner_id.to_string(),
                pin.username,
                pin.title,
                pin.description,
                pin.latitude,
                pin.longitude,
                pin.privacy.as_str(),
                codec::encode_id_set(&pin.likes),
                codec::encode_comments(&pin.comments),
                pin.media_count,
                pin.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    /// Fetch a single pin by UUID.
    pub fn get_pin(&self, id: Uuid) -> Result<Pin> {
        self.conn()
            .query_row(
                &format!("SELECT {PIN_COLUMNS} FROM pins WHERE id = ?1"),
                params![id.to_string()],
                row_to_pin,
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
                other => StoreError::Sqlite(other),
            })
    }

    /// List every pin owned by `owner`, newest first.
    pub fn list_pins_by_owner(&self, owner: Uuid) -> Result<Vec<Pin>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {PIN_COLUMNS} FROM pins WHERE owner_id = ?1 ORDER BY created_at DESC"
        ))?;
        let rows = stmt.query_map(params![owner.to_string()], row_to_pin)?;
        collect(rows)
    }

    /// The feed composition for a non-guest viewer, newest first: public
    /// pins not owned by the viewer, the viewer's own pins of any tier, and
    /// friends-tier pins owned by one of the viewer's friends.
    pub fn list_feed_pins(&self, viewer: Uuid, friends: &BTreeSet<Uuid>) -> Result<Vec<Pin>> {
        let friends_clause = if friends.is_empty() {
            "0".to_string()
        } else {
            // ?1 is the viewer; friend ids bind from ?2 upward.
            let placeholders: Vec<String> =
                (0..friends.len()).map(|i| format!("?{}", i + 2)).collect();
            format!(
                "(privacy = 'friends' AND owner_id IN ({}))",
                placeholders.join(", ")
            )
        };

        let sql = format!(
            "SELECT {PIN_COLUMNS} FROM pins
             WHERE (privacy = 'public' AND owner_id != ?1)
                OR owner_id = ?1
                OR {friends_clause}
             ORDER BY created_at DESC"
        );

        let mut bindings: Vec<String> = vec![viewer.to_string()];
        bindings.extend(friends.iter().map(Uuid::to_string));

        let mut stmt = self.conn().prepare(&sql)?;
        let rows = stmt.query_map(rusqlite::params_from_iter(bindings.iter()), row_to_pin)?;
        collect(rows)
    }

    /// Every public pin, in store order. Ranking and proximity filtering
    /// happen in the discovery engine, not here.
    pub fn list_public_pins(&self) -> Result<Vec<Pin>> {
        let mut stmt = self
            .conn()
            .prepare(&format!("SELECT {PIN_COLUMNS} FROM pins WHERE privacy = 'public'"))?;
        let rows = stmt.query_map([], row_to_pin)?;
        collect(rows)
    }

    /// Case-insensitive substring search over title and description,
    /// restricted to public pins, newest first.
    pub fn search_public_pins(&self, term: &str, limit: u32) -> Result<Vec<Pin>> {
        let pattern = codec::like_substring(term);
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {PIN_COLUMNS} FROM pins
             WHERE privacy = 'public'
               AND (title LIKE ?1 ESCAPE '\\' OR description LIKE ?1 ESCAPE '\\')
             ORDER BY created_at DESC
             LIMIT ?2"
        ))?;
        let rows = stmt.query_map(params![pattern, limit], row_to_pin)?;
        collect(rows)
    }

    // ------------------------------------------------------------------
    // Update
    // ------------------------------------------------------------------

    /// Overwrite a pin's like set. Returns `true` if a row was updated.
    pub fn update_pin_likes(&self, id: Uuid, likes: &BTreeSet<Uuid>) -> Result<bool> {
        let affected = self.conn().execute(
            "UPDATE pins SET likes = ?1 WHERE id = ?2",
            params![codec::encode_id_set(likes), id.to_string()],
        )?;
        Ok(affected > 0)
    }

    /// Overwrite a pin's comment list. Returns `true` if a row was updated.
    pub fn update_pin_comments(&self, id: Uuid, comments: &[Comment]) -> Result<bool> {
        let affected = self.conn().execute(
            "UPDATE pins SET comments = ?1 WHERE id = ?2",
            params![codec::encode_comments(comments), id.to_string()],
        )?;
        Ok(affected > 0)
    }

    /// Adjust the media counter by `delta` in a single statement. The
    /// counter is never recomputed from the media table.
    pub fn bump_media_count(&self, id: Uuid, delta: i64) -> Result<bool> {
        let affected = self.conn().execute(
            "UPDATE pins SET media_count = media_count + ?1 WHERE id = ?2",
            params![delta, id.to_string()],
        )?;
        Ok(affected > 0)
    }

    // ------------------------------------------------------------------
    // Delete
    // ------------------------------------------------------------------

    /// Delete a pin by UUID. Returns `true` if a row was deleted. Media
    /// rows are NOT cascaded here; the caller removes them explicitly.
    pub fn delete_pin(&self, id: Uuid) -> Result<bool> {
        let affected = self
            .conn()
            .execute("DELETE FROM pins WHERE id = ?1", params![id.to_string()])?;
        Ok(affected > 0)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn collect<I: Iterator<Item = rusqlite::Result<Pin>>>(rows: I) -> Result<Vec<Pin>> {
    let mut pins = Vec::new();
    for row in rows {
        pins.push(row?);
    }
    Ok(pins)
}

/// Map a `rusqlite::Row` to a [`Pin`].
fn row_to_pin(row: &rusqlite::Row<'_>) -> rusqlite::Result<Pin> {
    let id_str: String = row.get(0)?;
    let owner_str: String = row.get(1)?;
    let username: String = row.get(2)?;
    let title: String = row.get(3)?;
    let description: String = row.get(4)?;
    let latitude: f64 = row.get(5)?;
    let longitude: f64 = row.get(6)?;
    let privacy_str: String = row.get(7)?;
    let likes_str: String = row.get(8)?;
    let comments_str: String = row.get(9)?;
    let media_count: i64 = row.get(10)?;
    let created_str: String = row.get(11)?;

    Ok(Pin {
        id: codec::parse_uuid(0, &id_str)?,
        owner_id: codec::parse_uuid(1, &owner_str)?,
        username,
        title,
        description,
        latitude,
        longitude,
        privacy: codec::parse_privacy(7, &privacy_str)?,
        likes: codec::parse_id_set(8, &likes_str)?,
        comments: codec::parse_comments(9, &comments_str)?,
        media_count,
        created_at: codec::parse_timestamp(11, &created_str)?,
    })
}
