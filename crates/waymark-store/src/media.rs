//! CRUD operations for [`Media`] metadata rows.
//!
//! The binary payload itself lives in the blob store; these rows only carry
//! the `blob_id` reference. Referential integrity between rows and blobs is
//! not enforced transactionally.

use rusqlite::params;
use uuid::Uuid;

use crate::codec;
use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::Media;

const MEDIA_COLUMNS: &str = "id, pin_id, owner_id, blob_id, kind, caption, created_at";

impl Database {
    /// Insert a new media row.
    pub fn insert_media(&self, media: &Media) -> Result<()> {
        self.conn().execute(
            "INSERT INTO media (id, pin_id, owner_id, blob_id, kind, caption, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                media.id.to_string(),
                media.pin_id.to_string(),
                media.owner_id.to_string(),
                media.blob_id,
                media.kind.as_str(),
                media.caption,
                media.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Fetch a single media row by UUID.
    pub fn get_media(&self, id: Uuid) -> Result<Media> {
        self.conn()
            .query_row(
                &format!("SELECT {MEDIA_COLUMNS} FROM media WHERE id = ?1"),
                params![id.to_string()],
                row_to_media,
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
                other => StoreError::Sqlite(other),
            })
    }

    /// List every media row attached to a pin, oldest first.
    pub fn list_media_for_pin(&self, pin_id: Uuid) -> Result<Vec<Media>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {MEDIA_COLUMNS} FROM media WHERE pin_id = ?1 ORDER BY created_at ASC"
        ))?;
        let rows = stmt.query_map(params![pin_id.to_string()], row_to_media)?;

        let mut items = Vec::new();
        for row in rows {
            items.push(row?);
        }
        Ok(items)
    }

    /// Delete a media row by UUID. Returns `true` if a row was deleted.
    pub fn delete_media(&self, id: Uuid) -> Result<bool> {
        let affected = self
            .conn()
            .execute("DELETE FROM media WHERE id = ?1", params![id.to_string()])?;
        Ok(affected > 0)
    }

    /// Delete every media row attached to a pin. Returns the number of rows
    /// removed.
    pub fn delete_media_for_pin(&self, pin_id: Uuid) -> Result<usize> {
        let affected = self.conn().execute(
            "DELETE FROM media WHERE pin_id = ?1",
            params![pin_id.to_string()],
        )?;
        Ok(affected)
    }
}

/// Map a `rusqlite::Row` to a [`Media`].
fn row_to_media(row: &rusqlite::Row<'_>) -> rusqlite::Result<Media> {
    let id_str: String = row.get(0)?;
    let pin_str: String = row.get(1)?;
    let owner_str: String = row.get(2)?;
    let blob_id: String = row.get(3)?;
    let kind_str: String = row.get(4)?;
    let caption: Option<String> = row.get(5)?;
    let created_str: String = row.get(6)?;

    Ok(Media {
        id: codec::parse_uuid(0, &id_str)?,
        pin_id: codec::parse_uuid(1, &pin_str)?,
        owner_id: codec::parse_uuid(2, &owner_str)?,
        blob_id,
        kind: codec::parse_media_kind(4, &kind_str)?,
        caption,
        created_at: codec::parse_timestamp(6, &created_str)?,
    })
}
