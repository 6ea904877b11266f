//! CRUD operations for [`Event`] records.

use std::collections::BTreeSet;

use rusqlite::params;
use uuid::Uuid;

use crate::codec;
use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::Event;

const EVENT_COLUMNS: &str = "id, owner_id, username, title, description, event_date, \
     latitude, longitude, location_name, attendees, created_at";

impl Database {
    /// Insert a new event.
    pub fn insert_event(&self, event: &Event) -> Result<()> {
        self.conn().execute(
            "INSERT INTO events (id, owner_id, username, title, description, event_date,
                                 latitude, longitude, location_name, attendees, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                event.id.to_string(),
                event.owner_id.to_string(),
                event.username,
                event.title,
                event.description,
                event.event_date.to_rfc3339(),
                event.latitude,
                event.longitude,
                event.location_name,
                codec::encode_id_set(&event.attendees),
                event.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Fetch a single event by UUID.
    pub fn get_event(&self, id: Uuid) -> Result<Event> {
        self.conn()
            .query_row(
                &format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = ?1"),
                params![id.to_string()],
                row_to_event,
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
                other => StoreError::Sqlite(other),
            })
    }

    /// List every event, soonest first. Events have no privacy tiering.
    pub fn list_events(&self) -> Result<Vec<Event>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {EVENT_COLUMNS} FROM events ORDER BY event_date ASC"
        ))?;
        let rows = stmt.query_map([], row_to_event)?;
        collect(rows)
    }

    /// Case-insensitive substring search over title, description, and
    /// location name, soonest first.
    pub fn search_events(&self, term: &str, limit: u32) -> Result<Vec<Event>> {
        let pattern = codec::like_substring(term);
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {EVENT_COLUMNS} FROM events
             WHERE title LIKE ?1 ESCAPE '\\'
                OR description LIKE ?1 ESCAPE '\\'
                OR location_name LIKE ?1 ESCAPE '\\'
             ORDER BY event_date ASC
             LIMIT ?2"
        ))?;
        let rows = stmt.query_map(params![pattern, limit], row_to_event)?;
        collect(rows)
    }

    /// Overwrite an event's attendee set. Returns `true` if a row was
    /// updated.
    pub fn update_event_attendees(&self, id: Uuid, attendees: &BTreeSet<Uuid>) -> Result<bool> {
        let affected = self.conn().execute(
            "UPDATE events SET attendees = ?1 WHERE id = ?2",
            params![codec::encode_id_set(attendees), id.to_string()],
        )?;
        Ok(affected > 0)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn collect<I: Iterator<Item = rusqlite::Result<Event>>>(rows: I) -> Result<Vec<Event>> {
    let mut events = Vec::new();
    for row in rows {
        events.push(row?);
    }
    Ok(events)
}

/// Map a `rusqlite::Row` to an [`Event`].
fn row_to_event(row: &rusqlite::Row<'_>) -> rusqlite::Result<Event> {
    let id_str: String = row.get(0)?;
    let owner_str: String = row.get(1)?;
    let username: String = row.get(2)?;
    let title: String = row.get(3)?;
    let description: String = row.get(4)?;
    let date_str: String = row.get(5)?;
    let latitude: f64 = row.get(6)?;
    let longitude: f64 = row.get(7)?;
    let location_name: String = row.get(8)?;
    let attendees_str: String = row.get(9)?;
    let created_str: String = row.get(10)?;

    Ok(Event {
        id: codec::parse_uuid(0, &id_str)?,
        owner_id: codec::parse_uuid(1, &owner_str)?,
        username,
        title,
        description,
        event_date: codec::parse_timestamp(5, &date_str)?,
        latitude,
        longitude,
        location_name,
        attendees: codec::parse_id_set(9, &attendees_str)?,
        created_at: codec::parse_timestamp(10, &created_str)?,
    })
}
