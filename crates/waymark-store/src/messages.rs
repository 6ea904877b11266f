//! CRUD operations for [`Message`] records.
//!
//! Messages are immutable once created; there is no update or delete.

use rusqlite::params;
use uuid::Uuid;

use crate::codec;
use crate::database::Database;
use crate::error::Result;
use crate::models::Message;

const MESSAGE_COLUMNS: &str =
    "id, sender_id, sender_username, recipient_id, recipient_username, content, created_at";

impl Database {
    /// Insert a new message.
    pub fn insert_message(&self, message: &Message) -> Result<()> {
        self.conn().execute(
            "INSERT INTO messages (id, sender_id, sender_username, recipient_id,
                                   recipient_username, content, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                message.id.to_string(),
                message.sender_id.to_string(),
                message.sender_username,
                message.recipient_id.to_string(),
                message.recipient_username,
                message.content,
                message.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// The two-way thread between `a` and `b`, oldest first.
    pub fn list_thread(&self, a: Uuid, b: Uuid) -> Result<Vec<Message>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages
             WHERE (sender_id = ?1 AND recipient_id = ?2)
                OR (sender_id = ?2 AND recipient_id = ?1)
             ORDER BY created_at ASC"
        ))?;
        let rows = stmt.query_map(params![a.to_string(), b.to_string()], row_to_message)?;
        collect(rows)
    }

    /// Every message where `user` is sender or recipient, newest first.
    /// Input to the conversation aggregator.
    pub fn list_messages_involving(&self, user: Uuid) -> Result<Vec<Message>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages
             WHERE sender_id = ?1 OR recipient_id = ?1
             ORDER BY created_at DESC"
        ))?;
        let rows = stmt.query_map(params![user.to_string()], row_to_message)?;
        collect(rows)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn collect<I: Iterator<Item = rusqlite::Result<Message>>>(rows: I) -> Result<Vec<Message>> {
    let mut messages = Vec::new();
    for row in rows {
        messages.push(row?);
    }
    Ok(messages)
}

/// Map a `rusqlite::Row` to a [`Message`].
fn row_to_message(row: &rusqlite::Row<'_>) -> rusqlite::Result<Message> {
    let id_str: String = row.get(0)?;
    let sender_str: String = row.get(1)?;
    let sender_username: String = row.get(2)?;
    let recipient_str: String = row.get(3)?;
    let recipient_username: String = row.get(4)?;
    let content: String = row.get(5)?;
    let created_str: String = row.get(6)?;

    Ok(Message {
        id: codec::parse_uuid(0, &id_str)?,
        sender_id: codec::parse_uuid(1, &sender_str)?,
        sender_username,
        recipient_id: codec::parse_uuid(3, &recipient_str)?,
        recipient_username,
        content,
        created_at: codec::parse_timestamp(6, &created_str)?,
    })
}
