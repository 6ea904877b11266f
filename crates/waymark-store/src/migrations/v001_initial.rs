//! v001 -- Initial schema creation.
//!
//! Creates the five core tables: `users`, `pins`, `media`, `events`, and
//! `messages`.
//!
//! Set-valued fields (`friends`, `friend_requests`, `likes`, `attendees`)
//! and the embedded `comments` list are JSON text columns. There are no
//! foreign keys between `media` and `pins`: the cascade on pin deletion is
//! an explicit multi-step operation in the core, and partial failure is
//! allowed to leave orphans.

use rusqlite::Connection;

/// SQL executed when upgrading from version 0 to version 1.
const UP_SQL: &str = r#"
-- ----------------------------------------------------------------
-- Users
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS users (
    id              TEXT PRIMARY KEY NOT NULL,  -- UUID v4
    username        TEXT NOT NULL UNIQUE,
    email           TEXT NOT NULL UNIQUE,
    password_hash   TEXT,                       -- NULL for guest accounts
    profile_photo   TEXT,                       -- blob id, nullable
    is_guest        INTEGER NOT NULL DEFAULT 0, -- boolean 0/1
    friends         TEXT NOT NULL DEFAULT '[]', -- JSON array of user ids
    friend_requests TEXT NOT NULL DEFAULT '[]', -- JSON array of user ids
    created_at      TEXT NOT NULL               -- ISO-8601 / RFC-3339
);

-- ----------------------------------------------------------------
-- Pins
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS pins (
    id          TEXT PRIMARY KEY NOT NULL,      -- UUID v4
    owner_id    TEXT NOT NULL,
    username    TEXT NOT NULL,                  -- denormalized owner name
    title       TEXT NOT NULL,
    description TEXT NOT NULL,
    latitude    REAL NOT NULL,
    longitude   REAL NOT NULL,
    privacy     TEXT NOT NULL,                  -- public | friends | private
    likes       TEXT NOT NULL DEFAULT '[]',     -- JSON array of user ids
    comments    TEXT NOT NULL DEFAULT '[]',     -- JSON array of comment objects
    media_count INTEGER NOT NULL DEFAULT 0,
    created_at  TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_pins_owner ON pins(owner_id);
CREATE INDEX IF NOT EXISTS idx_pins_privacy_created ON pins(privacy, created_at DESC);

-- ----------------------------------------------------------------
-- Media (metadata rows; bytes live in the blob store)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS media (
    id         TEXT PRIMARY KEY NOT NULL,       -- UUID v4
    pin_id     TEXT NOT NULL,
    owner_id   TEXT NOT NULL,
    blob_id    TEXT NOT NULL,                   -- BLAKE3 content hash
    kind       TEXT NOT NULL,                   -- photo | video
    caption    TEXT,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_media_pin ON media(pin_id);

-- ----------------------------------------------------------------
-- Events
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS events (
    id            TEXT PRIMARY KEY NOT NULL,    -- UUID v4
    owner_id      TEXT NOT NULL,
    username      TEXT NOT NULL,                -- denormalized owner name
    title         TEXT NOT NULL,
    description   TEXT NOT NULL,
    event_date    TEXT NOT NULL,                -- ISO-8601 / RFC-3339
    latitude      REAL NOT NULL,
    longitude     REAL NOT NULL,
    location_name TEXT NOT NULL,
    attendees     TEXT NOT NULL DEFAULT '[]',   -- JSON array of user ids
    created_at    TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_events_date ON events(event_date);

-- ----------------------------------------------------------------
-- Messages
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS messages (
    id                 TEXT PRIMARY KEY NOT NULL,  -- UUID v4
    sender_id          TEXT NOT NULL,
    sender_username    TEXT NOT NULL,
    recipient_id       TEXT NOT NULL,
    recipient_username TEXT NOT NULL,
    content            TEXT NOT NULL,
    created_at         TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_messages_sender ON messages(sender_id, created_at DESC);
CREATE INDEX IF NOT EXISTS idx_messages_recipient ON messages(recipient_id, created_at DESC);
"#;

/// Apply the initial migration.
pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
