//! CRUD operations for [`User`] records.

use std::collections::BTreeSet;

use rusqlite::params;
use uuid::Uuid;

use crate::codec;
use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::User;

const USER_COLUMNS: &str = "id, username, email, password_hash, profile_photo, is_guest, \
     friends, friend_requests, created_at";

impl Database {
    // ------------------------------------------------------------------
    // Create
    // ------------------------------------------------------------------

    /// Insert a new user.
    pub fn insert_user(&self, user: &User) -> Result<()> {
        self.conn().execute(
            "INSERT INTO users (id, username, email, password_hash, profile_photo, is_guest,
                                friends, friend_requests, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                user.id.to_string(),
                user.username,
                user.email,
                user.password_hash,
                user.profile_photo,
                user.is_guest as i32,
                codec::encode_id_set(&user.friends),
                codec::encode_id_set(&user.friend_requests),
                user.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    /// Fetch a single user by UUID.
    pub fn get_user(&self, id: Uuid) -> Result<User> {
        self.conn()
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
                params![id.to_string()],
                row_to_user,
            )
            .map_err(not_found)
    }

    /// Fetch a single user by email address.
    pub fn get_user_by_email(&self, email: &str) -> Result<User> {
        self.conn()
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1"),
                params![email],
                row_to_user,
            )
            .map_err(not_found)
    }

    /// Whether an account with this username or email already exists.
    pub fn user_exists(&self, username: &str, email: &str) -> Result<bool> {
        let count: i64 = self.conn().query_row(
            "SELECT COUNT(*) FROM users WHERE username = ?1 OR email = ?2",
            params![username, email],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Fetch every user whose id is in `ids`, in store order. Missing ids
    /// are silently skipped.
    pub fn get_users_by_ids(&self, ids: &BTreeSet<Uuid>) -> Result<Vec<User>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = vec!["?"; ids.len()].join(", ");
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id IN ({placeholders})");
        let id_strings: Vec<String> = ids.iter().map(Uuid::to_string).collect();

        let mut stmt = self.conn().prepare(&sql)?;
        let rows = stmt.query_map(rusqlite::params_from_iter(id_strings.iter()), row_to_user)?;

        let mut users = Vec::new();
        for row in rows {
            users.push(row?);
        }
        Ok(users)
    }

    /// Case-insensitive substring search over username and email, excluding
    /// the searching user. No ordering beyond store order.
    pub fn search_users(&self, term: &str, exclude: Uuid, limit: u32) -> Result<Vec<User>> {
        let pattern = codec::like_substring(term);
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {USER_COLUMNS} FROM users
             WHERE (username LIKE ?1 ESCAPE '\\' OR email LIKE ?1 ESCAPE '\\')
               AND id != ?2
             LIMIT ?3"
        ))?;

        let rows = stmt.query_map(params![pattern, exclude.to_string(), limit], row_to_user)?;

        let mut users = Vec::new();
        for row in rows {
            users.push(row?);
        }
        Ok(users)
    }

    // ------------------------------------------------------------------
    // Update
    // ------------------------------------------------------------------

    /// Overwrite a user's friend and friend-request sets in one statement.
    /// Returns `true` if a row was updated.
    pub fn update_friend_sets(
        &self,
        id: Uuid,
        friends: &BTreeSet<Uuid>,
        friend_requests: &BTreeSet<Uuid>,
    ) -> Result<bool> {
        let affected = self.conn().execute(
            "UPDATE users SET friends = ?1, friend_requests = ?2 WHERE id = ?3",
            params![
                codec::encode_id_set(friends),
                codec::encode_id_set(friend_requests),
                id.to_string(),
            ],
        )?;
        Ok(affected > 0)
    }

    /// Point a user's profile photo at a blob id. Returns `true` if a row
    /// was updated.
    pub fn set_profile_photo(&self, id: Uuid, blob_id: &str) -> Result<bool> {
        let affected = self.conn().execute(
            "UPDATE users SET profile_photo = ?1 WHERE id = ?2",
            params![blob_id, id.to_string()],
        )?;
        Ok(affected > 0)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn not_found(e: rusqlite::Error) -> StoreError {
    match e {
        rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
        other => StoreError::Sqlite(other),
    }
}

/// Map a `rusqlite::Row` to a [`User`].
fn row_to_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    let id_str: String = row.get(0)?;
    let username: String = row.get(1)?;
    let email: String = row.get(2)?;
    let password_hash: Option<String> = row.get(3)?;
    let profile_photo: Option<String> = row.get(4)?;
    let is_guest_int: i32 = row.get(5)?;
    let friends_str: String = row.get(6)?;
    let requests_str: String = row.get(7)?;
    let created_str: String = row.get(8)?;

    Ok(User {
        id: codec::parse_uuid(0, &id_str)?,
        username,
        email,
        password_hash,
        profile_photo,
        is_guest: is_guest_int != 0,
        friends: codec::parse_id_set(6, &friends_str)?,
        friend_requests: codec::parse_id_set(7, &requests_str)?,
        created_at: codec::parse_timestamp(8, &created_str)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn sample_user(name: &str) -> User {
        User {
            id: Uuid::new_v4(),
            username: name.to_string(),
            email: format!("{name}@example.com"),
            password_hash: Some("$argon2id$stub".to_string()),
            profile_photo: None,
            is_guest: false,
            friends: BTreeSet::new(),
            friend_requests: BTreeSet::new(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn insert_and_get_round_trip() {
        let db = Database::open_in_memory().unwrap();
        let user = sample_user("ada");
        db.insert_user(&user).unwrap();

        let fetched = db.get_user(user.id).unwrap();
        assert_eq!(fetched, user);
        assert_eq!(db.get_user_by_email("ada@example.com").unwrap().id, user.id);
    }

    #[test]
    fn get_missing_user_is_not_found() {
        let db = Database::open_in_memory().unwrap();
        assert!(matches!(
            db.get_user(Uuid::new_v4()),
            Err(StoreError::NotFound)
        ));
    }

    #[test]
    fn user_exists_matches_either_field() {
        let db = Database::open_in_memory().unwrap();
        db.insert_user(&sample_user("ada")).unwrap();

        assert!(db.user_exists("ada", "other@example.com").unwrap());
        assert!(db.user_exists("other", "ada@example.com").unwrap());
        assert!(!db.user_exists("other", "other@example.com").unwrap());
    }

    #[test]
    fn search_users_is_case_insensitive_and_excludes_self() {
        let db = Database::open_in_memory().unwrap();
        let ada = sample_user("Ada");
        let adam = sample_user("adam");
        let eve = sample_user("eve");
        for u in [&ada, &adam, &eve] {
            db.insert_user(u).unwrap();
        }

        let hits = db.search_users("AD", eve.id, 20).unwrap();
        let names: Vec<_> = hits.iter().map(|u| u.username.as_str()).collect();
        assert_eq!(names.len(), 2);
        assert!(names.contains(&"Ada") && names.contains(&"adam"));

        // The searching user never appears in their own results.
        let hits = db.search_users("ad", ada.id, 20).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].username, "adam");
    }

    #[test]
    fn friend_sets_round_trip() {
        let db = Database::open_in_memory().unwrap();
        let mut user = sample_user("ada");
        db.insert_user(&user).unwrap();

        user.friends.insert(Uuid::new_v4());
        user.friend_requests.insert(Uuid::new_v4());
        assert!(db
            .update_friend_sets(user.id, &user.friends, &user.friend_requests)
            .unwrap());

        let fetched = db.get_user(user.id).unwrap();
        assert_eq!(fetched.friends, user.friends);
        assert_eq!(fetched.friend_requests, user.friend_requests);
    }

    #[test]
    fn get_users_by_ids_skips_missing() {
        let db = Database::open_in_memory().unwrap();
        let ada = sample_user("ada");
        db.insert_user(&ada).unwrap();

        let ids = BTreeSet::from([ada.id, Uuid::new_v4()]);
        let users = db.get_users_by_ids(&ids).unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].id, ada.id);
    }
}
