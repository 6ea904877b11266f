//! Column codecs shared by the per-entity row mappers.
//!
//! Every helper takes the column index so that decode failures surface as
//! `rusqlite::Error::FromSqlConversionFailure` against the offending column,
//! rejecting malformed rows instead of coercing them.

use std::collections::BTreeSet;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use uuid::Uuid;

use waymark_shared::{MediaKind, Privacy};

use crate::models::Comment;

fn bad_column(idx: usize, err: impl std::error::Error + Send + Sync + 'static) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

pub(crate) fn parse_uuid(idx: usize, raw: &str) -> rusqlite::Result<Uuid> {
    Uuid::parse_str(raw).map_err(|e| bad_column(idx, e))
}

pub(crate) fn parse_timestamp(idx: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| bad_column(idx, e))
}

pub(crate) fn parse_id_set(idx: usize, raw: &str) -> rusqlite::Result<BTreeSet<Uuid>> {
    serde_json::from_str(raw).map_err(|e| bad_column(idx, e))
}

pub(crate) fn parse_comments(idx: usize, raw: &str) -> rusqlite::Result<Vec<Comment>> {
    serde_json::from_str(raw).map_err(|e| bad_column(idx, e))
}

pub(crate) fn parse_privacy(idx: usize, raw: &str) -> rusqlite::Result<Privacy> {
    Privacy::from_str(raw).map_err(|e| bad_column(idx, e))
}

pub(crate) fn parse_media_kind(idx: usize, raw: &str) -> rusqlite::Result<MediaKind> {
    MediaKind::from_str(raw).map_err(|e| bad_column(idx, e))
}

pub(crate) fn encode_id_set(set: &BTreeSet<Uuid>) -> String {
    serde_json::to_string(set).unwrap_or_else(|_| "[]".to_string())
}

pub(crate) fn encode_comments(comments: &[Comment]) -> String {
    serde_json::to_string(comments).unwrap_or_else(|_| "[]".to_string())
}

/// Escape `%`, `_`, and the escape character itself, then wrap the term in
/// `%...%` for a substring `LIKE ... ESCAPE '\'` match. User input is always
/// treated as a literal, never as a pattern.
pub(crate) fn like_substring(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_set_round_trip() {
        let mut set = BTreeSet::new();
        set.insert(Uuid::new_v4());
        set.insert(Uuid::new_v4());
        let encoded = encode_id_set(&set);
        assert_eq!(parse_id_set(0, &encoded).unwrap(), set);
    }

    #[test]
    fn malformed_id_set_is_rejected() {
        assert!(parse_id_set(0, "not json").is_err());
        assert!(parse_id_set(0, r#"["not-a-uuid"]"#).is_err());
    }

    #[test]
    fn like_substring_escapes_wildcards() {
        assert_eq!(like_substring("50%_off\\"), "%50\\%\\_off\\\\%");
        assert_eq!(like_substring("plain"), "%plain%");
    }
}
