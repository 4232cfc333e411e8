//! The entity store — typed persistent records over SQLite.
//!
//! One module per entity family, all free functions over a borrowed
//! [`rusqlite::Connection`] (or `&mut Connection` where a multi-row
//! transaction is required). The store exclusively owns row lifecycles:
//! timestamps are maintained here, tag sets are deduplicated here, and FK
//! constraint failures are translated into the crate error taxonomy.

pub mod clients;
pub mod employers;
pub mod meetings;
pub mod notes;
pub mod people;
pub mod projects;
pub mod reminders;
pub mod sessions;
pub mod types;
pub mod user;

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, Row};
use rust_decimal::Decimal;

use crate::error::{MosaicError, Result};
use types::EntityKind;

/// Uniform storage format for instants: whole-second RFC 3339 with `+00:00`.
/// Keeping one format makes stored timestamps lexicographically comparable.
pub(crate) fn fmt_dt(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Secs, false)
}

pub(crate) fn fmt_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn conv_err(
    idx: usize,
    err: impl Into<Box<dyn std::error::Error + Send + Sync>>,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, err.into())
}

pub(crate) fn col_dt(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let s: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conv_err(idx, e))
}

pub(crate) fn col_dt_opt(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let s: Option<String> = row.get(idx)?;
    s.map(|s| {
        DateTime::parse_from_rfc3339(&s)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| conv_err(idx, e))
    })
    .transpose()
}

pub(crate) fn col_date(row: &Row<'_>, idx: usize) -> rusqlite::Result<NaiveDate> {
    let s: String = row.get(idx)?;
    NaiveDate::parse_from_str(&s, "%Y-%m-%d").map_err(|e| conv_err(idx, e))
}

pub(crate) fn col_date_opt(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<NaiveDate>> {
    let s: Option<String> = row.get(idx)?;
    s.map(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d").map_err(|e| conv_err(idx, e)))
        .transpose()
}

pub(crate) fn col_dec(row: &Row<'_>, idx: usize) -> rusqlite::Result<Decimal> {
    let s: String = row.get(idx)?;
    s.parse::<Decimal>().map_err(|e| conv_err(idx, e))
}

pub(crate) fn col_tags(row: &Row<'_>, idx: usize) -> rusqlite::Result<Vec<String>> {
    let s: String = row.get(idx)?;
    serde_json::from_str(&s).map_err(|e| conv_err(idx, e))
}

pub(crate) fn col_json_opt(
    row: &Row<'_>,
    idx: usize,
) -> rusqlite::Result<Option<serde_json::Value>> {
    let s: Option<String> = row.get(idx)?;
    s.map(|s| serde_json::from_str(&s).map_err(|e| conv_err(idx, e)))
        .transpose()
}

pub(crate) fn col_enum<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: std::str::FromStr<Err = String>,
{
    let s: String = row.get(idx)?;
    s.parse::<T>().map_err(|e| conv_err(idx, e))
}

pub(crate) fn col_enum_opt<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<T>>
where
    T: std::str::FromStr<Err = String>,
{
    let s: Option<String> = row.get(idx)?;
    s.map(|s| s.parse::<T>().map_err(|e| conv_err(idx, e)))
        .transpose()
}

/// Deduplicate a tag list, keeping first occurrences in order.
pub(crate) fn dedupe_tags(tags: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    tags.into_iter()
        .filter(|t| !t.trim().is_empty() && seen.insert(t.clone()))
        .collect()
}

pub(crate) fn tags_json(tags: &[String]) -> String {
    serde_json::to_string(tags).unwrap_or_else(|_| "[]".to_string())
}

/// Storage table backing an entity kind.
pub(crate) fn table_for(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::Person => "people",
        EntityKind::Client => "clients",
        EntityKind::Project => "projects",
        EntityKind::Employer => "employers",
        EntityKind::WorkSession => "work_sessions",
        EntityKind::Meeting => "meetings",
        EntityKind::Note => "notes",
        EntityKind::Reminder => "reminders",
    }
}

pub(crate) fn exists(conn: &Connection, table: &str, id: i64) -> Result<bool> {
    let n: i64 = conn.query_row(
        &format!("SELECT COUNT(*) FROM {table} WHERE id = ?1"),
        [id],
        |row| row.get(0),
    )?;
    Ok(n > 0)
}

/// Verify a polymorphic entity reference points at a real row.
pub(crate) fn require_entity(conn: &Connection, kind: EntityKind, id: i64) -> Result<()> {
    if exists(conn, table_for(kind), id)? {
        Ok(())
    } else {
        Err(MosaicError::not_found(kind.as_str(), id))
    }
}

/// Validate the all-or-nothing polymorphic reference pair shared by notes
/// and reminders, checking the target row exists when the pair is set.
pub(crate) fn validate_entity_ref(
    conn: &Connection,
    entity_type: Option<EntityKind>,
    entity_id: Option<i64>,
) -> Result<()> {
    match (entity_type, entity_id) {
        (None, None) => Ok(()),
        (Some(kind), Some(id)) => require_entity(conn, kind, id),
        _ => Err(MosaicError::invalid(
            "entity_type and entity_id must both be set or both be omitted",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn fmt_dt_truncates_to_whole_seconds() {
        let dt = Utc.with_ymd_and_hms(2026, 1, 15, 14, 0, 0).unwrap()
            + chrono::Duration::nanoseconds(123_456_789);
        assert_eq!(fmt_dt(dt), "2026-01-15T14:00:00+00:00");
    }

    #[test]
    fn dedupe_tags_keeps_first_occurrence() {
        let tags = vec![
            "billing".to_string(),
            "urgent".to_string(),
            "billing".to_string(),
            "".to_string(),
        ];
        assert_eq!(dedupe_tags(tags), vec!["billing", "urgent"]);
    }

    #[test]
    fn validate_entity_ref_rejects_half_set_pair() {
        let conn = crate::db::open_memory_database().unwrap();
        let err = validate_entity_ref(&conn, Some(EntityKind::Project), None).unwrap_err();
        assert_eq!(err.code(), "invalid_argument");
        let err = validate_entity_ref(&conn, None, Some(3)).unwrap_err();
        assert_eq!(err.code(), "invalid_argument");
    }

    #[test]
    fn validate_entity_ref_requires_target_row() {
        let conn = crate::db::open_memory_database().unwrap();
        let err = validate_entity_ref(&conn, Some(EntityKind::Project), Some(99)).unwrap_err();
        assert_eq!(err.code(), "not_found");
    }
}
