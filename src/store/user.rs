//! The singleton user profile.
//!
//! The row is created lazily from configured defaults on first access; its
//! timezone and week boundary drive date derivation, time shortcuts, and
//! recurrence math everywhere else.

use chrono::Utc;
use chrono_tz::Tz;
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{col_dt, col_enum, fmt_dt};
use crate::error::{MosaicError, Result};
use crate::store::types::{PrivacyLevel, UserProfile, WeekBoundary};

const COLUMNS: &str =
    "id, name, email, timezone, week_boundary, default_privacy_level, created_at, updated_at";

fn from_row(row: &Row<'_>) -> rusqlite::Result<UserProfile> {
    Ok(UserProfile {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        timezone: row.get(3)?,
        week_boundary: col_enum(row, 4)?,
        default_privacy_level: col_enum(row, 5)?,
        created_at: col_dt(row, 6)?,
        updated_at: col_dt(row, 7)?,
    })
}

/// Defaults for lazily creating the singleton row.
#[derive(Debug, Clone)]
pub struct ProfileDefaults {
    pub name: String,
    pub timezone: String,
    pub week_boundary: WeekBoundary,
    pub default_privacy_level: PrivacyLevel,
}

impl Default for ProfileDefaults {
    fn default() -> Self {
        Self {
            name: "Mosaic".into(),
            timezone: "UTC".into(),
            week_boundary: WeekBoundary::Monday,
            default_privacy_level: PrivacyLevel::Private,
        }
    }
}

pub fn get_or_create_user(conn: &Connection, defaults: &ProfileDefaults) -> Result<UserProfile> {
    let existing = conn
        .query_row(
            &format!("SELECT {COLUMNS} FROM users ORDER BY id LIMIT 1"),
            [],
            from_row,
        )
        .optional()?;
    if let Some(profile) = existing {
        return Ok(profile);
    }

    let now = fmt_dt(Utc::now());
    conn.execute(
        "INSERT INTO users (name, email, timezone, week_boundary, default_privacy_level, \
         created_at, updated_at) VALUES (?1, NULL, ?2, ?3, ?4, ?5, ?6)",
        params![
            defaults.name,
            defaults.timezone,
            defaults.week_boundary.as_str(),
            defaults.default_privacy_level.as_str(),
            now,
            now
        ],
    )?;

    let id = conn.last_insert_rowid();
    conn.query_row(
        &format!("SELECT {COLUMNS} FROM users WHERE id = ?1"),
        [id],
        from_row,
    )
    .map_err(Into::into)
}

#[derive(Default)]
pub struct UserPatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub timezone: Option<String>,
    pub week_boundary: Option<WeekBoundary>,
    pub default_privacy_level: Option<PrivacyLevel>,
}

pub fn update_user(
    conn: &Connection,
    defaults: &ProfileDefaults,
    patch: UserPatch,
) -> Result<UserProfile> {
    let existing = get_or_create_user(conn, defaults)?;

    let timezone = patch.timezone.unwrap_or(existing.timezone);
    parse_timezone(&timezone)?;

    conn.execute(
        "UPDATE users SET name = ?1, email = ?2, timezone = ?3, week_boundary = ?4, \
         default_privacy_level = ?5, updated_at = ?6 WHERE id = ?7",
        params![
            patch.name.unwrap_or(existing.name),
            patch.email.or(existing.email),
            timezone,
            patch
                .week_boundary
                .unwrap_or(existing.week_boundary)
                .as_str(),
            patch
                .default_privacy_level
                .unwrap_or(existing.default_privacy_level)
                .as_str(),
            fmt_dt(Utc::now()),
            existing.id
        ],
    )?;

    get_or_create_user(conn, defaults)
}

/// Parse an IANA timezone name.
pub fn parse_timezone(name: &str) -> Result<Tz> {
    name.parse::<Tz>()
        .map_err(|_| MosaicError::invalid(format!("unknown timezone: {name}")))
}

/// The user's timezone, falling back to UTC when the stored name no longer
/// parses (e.g. after a tzdata change).
pub fn user_timezone(profile: &UserProfile) -> Tz {
    profile.timezone.parse::<Tz>().unwrap_or_else(|_| {
        tracing::warn!(timezone = %profile.timezone, "stored timezone invalid, using UTC");
        Tz::UTC
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_access_creates_singleton() {
        let conn = crate::db::open_memory_database().unwrap();
        let defaults = ProfileDefaults::default();

        let a = get_or_create_user(&conn, &defaults).unwrap();
        let b = get_or_create_user(&conn, &defaults).unwrap();
        assert_eq!(a.id, b.id);

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM users", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn update_rejects_unknown_timezone() {
        let conn = crate::db::open_memory_database().unwrap();
        let defaults = ProfileDefaults::default();
        let err = update_user(
            &conn,
            &defaults,
            UserPatch {
                timezone: Some("Mars/Olympus_Mons".into()),
                ..Default::default()
            },
        )
        .unwrap_err();
        assert_eq!(err.code(), "invalid_argument");
    }

    #[test]
    fn update_persists_preferences() {
        let conn = crate::db::open_memory_database().unwrap();
        let defaults = ProfileDefaults::default();
        let updated = update_user(
            &conn,
            &defaults,
            UserPatch {
                name: Some("Jordan".into()),
                timezone: Some("America/New_York".into()),
                week_boundary: Some(WeekBoundary::Sunday),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(updated.name, "Jordan");
        assert_eq!(updated.timezone, "America/New_York");
        assert_eq!(updated.week_boundary, WeekBoundary::Sunday);
    }
}
