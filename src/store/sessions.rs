//! Work session rows — the billing-critical time entries.
//!
//! Durations are never taken from the caller: they are derived from the
//! interval via the rounding kernel, and re-derived whenever either endpoint
//! changes. `date` is the local calendar date of `start_time` in the user's
//! timezone.

use anyhow::anyhow;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{col_date, col_dec, col_dt, col_enum, col_tags, dedupe_tags, exists, fmt_date, fmt_dt, tags_json};
use crate::error::{MosaicError, Result};
use crate::rounding::duration_rounded;
use crate::store::types::{PrivacyLevel, WorkSession};

pub(crate) const COLUMNS: &str = "id, project_id, date, start_time, end_time, duration_hours, \
     summary, privacy_level, tags, created_at, updated_at";

pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<WorkSession> {
    Ok(WorkSession {
        id: row.get(0)?,
        project_id: row.get(1)?,
        date: col_date(row, 2)?,
        start_time: col_dt(row, 3)?,
        end_time: col_dt(row, 4)?,
        duration_hours: col_dec(row, 5)?,
        summary: row.get(6)?,
        privacy_level: col_enum(row, 7)?,
        tags: col_tags(row, 8)?,
        created_at: col_dt(row, 9)?,
        updated_at: col_dt(row, 10)?,
    })
}

pub struct NewWorkSession {
    pub project_id: i64,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub summary: Option<String>,
    pub privacy_level: PrivacyLevel,
    pub tags: Vec<String>,
}

pub fn log_session(conn: &Connection, tz: Tz, new: NewWorkSession) -> Result<WorkSession> {
    if !exists(conn, "projects", new.project_id)? {
        return Err(MosaicError::not_found("project", new.project_id));
    }
    if new.end_time <= new.start_time {
        return Err(MosaicError::invalid("end_time must be after start_time"));
    }

    let duration = duration_rounded(new.start_time, new.end_time)?;
    let date = new.start_time.with_timezone(&tz).date_naive();

    let now = fmt_dt(Utc::now());
    conn.execute(
        "INSERT INTO work_sessions (project_id, date, start_time, end_time, duration_hours, \
         summary, privacy_level, tags, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            new.project_id,
            fmt_date(date),
            fmt_dt(new.start_time),
            fmt_dt(new.end_time),
            duration.to_string(),
            new.summary,
            new.privacy_level.as_str(),
            tags_json(&dedupe_tags(new.tags)),
            now,
            now
        ],
    )?;

    let id = conn.last_insert_rowid();
    get_session(conn, id)?
        .ok_or_else(|| MosaicError::Internal(anyhow!("work session {id} missing after insert")))
}

pub fn get_session(conn: &Connection, id: i64) -> Result<Option<WorkSession>> {
    conn.query_row(
        &format!("SELECT {COLUMNS} FROM work_sessions WHERE id = ?1"),
        [id],
        from_row,
    )
    .optional()
    .map_err(Into::into)
}

#[derive(Default)]
pub struct WorkSessionPatch {
    pub project_id: Option<i64>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub summary: Option<String>,
    pub privacy_level: Option<PrivacyLevel>,
    pub tags: Option<Vec<String>>,
}

/// Update a work session. When either endpoint changes, `duration_hours` and
/// `date` are recomputed in the same commit.
pub fn update_session(conn: &Connection, tz: Tz, id: i64, patch: WorkSessionPatch) -> Result<WorkSession> {
    let existing =
        get_session(conn, id)?.ok_or_else(|| MosaicError::not_found("work session", id))?;

    let project_id = patch.project_id.unwrap_or(existing.project_id);
    if !exists(conn, "projects", project_id)? {
        return Err(MosaicError::not_found("project", project_id));
    }

    let times_changed = patch.start_time.is_some() || patch.end_time.is_some();
    let start_time = patch.start_time.unwrap_or(existing.start_time);
    let end_time = patch.end_time.unwrap_or(existing.end_time);
    if end_time <= start_time {
        return Err(MosaicError::invalid("end_time must be after start_time"));
    }

    let (duration, date) = if times_changed {
        (
            duration_rounded(start_time, end_time)?,
            start_time.with_timezone(&tz).date_naive(),
        )
    } else {
        (existing.duration_hours, existing.date)
    };

    let tags = patch.tags.map(dedupe_tags).unwrap_or(existing.tags);

    conn.execute(
        "UPDATE work_sessions SET project_id = ?1, date = ?2, start_time = ?3, end_time = ?4, \
         duration_hours = ?5, summary = ?6, privacy_level = ?7, tags = ?8, updated_at = ?9 \
         WHERE id = ?10",
        params![
            project_id,
            fmt_date(date),
            fmt_dt(start_time),
            fmt_dt(end_time),
            duration.to_string(),
            patch.summary.or(existing.summary),
            patch
                .privacy_level
                .unwrap_or(existing.privacy_level)
                .as_str(),
            tags_json(&tags),
            fmt_dt(Utc::now()),
            id
        ],
    )?;

    get_session(conn, id)?
        .ok_or_else(|| MosaicError::Internal(anyhow!("work session {id} missing after update")))
}

pub fn delete_session(conn: &Connection, id: i64) -> Result<bool> {
    let affected = conn.execute("DELETE FROM work_sessions WHERE id = ?1", [id])?;
    Ok(affected > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn seed_project(conn: &Connection) -> i64 {
        let client = crate::store::clients::create_client(
            conn,
            crate::store::clients::NewClient {
                name: "Acme Corp".into(),
                client_type: crate::store::types::ClientType::Company,
                status: crate::store::types::ClientStatus::Active,
                contact_person_id: None,
                notes: None,
                tags: vec![],
            },
        )
        .unwrap();
        crate::store::projects::create_project(
            conn,
            crate::store::projects::NewProject {
                name: "Website".into(),
                client_id: client.id,
                on_behalf_of: None,
                description: None,
                status: crate::store::types::ProjectStatus::Active,
                start_date: None,
                end_date: None,
                tags: vec![],
            },
        )
        .unwrap()
        .id
    }

    #[test]
    fn logged_session_derives_duration_and_date() {
        let conn = crate::db::open_memory_database().unwrap();
        let project_id = seed_project(&conn);

        let session = log_session(
            &conn,
            chrono_tz::UTC,
            NewWorkSession {
                project_id,
                start_time: Utc.with_ymd_and_hms(2026, 1, 15, 14, 0, 0).unwrap(),
                end_time: Utc.with_ymd_and_hms(2026, 1, 15, 15, 45, 0).unwrap(),
                summary: Some("API integration".into()),
                privacy_level: PrivacyLevel::Private,
                tags: vec![],
            },
        )
        .unwrap();

        assert_eq!(session.duration_hours.to_string(), "2.0");
        assert_eq!(session.date.to_string(), "2026-01-15");
    }

    #[test]
    fn date_follows_user_timezone() {
        let conn = crate::db::open_memory_database().unwrap();
        let project_id = seed_project(&conn);

        // 02:00 UTC is still the previous evening in New York
        let session = log_session(
            &conn,
            chrono_tz::America::New_York,
            NewWorkSession {
                project_id,
                start_time: Utc.with_ymd_and_hms(2026, 1, 16, 2, 0, 0).unwrap(),
                end_time: Utc.with_ymd_and_hms(2026, 1, 16, 3, 0, 0).unwrap(),
                summary: None,
                privacy_level: PrivacyLevel::Private,
                tags: vec![],
            },
        )
        .unwrap();

        assert_eq!(session.date.to_string(), "2026-01-15");
    }

    #[test]
    fn update_with_new_times_recomputes_duration() {
        let conn = crate::db::open_memory_database().unwrap();
        let project_id = seed_project(&conn);

        let session = log_session(
            &conn,
            chrono_tz::UTC,
            NewWorkSession {
                project_id,
                start_time: Utc.with_ymd_and_hms(2026, 1, 15, 9, 0, 0).unwrap(),
                end_time: Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap(),
                summary: None,
                privacy_level: PrivacyLevel::Private,
                tags: vec![],
            },
        )
        .unwrap();
        assert_eq!(session.duration_hours.to_string(), "1.0");

        let updated = update_session(
            &conn,
            chrono_tz::UTC,
            session.id,
            WorkSessionPatch {
                end_time: Some(Utc.with_ymd_and_hms(2026, 1, 15, 11, 40, 0).unwrap()),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(updated.duration_hours.to_string(), "3.0");
    }

    #[test]
    fn update_without_times_keeps_duration() {
        let conn = crate::db::open_memory_database().unwrap();
        let project_id = seed_project(&conn);

        let session = log_session(
            &conn,
            chrono_tz::UTC,
            NewWorkSession {
                project_id,
                start_time: Utc.with_ymd_and_hms(2026, 1, 15, 9, 0, 0).unwrap(),
                end_time: Utc.with_ymd_and_hms(2026, 1, 15, 10, 15, 0).unwrap(),
                summary: None,
                privacy_level: PrivacyLevel::Private,
                tags: vec![],
            },
        )
        .unwrap();

        let updated = update_session(
            &conn,
            chrono_tz::UTC,
            session.id,
            WorkSessionPatch {
                summary: Some("retro".into()),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(updated.duration_hours, session.duration_hours);
        assert_eq!(updated.date, session.date);
    }

    #[test]
    fn reversed_interval_is_rejected() {
        let conn = crate::db::open_memory_database().unwrap();
        let project_id = seed_project(&conn);

        let err = log_session(
            &conn,
            chrono_tz::UTC,
            NewWorkSession {
                project_id,
                start_time: Utc.with_ymd_and_hms(2026, 1, 15, 15, 0, 0).unwrap(),
                end_time: Utc.with_ymd_and_hms(2026, 1, 15, 14, 0, 0).unwrap(),
                summary: None,
                privacy_level: PrivacyLevel::Private,
                tags: vec![],
            },
        )
        .unwrap_err();
        assert_eq!(err.code(), "invalid_argument");
    }
}
