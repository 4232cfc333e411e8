//! Meeting rows, attendees, and the meeting→work-session linker.
//!
//! [`log_meeting`] is the atomic path: when a project is attached, the
//! meeting and its auto-generated work session commit together or not at
//! all. Updates never cascade into previously generated work sessions.

use anyhow::anyhow;
use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{col_dt, col_enum, col_tags, dedupe_tags, exists, fmt_date, fmt_dt, tags_json};
use crate::error::{MosaicError, Result};
use crate::rounding::round_half_hour;
use crate::store::sessions;
use crate::store::types::{Meeting, PrivacyLevel, WorkSession};

pub(crate) const COLUMNS: &str = "id, title, start_time, duration_minutes, summary, \
     privacy_level, project_id, meeting_type, location, tags, created_at, updated_at";

/// Maps a meeting row; `attendee_ids` is filled by [`attach_attendees`].
pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Meeting> {
    Ok(Meeting {
        id: row.get(0)?,
        title: row.get(1)?,
        start_time: col_dt(row, 2)?,
        duration_minutes: row.get(3)?,
        summary: row.get(4)?,
        privacy_level: col_enum(row, 5)?,
        project_id: row.get(6)?,
        meeting_type: row.get(7)?,
        location: row.get(8)?,
        attendee_ids: Vec::new(),
        tags: col_tags(row, 9)?,
        created_at: col_dt(row, 10)?,
        updated_at: col_dt(row, 11)?,
    })
}

/// Load attendee person ids for each meeting, in insertion order.
pub(crate) fn attach_attendees(conn: &Connection, meetings: &mut [Meeting]) -> Result<()> {
    let mut stmt =
        conn.prepare("SELECT person_id FROM meeting_attendees WHERE meeting_id = ?1 ORDER BY id")?;
    for meeting in meetings.iter_mut() {
        meeting.attendee_ids = stmt
            .query_map([meeting.id], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<i64>>>()?;
    }
    Ok(())
}

pub struct NewMeeting {
    pub title: String,
    pub start_time: DateTime<Utc>,
    pub duration_minutes: i64,
    pub summary: Option<String>,
    pub privacy_level: PrivacyLevel,
    pub project_id: Option<i64>,
    pub meeting_type: Option<String>,
    pub location: Option<String>,
    pub attendee_ids: Vec<i64>,
    pub tags: Vec<String>,
}

#[derive(Debug)]
pub struct LoggedMeeting {
    pub meeting: Meeting,
    pub auto_work_session: Option<WorkSession>,
}

/// Create a meeting and, when a project is attached, the derived work
/// session, atomically.
pub fn log_meeting(conn: &mut Connection, tz: Tz, new: NewMeeting) -> Result<LoggedMeeting> {
    if new.title.trim().is_empty() {
        return Err(MosaicError::invalid("meeting title must not be empty"));
    }
    if new.duration_minutes <= 0 {
        return Err(MosaicError::invalid("duration_minutes must be positive"));
    }

    let tx = conn.transaction()?;

    if let Some(project_id) = new.project_id {
        if !exists(&tx, "projects", project_id)? {
            return Err(MosaicError::not_found("project", project_id));
        }
    }

    let tags = dedupe_tags(new.tags);
    let now = fmt_dt(Utc::now());
    tx.execute(
        "INSERT INTO meetings (title, start_time, duration_minutes, summary, privacy_level, \
         project_id, meeting_type, location, tags, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            new.title,
            fmt_dt(new.start_time),
            new.duration_minutes,
            new.summary,
            new.privacy_level.as_str(),
            new.project_id,
            new.meeting_type,
            new.location,
            tags_json(&tags),
            now,
            now
        ],
    )?;
    let meeting_id = tx.last_insert_rowid();

    for person_id in &new.attendee_ids {
        tx.execute(
            "INSERT INTO meeting_attendees (meeting_id, person_id) VALUES (?1, ?2)",
            params![meeting_id, person_id],
        )?;
    }

    // The derived work session covers exactly the meeting interval, with the
    // duration going through the rounding kernel.
    let session_id = if let Some(project_id) = new.project_id {
        let end_time = new.start_time + Duration::minutes(new.duration_minutes);
        let duration = round_half_hour(new.duration_minutes);
        let date = new.start_time.with_timezone(&tz).date_naive();
        tx.execute(
            "INSERT INTO work_sessions (project_id, date, start_time, end_time, duration_hours, \
             summary, privacy_level, tags, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                project_id,
                fmt_date(date),
                fmt_dt(new.start_time),
                fmt_dt(end_time),
                duration.to_string(),
                new.title,
                new.privacy_level.as_str(),
                tags_json(&tags),
                now,
                now
            ],
        )?;
        Some(tx.last_insert_rowid())
    } else {
        None
    };

    let mut meeting = tx
        .query_row(
            &format!("SELECT {COLUMNS} FROM meetings WHERE id = ?1"),
            [meeting_id],
            from_row,
        )
        .map_err(MosaicError::from)?;
    meeting.attendee_ids = new.attendee_ids.clone();

    let auto_work_session = session_id
        .map(|id| {
            tx.query_row(
                &format!(
                    "SELECT {} FROM work_sessions WHERE id = ?1",
                    sessions::COLUMNS
                ),
                [id],
                sessions::from_row,
            )
        })
        .transpose()
        .map_err(MosaicError::from)?;

    tx.commit()?;

    Ok(LoggedMeeting {
        meeting,
        auto_work_session,
    })
}

pub fn get_meeting(conn: &Connection, id: i64) -> Result<Option<Meeting>> {
    let meeting = conn
        .query_row(
            &format!("SELECT {COLUMNS} FROM meetings WHERE id = ?1"),
            [id],
            from_row,
        )
        .optional()?;

    match meeting {
        Some(meeting) => {
            let mut meetings = [meeting];
            attach_attendees(conn, &mut meetings)?;
            let [meeting] = meetings;
            Ok(Some(meeting))
        }
        None => Ok(None),
    }
}

#[derive(Default)]
pub struct MeetingPatch {
    pub title: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub duration_minutes: Option<i64>,
    pub summary: Option<String>,
    pub privacy_level: Option<PrivacyLevel>,
    pub project_id: Option<i64>,
    pub meeting_type: Option<String>,
    pub location: Option<String>,
    pub attendee_ids: Option<Vec<i64>>,
    pub tags: Option<Vec<String>>,
}

/// Update a meeting. Auto-generated work sessions are left intact whatever
/// changes here, including `project_id`.
pub fn update_meeting(conn: &mut Connection, id: i64, patch: MeetingPatch) -> Result<Meeting> {
    let existing = get_meeting(conn, id)?.ok_or_else(|| MosaicError::not_found("meeting", id))?;

    let title = patch.title.unwrap_or(existing.title);
    if title.trim().is_empty() {
        return Err(MosaicError::invalid("meeting title must not be empty"));
    }
    let duration_minutes = patch.duration_minutes.unwrap_or(existing.duration_minutes);
    if duration_minutes <= 0 {
        return Err(MosaicError::invalid("duration_minutes must be positive"));
    }
    let project_id = patch.project_id.or(existing.project_id);
    if let Some(pid) = patch.project_id {
        if !exists(conn, "projects", pid)? {
            return Err(MosaicError::not_found("project", pid));
        }
    }
    let tags = patch.tags.map(dedupe_tags).unwrap_or(existing.tags);

    let tx = conn.transaction()?;
    tx.execute(
        "UPDATE meetings SET title = ?1, start_time = ?2, duration_minutes = ?3, summary = ?4, \
         privacy_level = ?5, project_id = ?6, meeting_type = ?7, location = ?8, tags = ?9, \
         updated_at = ?10 WHERE id = ?11",
        params![
            title,
            fmt_dt(patch.start_time.unwrap_or(existing.start_time)),
            duration_minutes,
            patch.summary.or(existing.summary),
            patch
                .privacy_level
                .unwrap_or(existing.privacy_level)
                .as_str(),
            project_id,
            patch.meeting_type.or(existing.meeting_type),
            patch.location.or(existing.location),
            tags_json(&tags),
            fmt_dt(Utc::now()),
            id
        ],
    )?;

    if let Some(attendee_ids) = &patch.attendee_ids {
        tx.execute("DELETE FROM meeting_attendees WHERE meeting_id = ?1", [id])?;
        for person_id in attendee_ids {
            tx.execute(
                "INSERT INTO meeting_attendees (meeting_id, person_id) VALUES (?1, ?2)",
                params![id, person_id],
            )?;
        }
    }
    tx.commit()?;

    get_meeting(conn, id)?
        .ok_or_else(|| MosaicError::Internal(anyhow!("meeting {id} missing after update")))
}

pub fn delete_meeting(conn: &Connection, id: i64) -> Result<bool> {
    let affected = conn.execute("DELETE FROM meetings WHERE id = ?1", [id])?;
    Ok(affected > 0)
}
