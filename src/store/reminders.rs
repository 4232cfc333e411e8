//! Reminder rows — creation, completion with recurrence, snoozing, and the
//! scheduler's due-scan bookkeeping.
//!
//! A reminder is due when it is not completed, its time has arrived, and any
//! snooze has lapsed. `last_dispatched_at` records the dispatch instant so a
//! reminder fires at most once per `reminder_time` (or per lapsed snooze)
//! until the user advances its state.

use anyhow::anyhow;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{
    col_dt, col_dt_opt, col_enum_opt, col_tags, dedupe_tags, fmt_dt, tags_json,
    validate_entity_ref,
};
use crate::error::{MosaicError, Result};
use crate::recurrence::next_occurrence;
use crate::store::types::{EntityKind, RecurrenceConfig, Reminder};

pub(crate) const COLUMNS: &str = "id, reminder_time, message, is_completed, recurrence_config, \
     related_entity_type, related_entity_id, snoozed_until, last_dispatched_at, tags, \
     created_at, updated_at";

pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Reminder> {
    let recurrence: Option<String> = row.get(4)?;
    let recurrence_config = recurrence
        .map(|s| serde_json::from_str::<RecurrenceConfig>(&s))
        .transpose()
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                4,
                rusqlite::types::Type::Text,
                Box::new(e),
            )
        })?;

    Ok(Reminder {
        id: row.get(0)?,
        reminder_time: col_dt(row, 1)?,
        message: row.get(2)?,
        is_completed: row.get(3)?,
        recurrence_config,
        related_entity_type: col_enum_opt(row, 5)?,
        related_entity_id: row.get(6)?,
        snoozed_until: col_dt_opt(row, 7)?,
        last_dispatched_at: col_dt_opt(row, 8)?,
        tags: col_tags(row, 9)?,
        created_at: col_dt(row, 10)?,
        updated_at: col_dt(row, 11)?,
    })
}

pub struct NewReminder {
    pub reminder_time: DateTime<Utc>,
    pub message: String,
    pub recurrence_config: Option<RecurrenceConfig>,
    pub related_entity_type: Option<EntityKind>,
    pub related_entity_id: Option<i64>,
    pub tags: Vec<String>,
}

pub fn create_reminder(conn: &Connection, new: NewReminder) -> Result<Reminder> {
    if new.message.trim().is_empty() {
        return Err(MosaicError::invalid("reminder message must not be empty"));
    }
    if let Some(config) = &new.recurrence_config {
        config.validate().map_err(MosaicError::InvalidArgument)?;
    }
    validate_entity_ref(conn, new.related_entity_type, new.related_entity_id)?;

    let recurrence_json = new
        .recurrence_config
        .as_ref()
        .map(serde_json::to_string)
        .transpose()
        .map_err(|e| MosaicError::Internal(anyhow!("recurrence serialization: {e}")))?;

    let now = fmt_dt(Utc::now());
    conn.execute(
        "INSERT INTO reminders (reminder_time, message, is_completed, recurrence_config, \
         related_entity_type, related_entity_id, snoozed_until, last_dispatched_at, tags, \
         created_at, updated_at)
         VALUES (?1, ?2, 0, ?3, ?4, ?5, NULL, NULL, ?6, ?7, ?8)",
        params![
            fmt_dt(new.reminder_time),
            new.message,
            recurrence_json,
            new.related_entity_type.map(|k| k.as_str()),
            new.related_entity_id,
            tags_json(&dedupe_tags(new.tags)),
            now,
            now
        ],
    )?;

    let id = conn.last_insert_rowid();
    get_reminder(conn, id)?
        .ok_or_else(|| MosaicError::Internal(anyhow!("reminder {id} missing after insert")))
}

pub fn get_reminder(conn: &Connection, id: i64) -> Result<Option<Reminder>> {
    conn.query_row(
        &format!("SELECT {COLUMNS} FROM reminders WHERE id = ?1"),
        [id],
        from_row,
    )
    .optional()
    .map_err(Into::into)
}

#[derive(Debug, serde::Serialize)]
pub struct CompletionOutcome {
    pub completed: Reminder,
    pub next_occurrence: Option<Reminder>,
}

/// Mark a reminder completed; for recurring reminders, materialize the next
/// occurrence in the same transaction.
pub fn complete_reminder(conn: &mut Connection, tz: Tz, id: i64) -> Result<CompletionOutcome> {
    let tx = conn.transaction()?;

    let reminder = tx
        .query_row(
            &format!("SELECT {COLUMNS} FROM reminders WHERE id = ?1"),
            [id],
            from_row,
        )
        .optional()?
        .ok_or_else(|| MosaicError::not_found("reminder", id))?;

    if reminder.is_completed {
        return Err(MosaicError::Conflict(format!(
            "reminder {id} is already completed"
        )));
    }

    let now = fmt_dt(Utc::now());
    tx.execute(
        "UPDATE reminders SET is_completed = 1, snoozed_until = NULL, updated_at = ?1 WHERE id = ?2",
        params![now, id],
    )?;

    let next_id = if let Some(config) = &reminder.recurrence_config {
        let next_time = next_occurrence(reminder.reminder_time, config, tz)?;
        let recurrence_json = serde_json::to_string(config)
            .map_err(|e| MosaicError::Internal(anyhow!("recurrence serialization: {e}")))?;
        tx.execute(
            "INSERT INTO reminders (reminder_time, message, is_completed, recurrence_config, \
             related_entity_type, related_entity_id, snoozed_until, last_dispatched_at, tags, \
             created_at, updated_at)
             VALUES (?1, ?2, 0, ?3, ?4, ?5, NULL, NULL, ?6, ?7, ?8)",
            params![
                fmt_dt(next_time),
                reminder.message,
                recurrence_json,
                reminder.related_entity_type.map(|k| k.as_str()),
                reminder.related_entity_id,
                tags_json(&reminder.tags),
                now,
                now
            ],
        )?;
        Some(tx.last_insert_rowid())
    } else {
        None
    };

    let completed = tx.query_row(
        &format!("SELECT {COLUMNS} FROM reminders WHERE id = ?1"),
        [id],
        from_row,
    )?;
    let next = next_id
        .map(|nid| {
            tx.query_row(
                &format!("SELECT {COLUMNS} FROM reminders WHERE id = ?1"),
                [nid],
                from_row,
            )
        })
        .transpose()?;

    tx.commit()?;

    Ok(CompletionOutcome {
        completed,
        next_occurrence: next,
    })
}

/// Snooze a reminder. Leaves `reminder_time` and recurrence untouched.
pub fn snooze_reminder(
    conn: &Connection,
    id: i64,
    until: DateTime<Utc>,
) -> Result<Reminder> {
    let reminder =
        get_reminder(conn, id)?.ok_or_else(|| MosaicError::not_found("reminder", id))?;

    if reminder.is_completed {
        return Err(MosaicError::Conflict(format!(
            "reminder {id} is already completed"
        )));
    }
    if until <= reminder.reminder_time {
        return Err(MosaicError::invalid(
            "snoozed_until must be after the reminder time",
        ));
    }

    conn.execute(
        "UPDATE reminders SET snoozed_until = ?1, updated_at = ?2 WHERE id = ?3",
        params![fmt_dt(until), fmt_dt(Utc::now()), id],
    )?;

    get_reminder(conn, id)?
        .ok_or_else(|| MosaicError::Internal(anyhow!("reminder {id} missing after snooze")))
}

#[derive(Default)]
pub struct ReminderPatch {
    pub reminder_time: Option<DateTime<Utc>>,
    pub message: Option<String>,
    pub recurrence_config: Option<RecurrenceConfig>,
    pub tags: Option<Vec<String>>,
}

/// Update a reminder. Moving `reminder_time` forward re-arms dispatch: the
/// due scan fires again once the new time arrives.
pub fn update_reminder(conn: &Connection, id: i64, patch: ReminderPatch) -> Result<Reminder> {
    let existing =
        get_reminder(conn, id)?.ok_or_else(|| MosaicError::not_found("reminder", id))?;

    if existing.is_completed {
        return Err(MosaicError::Conflict(format!(
            "reminder {id} is already completed"
        )));
    }

    let message = patch.message.unwrap_or(existing.message);
    if message.trim().is_empty() {
        return Err(MosaicError::invalid("reminder message must not be empty"));
    }
    let recurrence = patch.recurrence_config.or(existing.recurrence_config);
    if let Some(config) = &recurrence {
        config.validate().map_err(MosaicError::InvalidArgument)?;
    }
    let recurrence_json = recurrence
        .as_ref()
        .map(serde_json::to_string)
        .transpose()
        .map_err(|e| MosaicError::Internal(anyhow!("recurrence serialization: {e}")))?;
    let tags = patch.tags.map(dedupe_tags).unwrap_or(existing.tags);

    conn.execute(
        "UPDATE reminders SET reminder_time = ?1, message = ?2, recurrence_config = ?3, \
         tags = ?4, updated_at = ?5 WHERE id = ?6",
        params![
            fmt_dt(patch.reminder_time.unwrap_or(existing.reminder_time)),
            message,
            recurrence_json,
            tags_json(&tags),
            fmt_dt(Utc::now()),
            id
        ],
    )?;

    get_reminder(conn, id)?
        .ok_or_else(|| MosaicError::Internal(anyhow!("reminder {id} missing after update")))
}

/// Select all currently due reminders and stamp their dispatch instant, in
/// one transaction. A second call with the same clock returns nothing, which
/// is what makes dispatch at-most-once per reminder state.
pub fn claim_due(conn: &mut Connection, now: DateTime<Utc>) -> Result<Vec<Reminder>> {
    let now_s = fmt_dt(now);
    let tx = conn.transaction()?;

    let due: Vec<Reminder> = {
        let mut stmt = tx.prepare(&format!(
            "SELECT {COLUMNS} FROM reminders \
             WHERE is_completed = 0 \
               AND reminder_time <= ?1 \
               AND (snoozed_until IS NULL OR snoozed_until <= ?1) \
               AND (last_dispatched_at IS NULL \
                    OR last_dispatched_at < MAX(reminder_time, COALESCE(snoozed_until, reminder_time))) \
             ORDER BY reminder_time"
        ))?;
        let rows = stmt.query_map([&now_s], from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows
    };

    for reminder in &due {
        tx.execute(
            "UPDATE reminders SET last_dispatched_at = ?1 WHERE id = ?2",
            params![now_s, reminder.id],
        )?;
    }
    tx.commit()?;

    Ok(due
        .into_iter()
        .map(|mut r| {
            r.last_dispatched_at = Some(now);
            r
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::types::{RecurrenceConfig, RecurrenceFrequency};
    use chrono::{Duration, TimeZone};

    fn plain_reminder(time: DateTime<Utc>) -> NewReminder {
        NewReminder {
            reminder_time: time,
            message: "submit invoice".into(),
            recurrence_config: None,
            related_entity_type: None,
            related_entity_id: None,
            tags: vec![],
        }
    }

    #[test]
    fn claim_due_is_at_most_once() {
        let mut conn = crate::db::open_memory_database().unwrap();
        let t0 = Utc.with_ymd_and_hms(2026, 1, 19, 9, 0, 0).unwrap();
        create_reminder(&conn, plain_reminder(t0)).unwrap();

        let now = t0 + Duration::minutes(1);
        let first = claim_due(&mut conn, now).unwrap();
        assert_eq!(first.len(), 1);

        let second = claim_due(&mut conn, now + Duration::minutes(1)).unwrap();
        assert!(second.is_empty(), "already-dispatched reminder fired again");
    }

    #[test]
    fn snoozed_reminder_is_not_due_until_snooze_lapses() {
        let mut conn = crate::db::open_memory_database().unwrap();
        let t0 = Utc.with_ymd_and_hms(2026, 1, 19, 9, 0, 0).unwrap();
        let reminder = create_reminder(&conn, plain_reminder(t0)).unwrap();

        let until = t0 + Duration::hours(2);
        snooze_reminder(&conn, reminder.id, until).unwrap();

        assert!(claim_due(&mut conn, t0 + Duration::minutes(5)).unwrap().is_empty());
        let due = claim_due(&mut conn, until + Duration::minutes(1)).unwrap();
        assert_eq!(due.len(), 1);
    }

    #[test]
    fn dispatch_repeats_after_snooze_lapses() {
        let mut conn = crate::db::open_memory_database().unwrap();
        let t0 = Utc.with_ymd_and_hms(2026, 1, 19, 9, 0, 0).unwrap();
        let reminder = create_reminder(&conn, plain_reminder(t0)).unwrap();

        // First dispatch
        assert_eq!(claim_due(&mut conn, t0 + Duration::minutes(1)).unwrap().len(), 1);

        // Snooze advances the effective state, so it fires once more after lapse
        let until = t0 + Duration::hours(1);
        snooze_reminder(&conn, reminder.id, until).unwrap();
        assert!(claim_due(&mut conn, t0 + Duration::minutes(30)).unwrap().is_empty());
        assert_eq!(claim_due(&mut conn, until + Duration::minutes(1)).unwrap().len(), 1);
        assert!(claim_due(&mut conn, until + Duration::minutes(2)).unwrap().is_empty());
    }

    #[test]
    fn completing_recurring_reminder_spawns_next_occurrence() {
        let mut conn = crate::db::open_memory_database().unwrap();
        let t0 = Utc.with_ymd_and_hms(2026, 1, 19, 9, 0, 0).unwrap();
        let reminder = create_reminder(
            &conn,
            NewReminder {
                reminder_time: t0,
                message: "weekly review".into(),
                recurrence_config: Some(RecurrenceConfig {
                    frequency: RecurrenceFrequency::Weekly,
                    day_of_week: Some(0),
                    day_of_month: None,
                }),
                related_entity_type: None,
                related_entity_id: None,
                tags: vec!["ritual".into()],
            },
        )
        .unwrap();

        let outcome = complete_reminder(&mut conn, chrono_tz::UTC, reminder.id).unwrap();
        assert!(outcome.completed.is_completed);

        let next = outcome.next_occurrence.expect("recurring must spawn next");
        assert_eq!(
            next.reminder_time,
            Utc.with_ymd_and_hms(2026, 1, 26, 9, 0, 0).unwrap()
        );
        assert!(!next.is_completed);
        assert_eq!(next.message, "weekly review");
        assert_eq!(next.tags, vec!["ritual"]);
        assert_eq!(next.snoozed_until, None);

        let total: i64 = conn
            .query_row("SELECT COUNT(*) FROM reminders", [], |r| r.get(0))
            .unwrap();
        assert_eq!(total, 2, "exactly one new reminder");
    }

    #[test]
    fn completing_nonrecurring_reminder_spawns_nothing() {
        let mut conn = crate::db::open_memory_database().unwrap();
        let t0 = Utc.with_ymd_and_hms(2026, 1, 19, 9, 0, 0).unwrap();
        let reminder = create_reminder(&conn, plain_reminder(t0)).unwrap();

        let outcome = complete_reminder(&mut conn, chrono_tz::UTC, reminder.id).unwrap();
        assert!(outcome.next_occurrence.is_none());
    }

    #[test]
    fn double_completion_conflicts() {
        let mut conn = crate::db::open_memory_database().unwrap();
        let t0 = Utc.with_ymd_and_hms(2026, 1, 19, 9, 0, 0).unwrap();
        let reminder = create_reminder(&conn, plain_reminder(t0)).unwrap();

        complete_reminder(&mut conn, chrono_tz::UTC, reminder.id).unwrap();
        let err = complete_reminder(&mut conn, chrono_tz::UTC, reminder.id).unwrap_err();
        assert_eq!(err.code(), "conflict");
    }

    #[test]
    fn moving_reminder_time_forward_rearms_dispatch() {
        let mut conn = crate::db::open_memory_database().unwrap();
        let t0 = Utc.with_ymd_and_hms(2026, 1, 19, 9, 0, 0).unwrap();
        let reminder = create_reminder(&conn, plain_reminder(t0)).unwrap();

        assert_eq!(claim_due(&mut conn, t0 + Duration::minutes(1)).unwrap().len(), 1);
        assert!(claim_due(&mut conn, t0 + Duration::minutes(2)).unwrap().is_empty());

        let t1 = t0 + Duration::hours(2);
        update_reminder(
            &conn,
            reminder.id,
            ReminderPatch {
                reminder_time: Some(t1),
                ..Default::default()
            },
        )
        .unwrap();

        assert!(claim_due(&mut conn, t1 - Duration::minutes(1)).unwrap().is_empty());
        assert_eq!(claim_due(&mut conn, t1 + Duration::minutes(1)).unwrap().len(), 1);
    }

    #[test]
    fn completion_after_dispatch_still_spawns_next() {
        let mut conn = crate::db::open_memory_database().unwrap();
        let t0 = Utc.with_ymd_and_hms(2026, 1, 19, 9, 0, 0).unwrap();
        let reminder = create_reminder(
            &conn,
            NewReminder {
                reminder_time: t0,
                message: "daily check".into(),
                recurrence_config: Some(RecurrenceConfig {
                    frequency: RecurrenceFrequency::Daily,
                    day_of_week: None,
                    day_of_month: None,
                }),
                related_entity_type: None,
                related_entity_id: None,
                tags: vec![],
            },
        )
        .unwrap();

        // Scheduler dispatched first; completion must still succeed
        assert_eq!(claim_due(&mut conn, t0 + Duration::minutes(1)).unwrap().len(), 1);
        let outcome = complete_reminder(&mut conn, chrono_tz::UTC, reminder.id).unwrap();
        assert!(outcome.next_occurrence.is_some());
    }
}
