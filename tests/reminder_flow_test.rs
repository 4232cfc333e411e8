//! Reminder lifecycle: creation, due-scan dispatch, snoozing, and recurring
//! completion.

mod helpers;

use chrono::Duration;
use helpers::{count_rows, dt, seed_client, seed_project, test_db};
use mosaic::store::reminders::{
    claim_due, complete_reminder, create_reminder, get_reminder, snooze_reminder, NewReminder,
};
use mosaic::store::types::{EntityKind, RecurrenceConfig, RecurrenceFrequency};

#[test]
fn weekly_reminder_completion_creates_exactly_one_next_occurrence() {
    let mut conn = test_db();

    // Monday 09:00, recurring weekly
    let reminder = create_reminder(
        &conn,
        NewReminder {
            reminder_time: dt(2026, 1, 19, 9, 0),
            message: "Weekly planning".into(),
            recurrence_config: Some(RecurrenceConfig {
                frequency: RecurrenceFrequency::Weekly,
                day_of_week: Some(0),
                day_of_month: None,
            }),
            related_entity_type: None,
            related_entity_id: None,
            tags: vec![],
        },
    )
    .unwrap();

    let outcome = complete_reminder(&mut conn, chrono_tz::UTC, reminder.id).unwrap();
    assert!(outcome.completed.is_completed);

    let next = outcome.next_occurrence.expect("next occurrence");
    assert_eq!(next.reminder_time, dt(2026, 1, 26, 9, 0));
    assert!(!next.is_completed);
    assert_eq!(next.message, "Weekly planning");
    assert_eq!(count_rows(&conn, "reminders"), 2);
}

#[test]
fn due_scan_respects_completion_snooze_and_dispatch_state() {
    let mut conn = test_db();
    let t0 = dt(2026, 1, 19, 9, 0);
    let reminder = create_reminder(
        &conn,
        NewReminder {
            reminder_time: t0,
            message: "check in".into(),
            recurrence_config: None,
            related_entity_type: None,
            related_entity_id: None,
            tags: vec![],
        },
    )
    .unwrap();

    // Not yet due
    assert!(claim_due(&mut conn, t0 - Duration::minutes(1)).unwrap().is_empty());

    // Due exactly at reminder_time, dispatched once
    assert_eq!(claim_due(&mut conn, t0).unwrap().len(), 1);
    assert!(claim_due(&mut conn, t0 + Duration::minutes(5)).unwrap().is_empty());

    // Snooze resets the effective state
    snooze_reminder(&conn, reminder.id, t0 + Duration::hours(1)).unwrap();
    assert!(claim_due(&mut conn, t0 + Duration::minutes(30)).unwrap().is_empty());
    assert_eq!(
        claim_due(&mut conn, t0 + Duration::minutes(61)).unwrap().len(),
        1
    );

    // Completion removes it from the scan entirely
    complete_reminder(&mut conn, chrono_tz::UTC, reminder.id).unwrap();
    assert!(claim_due(&mut conn, t0 + Duration::hours(3)).unwrap().is_empty());
}

#[test]
fn reminder_can_link_to_an_existing_entity() {
    let conn = test_db();
    let client_id = seed_client(&conn, "Acme Corp");
    let project_id = seed_project(&conn, client_id, "Website");

    let reminder = create_reminder(
        &conn,
        NewReminder {
            reminder_time: dt(2026, 2, 1, 9, 0),
            message: "send invoice".into(),
            recurrence_config: None,
            related_entity_type: Some(EntityKind::Project),
            related_entity_id: Some(project_id),
            tags: vec!["billing".into()],
        },
    )
    .unwrap();

    let reloaded = get_reminder(&conn, reminder.id).unwrap().unwrap();
    assert_eq!(reloaded.related_entity_type, Some(EntityKind::Project));
    assert_eq!(reloaded.related_entity_id, Some(project_id));

    // Dangling references are rejected up front
    let err = create_reminder(
        &conn,
        NewReminder {
            reminder_time: dt(2026, 2, 1, 9, 0),
            message: "dangling".into(),
            recurrence_config: None,
            related_entity_type: Some(EntityKind::Project),
            related_entity_id: Some(9999),
            tags: vec![],
        },
    )
    .unwrap_err();
    assert_eq!(err.code(), "not_found");
}

#[test]
fn invalid_recurrence_is_rejected() {
    let conn = test_db();
    let err = create_reminder(
        &conn,
        NewReminder {
            reminder_time: dt(2026, 2, 1, 9, 0),
            message: "bad".into(),
            recurrence_config: Some(RecurrenceConfig {
                frequency: RecurrenceFrequency::Monthly,
                day_of_week: None,
                day_of_month: Some(40),
            }),
            related_entity_type: None,
            related_entity_id: None,
            tags: vec![],
        },
    )
    .unwrap_err();
    assert_eq!(err.code(), "invalid_argument");
}
