//! End-to-end time-accounting scenarios: session logging, the meeting→
//! work-session linker, and timecard aggregation.

mod helpers;

use helpers::{count_rows, date, dt, seed_client, seed_project, seed_session, test_db};
use mosaic::store::meetings::{log_meeting, NewMeeting};
use mosaic::store::sessions::get_session;
use mosaic::store::types::PrivacyLevel;
use mosaic::timecard::generate_timecard;

#[test]
fn logged_session_rounds_up_and_dates_correctly() {
    let conn = test_db();
    let client_id = seed_client(&conn, "Acme Corp");
    let project_id = seed_project(&conn, client_id, "Website");

    // 14:00–15:45 is 105 minutes → 2.0 hours
    let id = seed_session(
        &conn,
        project_id,
        dt(2026, 1, 15, 14, 0),
        105,
        "integration work",
        PrivacyLevel::Private,
    );

    let session = get_session(&conn, id).unwrap().unwrap();
    assert_eq!(session.duration_hours.to_string(), "2.0");
    assert_eq!(session.date, date(2026, 1, 15));
    // the wire form preserves one decimal place as a string
    let json = serde_json::to_value(&session).unwrap();
    assert_eq!(json["duration_hours"], serde_json::json!("2.0"));
}

#[test]
fn meeting_with_project_creates_rounded_session() {
    let mut conn = test_db();
    let client_id = seed_client(&conn, "Acme Corp");
    let project_id = seed_project(&conn, client_id, "Website");

    let logged = log_meeting(
        &mut conn,
        chrono_tz::UTC,
        NewMeeting {
            title: "Kickoff".into(),
            start_time: dt(2026, 1, 15, 10, 0),
            duration_minutes: 45,
            summary: None,
            privacy_level: PrivacyLevel::Internal,
            project_id: Some(project_id),
            meeting_type: None,
            location: None,
            attendee_ids: vec![],
            tags: vec!["kickoff".into()],
        },
    )
    .unwrap();

    let session = logged.auto_work_session.expect("auto session");
    let reloaded = get_session(&conn, session.id).unwrap().unwrap();
    assert_eq!(reloaded.duration_hours.to_string(), "1.0");
    assert_eq!(reloaded.project_id, project_id);
    assert_eq!(reloaded.start_time, dt(2026, 1, 15, 10, 0));
    assert_eq!(reloaded.end_time, dt(2026, 1, 15, 10, 45));
    assert_eq!(reloaded.summary.as_deref(), Some("Kickoff"));
    assert_eq!(reloaded.privacy_level, PrivacyLevel::Internal);
    assert_eq!(reloaded.tags, vec!["kickoff"]);
}

#[test]
fn meeting_against_missing_project_leaves_no_rows() {
    let mut conn = test_db();
    let client_id = seed_client(&conn, "Acme Corp");
    seed_project(&conn, client_id, "Website");

    let err = log_meeting(
        &mut conn,
        chrono_tz::UTC,
        NewMeeting {
            title: "Ghost sync".into(),
            start_time: dt(2026, 1, 15, 10, 0),
            duration_minutes: 30,
            summary: None,
            privacy_level: PrivacyLevel::Private,
            project_id: Some(999),
            meeting_type: None,
            location: None,
            attendee_ids: vec![],
            tags: vec![],
        },
    )
    .unwrap_err();

    assert_eq!(err.code(), "not_found");
    assert_eq!(count_rows(&conn, "meetings"), 0);
    assert_eq!(count_rows(&conn, "work_sessions"), 0);
}

#[test]
fn timecard_sum_equals_sum_of_included_sessions() {
    let conn = test_db();
    let client_id = seed_client(&conn, "Acme Corp");
    let project_id = seed_project(&conn, client_id, "Website");
    let other_project = seed_project(&conn, client_id, "Backend");

    seed_session(&conn, project_id, dt(2026, 1, 14, 9, 0), 60, "a", PrivacyLevel::Public);
    seed_session(&conn, project_id, dt(2026, 1, 15, 9, 0), 90, "b", PrivacyLevel::Internal);
    seed_session(&conn, project_id, dt(2026, 1, 15, 13, 0), 30, "c", PrivacyLevel::Private);
    // other project must not contribute
    seed_session(&conn, other_project, dt(2026, 1, 15, 9, 0), 480, "x", PrivacyLevel::Public);

    let full = generate_timecard(&conn, project_id, date(2026, 1, 1), date(2026, 1, 31), true).unwrap();
    let total: rust_decimal::Decimal = full.iter().map(|r| r.hours).sum();
    // 1.0 + 1.5 + 0.5
    assert_eq!(total.to_string(), "3.0");

    let external =
        generate_timecard(&conn, project_id, date(2026, 1, 1), date(2026, 1, 31), false).unwrap();
    let total: rust_decimal::Decimal = external.iter().map(|r| r.hours).sum();
    // private session excluded, internal still counted
    assert_eq!(total.to_string(), "2.5");
    assert!(external.iter().all(|r| !r.summary.contains('c')));
}
