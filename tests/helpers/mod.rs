#![allow(dead_code)]

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use rusqlite::Connection;

use mosaic::store::clients::{create_client, NewClient};
use mosaic::store::people::{create_person, NewPerson};
use mosaic::store::projects::{create_project, NewProject};
use mosaic::store::sessions::{log_session, NewWorkSession};
use mosaic::store::types::{ClientStatus, ClientType, PrivacyLevel, ProjectStatus};

/// Open a fresh in-memory database with schema and migrations applied.
pub fn test_db() -> Connection {
    mosaic::db::open_memory_database().unwrap()
}

pub fn dt(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
}

pub fn date(y: i32, mo: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, mo, d).unwrap()
}

pub fn seed_client(conn: &Connection, name: &str) -> i64 {
    create_client(
        conn,
        NewClient {
            name: name.into(),
            client_type: ClientType::Company,
            status: ClientStatus::Active,
            contact_person_id: None,
            notes: None,
            tags: vec![],
        },
    )
    .unwrap()
    .id
}

pub fn seed_project(conn: &Connection, client_id: i64, name: &str) -> i64 {
    create_project(
        conn,
        NewProject {
            name: name.into(),
            client_id,
            on_behalf_of: None,
            description: None,
            status: ProjectStatus::Active,
            start_date: None,
            end_date: None,
            tags: vec![],
        },
    )
    .unwrap()
    .id
}

pub fn seed_person(conn: &Connection, full_name: &str) -> i64 {
    create_person(
        conn,
        NewPerson {
            full_name: full_name.into(),
            ..Default::default()
        },
    )
    .unwrap()
    .id
}

/// Log a session of `minutes` length starting at the given instant.
pub fn seed_session(
    conn: &Connection,
    project_id: i64,
    start: DateTime<Utc>,
    minutes: i64,
    summary: &str,
    privacy: PrivacyLevel,
) -> i64 {
    log_session(
        conn,
        chrono_tz::UTC,
        NewWorkSession {
            project_id,
            start_time: start,
            end_time: start + chrono::Duration::minutes(minutes),
            summary: Some(summary.into()),
            privacy_level: privacy,
            tags: vec![],
        },
    )
    .unwrap()
    .id
}

pub fn count_rows(conn: &Connection, table: &str) -> i64 {
    conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |r| r.get(0))
        .unwrap()
}
