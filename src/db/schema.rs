//! SQL DDL for all Mosaic tables.
//!
//! Eleven entity tables plus `schema_meta`. All DDL uses `IF NOT EXISTS` for
//! idempotent initialization. Enumerations are stored as their textual names
//! and guarded by CHECK constraints; tag sets are JSON arrays; instants are
//! RFC 3339 UTC text.

use rusqlite::Connection;

/// All schema DDL statements for Mosaic's tables.
const SCHEMA_SQL: &str = r#"
-- Who work is done on behalf of
CREATE TABLE IF NOT EXISTS employers (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL CHECK(length(name) > 0),
    notes TEXT,
    tags TEXT NOT NULL DEFAULT '[]',
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

-- People, independent of any client affiliation
CREATE TABLE IF NOT EXISTS people (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    full_name TEXT NOT NULL CHECK(length(full_name) > 0),
    email TEXT,
    phone TEXT,
    linkedin_url TEXT,
    company TEXT,
    title TEXT,
    notes TEXT,
    additional_info TEXT,
    is_stakeholder INTEGER NOT NULL DEFAULT 0,
    tags TEXT NOT NULL DEFAULT '[]',
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_people_full_name ON people(full_name);
CREATE INDEX IF NOT EXISTS idx_people_email ON people(email);

-- Companies or individuals that work is done for
CREATE TABLE IF NOT EXISTS clients (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL CHECK(length(name) > 0),
    type TEXT NOT NULL CHECK(type IN ('company','individual')),
    status TEXT NOT NULL DEFAULT 'active' CHECK(status IN ('active','past')),
    contact_person_id INTEGER REFERENCES people(id) ON DELETE SET NULL,
    notes TEXT,
    tags TEXT NOT NULL DEFAULT '[]',
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_clients_name ON clients(name);

-- Work initiatives; RESTRICT edges protect billing history
CREATE TABLE IF NOT EXISTS projects (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL CHECK(length(name) > 0),
    client_id INTEGER NOT NULL REFERENCES clients(id) ON DELETE RESTRICT,
    on_behalf_of_id INTEGER REFERENCES employers(id) ON DELETE RESTRICT,
    description TEXT,
    status TEXT NOT NULL DEFAULT 'active' CHECK(status IN ('active','paused','completed')),
    start_date TEXT,
    end_date TEXT,
    tags TEXT NOT NULL DEFAULT '[]',
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_projects_name ON projects(name);
CREATE INDEX IF NOT EXISTS idx_projects_client ON projects(client_id);

-- Temporal person<->client relationships
CREATE TABLE IF NOT EXISTS employment_history (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    person_id INTEGER NOT NULL REFERENCES people(id) ON DELETE CASCADE,
    client_id INTEGER NOT NULL REFERENCES clients(id) ON DELETE CASCADE,
    role TEXT,
    start_date TEXT NOT NULL,
    end_date TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_employment_person ON employment_history(person_id);
CREATE INDEX IF NOT EXISTS idx_employment_client ON employment_history(client_id);

-- Individual time entries; duration_hours holds a 1-dp decimal as text
CREATE TABLE IF NOT EXISTS work_sessions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    project_id INTEGER NOT NULL REFERENCES projects(id) ON DELETE RESTRICT,
    date TEXT NOT NULL,
    start_time TEXT NOT NULL,
    end_time TEXT NOT NULL,
    duration_hours TEXT NOT NULL,
    summary TEXT,
    privacy_level TEXT NOT NULL DEFAULT 'private' CHECK(privacy_level IN ('public','internal','private')),
    tags TEXT NOT NULL DEFAULT '[]',
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_work_sessions_project_date ON work_sessions(project_id, date);
CREATE INDEX IF NOT EXISTS idx_work_sessions_date ON work_sessions(date);

-- Discussion events with optional project link
CREATE TABLE IF NOT EXISTS meetings (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL CHECK(length(title) > 0),
    start_time TEXT NOT NULL,
    duration_minutes INTEGER NOT NULL CHECK(duration_minutes > 0),
    summary TEXT,
    privacy_level TEXT NOT NULL DEFAULT 'private' CHECK(privacy_level IN ('public','internal','private')),
    project_id INTEGER REFERENCES projects(id) ON DELETE SET NULL,
    meeting_type TEXT,
    location TEXT,
    tags TEXT NOT NULL DEFAULT '[]',
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_meetings_start_time ON meetings(start_time);

-- Join rows for meeting attendance
CREATE TABLE IF NOT EXISTS meeting_attendees (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    meeting_id INTEGER NOT NULL REFERENCES meetings(id) ON DELETE CASCADE,
    person_id INTEGER NOT NULL REFERENCES people(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_attendees_meeting ON meeting_attendees(meeting_id);
CREATE INDEX IF NOT EXISTS idx_attendees_person ON meeting_attendees(person_id);

-- Annotations attachable to any entity; the pair is all-or-nothing
CREATE TABLE IF NOT EXISTS notes (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    text TEXT NOT NULL CHECK(length(text) > 0),
    privacy_level TEXT NOT NULL DEFAULT 'private' CHECK(privacy_level IN ('public','internal','private')),
    entity_type TEXT CHECK(entity_type IN ('person','client','project','employer','work_session','meeting','note','reminder')),
    entity_id INTEGER,
    tags TEXT NOT NULL DEFAULT '[]',
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    CHECK ((entity_type IS NULL) = (entity_id IS NULL))
);

CREATE INDEX IF NOT EXISTS idx_notes_entity ON notes(entity_type, entity_id);

-- Time-based notifications; last_dispatched_at is scheduler bookkeeping
CREATE TABLE IF NOT EXISTS reminders (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    reminder_time TEXT NOT NULL,
    message TEXT NOT NULL CHECK(length(message) > 0),
    is_completed INTEGER NOT NULL DEFAULT 0,
    recurrence_config TEXT,
    related_entity_type TEXT CHECK(related_entity_type IN ('person','client','project','employer','work_session','meeting','note','reminder')),
    related_entity_id INTEGER,
    snoozed_until TEXT,
    last_dispatched_at TEXT,
    tags TEXT NOT NULL DEFAULT '[]',
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    CHECK ((related_entity_type IS NULL) = (related_entity_id IS NULL))
);

CREATE INDEX IF NOT EXISTS idx_reminders_active ON reminders(reminder_time, is_completed);

-- Singleton user profile
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    email TEXT,
    timezone TEXT NOT NULL DEFAULT 'UTC',
    week_boundary TEXT NOT NULL DEFAULT 'monday' CHECK(week_boundary IN ('monday','sunday')),
    default_privacy_level TEXT NOT NULL DEFAULT 'private' CHECK(default_privacy_level IN ('public','internal','private')),
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

-- Schema metadata
CREATE TABLE IF NOT EXISTS schema_meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
"#;

/// Initialize all schema tables. Idempotent (uses IF NOT EXISTS).
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;

    // Set initial schema version if not already present
    conn.execute(
        "INSERT OR IGNORE INTO schema_meta (key, value) VALUES ('schema_version', '1')",
        [],
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_creates_all_tables() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();

        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap();

        for expected in [
            "employers",
            "people",
            "clients",
            "projects",
            "employment_history",
            "work_sessions",
            "meetings",
            "meeting_attendees",
            "notes",
            "reminders",
            "users",
            "schema_meta",
        ] {
            assert!(tables.contains(&expected.to_string()), "missing {expected}");
        }
    }

    #[test]
    fn schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        init_schema(&conn).unwrap(); // second call should not error
    }

    #[test]
    fn note_entity_pair_is_all_or_nothing() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();

        let err = conn.execute(
            "INSERT INTO notes (text, entity_type, entity_id, created_at, updated_at)
             VALUES ('orphan', 'project', NULL, '2026-01-01T00:00:00+00:00', '2026-01-01T00:00:00+00:00')",
            [],
        );
        assert!(err.is_err(), "entity_type without entity_id must be rejected");
    }
}
