//! Employer rows — who work is done on behalf of.

use anyhow::anyhow;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{col_dt, col_tags, dedupe_tags, fmt_dt, tags_json};
use crate::error::{MosaicError, Result};
use crate::store::types::Employer;

pub(crate) const COLUMNS: &str = "id, name, notes, tags, created_at, updated_at";

pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Employer> {
    Ok(Employer {
        id: row.get(0)?,
        name: row.get(1)?,
        notes: row.get(2)?,
        tags: col_tags(row, 3)?,
        created_at: col_dt(row, 4)?,
        updated_at: col_dt(row, 5)?,
    })
}

pub struct NewEmployer {
    pub name: String,
    pub notes: Option<String>,
    pub tags: Vec<String>,
}

pub fn create_employer(conn: &Connection, new: NewEmployer) -> Result<Employer> {
    if new.name.trim().is_empty() {
        return Err(MosaicError::invalid("employer name must not be empty"));
    }

    let now = fmt_dt(Utc::now());
    conn.execute(
        "INSERT INTO employers (name, notes, tags, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            new.name,
            new.notes,
            tags_json(&dedupe_tags(new.tags)),
            now,
            now
        ],
    )?;

    let id = conn.last_insert_rowid();
    get_employer(conn, id)?
        .ok_or_else(|| MosaicError::Internal(anyhow!("employer {id} missing after insert")))
}

pub fn get_employer(conn: &Connection, id: i64) -> Result<Option<Employer>> {
    conn.query_row(
        &format!("SELECT {COLUMNS} FROM employers WHERE id = ?1"),
        [id],
        from_row,
    )
    .optional()
    .map_err(Into::into)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_and_fetch_employer() {
        let conn = crate::db::open_memory_database().unwrap();
        let employer = create_employer(
            &conn,
            NewEmployer {
                name: "Initech".into(),
                notes: Some("primary".into()),
                tags: vec!["w2".into(), "w2".into()],
            },
        )
        .unwrap();

        assert_eq!(employer.name, "Initech");
        assert_eq!(employer.tags, vec!["w2"]);

        let fetched = get_employer(&conn, employer.id).unwrap().unwrap();
        assert_eq!(fetched.id, employer.id);
    }

    #[test]
    fn empty_name_is_rejected() {
        let conn = crate::db::open_memory_database().unwrap();
        let err = create_employer(
            &conn,
            NewEmployer {
                name: "  ".into(),
                notes: None,
                tags: vec![],
            },
        )
        .unwrap_err();
        assert_eq!(err.code(), "invalid_argument");
    }
}
