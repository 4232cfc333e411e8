//! Person rows and their employment history.

use anyhow::anyhow;
use chrono::{NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{
    col_date, col_date_opt, col_dt, col_json_opt, col_tags, dedupe_tags, exists, fmt_date, fmt_dt,
    tags_json,
};
use crate::error::{MosaicError, Result};
use crate::store::types::{EmploymentHistory, Person};

pub(crate) const COLUMNS: &str = "id, full_name, email, phone, linkedin_url, company, title, \
     notes, additional_info, is_stakeholder, tags, created_at, updated_at";

pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Person> {
    Ok(Person {
        id: row.get(0)?,
        full_name: row.get(1)?,
        email: row.get(2)?,
        phone: row.get(3)?,
        linkedin_url: row.get(4)?,
        company: row.get(5)?,
        title: row.get(6)?,
        notes: row.get(7)?,
        additional_info: col_json_opt(row, 8)?,
        is_stakeholder: row.get(9)?,
        tags: col_tags(row, 10)?,
        created_at: col_dt(row, 11)?,
        updated_at: col_dt(row, 12)?,
    })
}

fn employment_from_row(row: &Row<'_>) -> rusqlite::Result<EmploymentHistory> {
    Ok(EmploymentHistory {
        id: row.get(0)?,
        person_id: row.get(1)?,
        client_id: row.get(2)?,
        role: row.get(3)?,
        start_date: col_date(row, 4)?,
        end_date: col_date_opt(row, 5)?,
        created_at: col_dt(row, 6)?,
        updated_at: col_dt(row, 7)?,
    })
}

#[derive(Default)]
pub struct NewPerson {
    pub full_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub linkedin_url: Option<String>,
    pub company: Option<String>,
    pub title: Option<String>,
    pub notes: Option<String>,
    pub additional_info: Option<serde_json::Value>,
    pub is_stakeholder: bool,
    pub tags: Vec<String>,
}

pub fn create_person(conn: &Connection, new: NewPerson) -> Result<Person> {
    if new.full_name.trim().is_empty() {
        return Err(MosaicError::invalid("full_name must not be empty"));
    }

    let additional_info = new
        .additional_info
        .as_ref()
        .map(|v| serde_json::to_string(v))
        .transpose()
        .map_err(|e| MosaicError::Internal(anyhow!("additional_info serialization: {e}")))?;

    let now = fmt_dt(Utc::now());
    conn.execute(
        "INSERT INTO people (full_name, email, phone, linkedin_url, company, title, notes, \
         additional_info, is_stakeholder, tags, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        params![
            new.full_name,
            new.email,
            new.phone,
            new.linkedin_url,
            new.company,
            new.title,
            new.notes,
            additional_info,
            new.is_stakeholder,
            tags_json(&dedupe_tags(new.tags)),
            now,
            now
        ],
    )?;

    let id = conn.last_insert_rowid();
    get_person(conn, id)?
        .ok_or_else(|| MosaicError::Internal(anyhow!("person {id} missing after insert")))
}

pub fn get_person(conn: &Connection, id: i64) -> Result<Option<Person>> {
    conn.query_row(
        &format!("SELECT {COLUMNS} FROM people WHERE id = ?1"),
        [id],
        from_row,
    )
    .optional()
    .map_err(Into::into)
}

#[derive(Default)]
pub struct PersonPatch {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub linkedin_url: Option<String>,
    pub company: Option<String>,
    pub title: Option<String>,
    pub notes: Option<String>,
    pub additional_info: Option<serde_json::Value>,
    pub is_stakeholder: Option<bool>,
    pub tags: Option<Vec<String>>,
}

pub fn update_person(conn: &Connection, id: i64, patch: PersonPatch) -> Result<Person> {
    let existing = get_person(conn, id)?.ok_or_else(|| MosaicError::not_found("person", id))?;

    let full_name = patch.full_name.unwrap_or(existing.full_name);
    if full_name.trim().is_empty() {
        return Err(MosaicError::invalid("full_name must not be empty"));
    }
    let additional_info = patch.additional_info.or(existing.additional_info);
    let additional_info_json = additional_info
        .as_ref()
        .map(|v| serde_json::to_string(v))
        .transpose()
        .map_err(|e| MosaicError::Internal(anyhow!("additional_info serialization: {e}")))?;
    let tags = patch
        .tags
        .map(dedupe_tags)
        .unwrap_or(existing.tags);

    conn.execute(
        "UPDATE people SET full_name = ?1, email = ?2, phone = ?3, linkedin_url = ?4, \
         company = ?5, title = ?6, notes = ?7, additional_info = ?8, is_stakeholder = ?9, \
         tags = ?10, updated_at = ?11 WHERE id = ?12",
        params![
            full_name,
            patch.email.or(existing.email),
            patch.phone.or(existing.phone),
            patch.linkedin_url.or(existing.linkedin_url),
            patch.company.or(existing.company),
            patch.title.or(existing.title),
            patch.notes.or(existing.notes),
            additional_info_json,
            patch.is_stakeholder.unwrap_or(existing.is_stakeholder),
            tags_json(&tags),
            fmt_dt(Utc::now()),
            id
        ],
    )?;

    get_person(conn, id)?
        .ok_or_else(|| MosaicError::Internal(anyhow!("person {id} missing after update")))
}

pub struct NewEmployment {
    pub person_id: i64,
    pub client_id: i64,
    pub role: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
}

/// Record an employment. A person may have at most one current
/// (`end_date IS NULL`) employment per client.
pub fn add_employment(conn: &Connection, new: NewEmployment) -> Result<EmploymentHistory> {
    if !exists(conn, "people", new.person_id)? {
        return Err(MosaicError::not_found("person", new.person_id));
    }
    if !exists(conn, "clients", new.client_id)? {
        return Err(MosaicError::not_found("client", new.client_id));
    }
    if let Some(end) = new.end_date {
        if end < new.start_date {
            return Err(MosaicError::invalid("end_date must not precede start_date"));
        }
    }

    if new.end_date.is_none() {
        let current: i64 = conn.query_row(
            "SELECT COUNT(*) FROM employment_history \
             WHERE person_id = ?1 AND client_id = ?2 AND end_date IS NULL",
            params![new.person_id, new.client_id],
            |row| row.get(0),
        )?;
        if current > 0 {
            return Err(MosaicError::Conflict(format!(
                "person {} already has a current employment at client {}",
                new.person_id, new.client_id
            )));
        }
    }

    let now = fmt_dt(Utc::now());
    conn.execute(
        "INSERT INTO employment_history (person_id, client_id, role, start_date, end_date, \
         created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            new.person_id,
            new.client_id,
            new.role,
            fmt_date(new.start_date),
            new.end_date.map(fmt_date),
            now,
            now
        ],
    )?;

    let id = conn.last_insert_rowid();
    conn.query_row(
        "SELECT id, person_id, client_id, role, start_date, end_date, created_at, updated_at \
         FROM employment_history WHERE id = ?1",
        [id],
        employment_from_row,
    )
    .map_err(Into::into)
}

pub fn list_employments(conn: &Connection, person_id: i64) -> Result<Vec<EmploymentHistory>> {
    let mut stmt = conn.prepare(
        "SELECT id, person_id, client_id, role, start_date, end_date, created_at, updated_at \
         FROM employment_history WHERE person_id = ?1 ORDER BY start_date",
    )?;
    let rows = stmt
        .query_map([person_id], employment_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::clients::{create_client, NewClient};
    use crate::store::types::{ClientStatus, ClientType};

    fn seed(conn: &Connection) -> (i64, i64) {
        let person = create_person(
            conn,
            NewPerson {
                full_name: "Dana Fox".into(),
                ..Default::default()
            },
        )
        .unwrap();
        let client = create_client(
            conn,
            NewClient {
                name: "Acme Corp".into(),
                client_type: ClientType::Company,
                status: ClientStatus::Active,
                contact_person_id: None,
                notes: None,
                tags: vec![],
            },
        )
        .unwrap();
        (person.id, client.id)
    }

    #[test]
    fn partial_update_touches_only_provided_fields() {
        let conn = crate::db::open_memory_database().unwrap();
        let person = create_person(
            &conn,
            NewPerson {
                full_name: "Dana Fox".into(),
                email: Some("dana@example.com".into()),
                ..Default::default()
            },
        )
        .unwrap();

        let updated = update_person(
            &conn,
            person.id,
            PersonPatch {
                title: Some("CTO".into()),
                ..Default::default()
            },
        )
        .unwrap();

        assert_eq!(updated.title.as_deref(), Some("CTO"));
        assert_eq!(updated.email.as_deref(), Some("dana@example.com"));
    }

    #[test]
    fn second_current_employment_for_same_client_conflicts() {
        let conn = crate::db::open_memory_database().unwrap();
        let (person_id, client_id) = seed(&conn);
        let start = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();

        add_employment(
            &conn,
            NewEmployment {
                person_id,
                client_id,
                role: Some("Engineer".into()),
                start_date: start,
                end_date: None,
            },
        )
        .unwrap();

        let err = add_employment(
            &conn,
            NewEmployment {
                person_id,
                client_id,
                role: Some("Manager".into()),
                start_date: start,
                end_date: None,
            },
        )
        .unwrap_err();
        assert_eq!(err.code(), "conflict");
    }

    #[test]
    fn deleting_person_cascades_employment() {
        let conn = crate::db::open_memory_database().unwrap();
        let (person_id, client_id) = seed(&conn);
        add_employment(
            &conn,
            NewEmployment {
                person_id,
                client_id,
                role: None,
                start_date: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
                end_date: None,
            },
        )
        .unwrap();

        conn.execute("DELETE FROM people WHERE id = ?1", [person_id])
            .unwrap();
        assert!(list_employments(&conn, person_id).unwrap().is_empty());
    }
}
