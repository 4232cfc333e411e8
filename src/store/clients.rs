//! Client rows — companies or individuals that work is done for.

use anyhow::anyhow;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{col_dt, col_enum, col_tags, dedupe_tags, exists, fmt_dt, tags_json};
use crate::error::{MosaicError, Result};
use crate::store::types::{Client, ClientStatus, ClientType};

pub(crate) const COLUMNS: &str =
    "id, name, type, status, contact_person_id, notes, tags, created_at, updated_at";

pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Client> {
    Ok(Client {
        id: row.get(0)?,
        name: row.get(1)?,
        client_type: col_enum(row, 2)?,
        status: col_enum(row, 3)?,
        contact_person_id: row.get(4)?,
        notes: row.get(5)?,
        tags: col_tags(row, 6)?,
        created_at: col_dt(row, 7)?,
        updated_at: col_dt(row, 8)?,
    })
}

pub struct NewClient {
    pub name: String,
    pub client_type: ClientType,
    pub status: ClientStatus,
    pub contact_person_id: Option<i64>,
    pub notes: Option<String>,
    pub tags: Vec<String>,
}

pub fn create_client(conn: &Connection, new: NewClient) -> Result<Client> {
    if new.name.trim().is_empty() {
        return Err(MosaicError::invalid("client name must not be empty"));
    }
    if let Some(person_id) = new.contact_person_id {
        if !exists(conn, "people", person_id)? {
            return Err(MosaicError::not_found("person", person_id));
        }
    }

    let now = fmt_dt(Utc::now());
    conn.execute(
        "INSERT INTO clients (name, type, status, contact_person_id, notes, tags, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            new.name,
            new.client_type.as_str(),
            new.status.as_str(),
            new.contact_person_id,
            new.notes,
            tags_json(&dedupe_tags(new.tags)),
            now,
            now
        ],
    )?;

    let id = conn.last_insert_rowid();
    get_client(conn, id)?
        .ok_or_else(|| MosaicError::Internal(anyhow!("client {id} missing after insert")))
}

pub fn get_client(conn: &Connection, id: i64) -> Result<Option<Client>> {
    conn.query_row(
        &format!("SELECT {COLUMNS} FROM clients WHERE id = ?1"),
        [id],
        from_row,
    )
    .optional()
    .map_err(Into::into)
}

#[derive(Default)]
pub struct ClientPatch {
    pub name: Option<String>,
    pub client_type: Option<ClientType>,
    pub status: Option<ClientStatus>,
    pub contact_person_id: Option<i64>,
    pub notes: Option<String>,
    pub tags: Option<Vec<String>>,
}

pub fn update_client(conn: &Connection, id: i64, patch: ClientPatch) -> Result<Client> {
    let existing = get_client(conn, id)?.ok_or_else(|| MosaicError::not_found("client", id))?;

    let name = patch.name.unwrap_or(existing.name);
    if name.trim().is_empty() {
        return Err(MosaicError::invalid("client name must not be empty"));
    }
    if let Some(person_id) = patch.contact_person_id {
        if !exists(conn, "people", person_id)? {
            return Err(MosaicError::not_found("person", person_id));
        }
    }
    let tags = patch.tags.map(dedupe_tags).unwrap_or(existing.tags);

    conn.execute(
        "UPDATE clients SET name = ?1, type = ?2, status = ?3, contact_person_id = ?4, \
         notes = ?5, tags = ?6, updated_at = ?7 WHERE id = ?8",
        params![
            name,
            patch.client_type.unwrap_or(existing.client_type).as_str(),
            patch.status.unwrap_or(existing.status).as_str(),
            patch.contact_person_id.or(existing.contact_person_id),
            patch.notes.or(existing.notes),
            tags_json(&tags),
            fmt_dt(Utc::now()),
            id
        ],
    )?;

    get_client(conn, id)?
        .ok_or_else(|| MosaicError::Internal(anyhow!("client {id} missing after update")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_client(name: &str) -> NewClient {
        NewClient {
            name: name.into(),
            client_type: ClientType::Company,
            status: ClientStatus::Active,
            contact_person_id: None,
            notes: None,
            tags: vec![],
        }
    }

    #[test]
    fn create_update_round_trip() {
        let conn = crate::db::open_memory_database().unwrap();
        let client = create_client(&conn, new_client("Acme Corp")).unwrap();
        assert_eq!(client.status, ClientStatus::Active);

        let updated = update_client(
            &conn,
            client.id,
            ClientPatch {
                status: Some(ClientStatus::Past),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(updated.status, ClientStatus::Past);
        assert_eq!(updated.name, "Acme Corp");
    }

    #[test]
    fn missing_contact_person_is_not_found() {
        let conn = crate::db::open_memory_database().unwrap();
        let mut new = new_client("Acme Corp");
        new.contact_person_id = Some(404);
        let err = create_client(&conn, new).unwrap_err();
        assert_eq!(err.code(), "not_found");
    }

    #[test]
    fn deleting_contact_person_nulls_the_reference() {
        let conn = crate::db::open_memory_database().unwrap();
        let person = crate::store::people::create_person(
            &conn,
            crate::store::people::NewPerson {
                full_name: "Pat Lee".into(),
                ..Default::default()
            },
        )
        .unwrap();

        let mut new = new_client("Acme Corp");
        new.contact_person_id = Some(person.id);
        let client = create_client(&conn, new).unwrap();

        conn.execute("DELETE FROM people WHERE id = ?1", [person.id])
            .unwrap();
        let reloaded = get_client(&conn, client.id).unwrap().unwrap();
        assert_eq!(reloaded.contact_person_id, None);
    }
}
