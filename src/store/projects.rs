//! Project rows. RESTRICT edges to clients and employers protect billing
//! history; the completed-implies-end-date invariant is enforced here.

use anyhow::anyhow;
use chrono::{NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{
    col_date_opt, col_dt, col_enum, col_tags, dedupe_tags, exists, fmt_date, fmt_dt, tags_json,
};
use crate::error::{MosaicError, Result};
use crate::store::types::{Project, ProjectStatus};

pub(crate) const COLUMNS: &str = "id, name, client_id, on_behalf_of_id, description, status, \
     start_date, end_date, tags, created_at, updated_at";

pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Project> {
    Ok(Project {
        id: row.get(0)?,
        name: row.get(1)?,
        client_id: row.get(2)?,
        on_behalf_of: row.get(3)?,
        description: row.get(4)?,
        status: col_enum(row, 5)?,
        start_date: col_date_opt(row, 6)?,
        end_date: col_date_opt(row, 7)?,
        tags: col_tags(row, 8)?,
        created_at: col_dt(row, 9)?,
        updated_at: col_dt(row, 10)?,
    })
}

pub struct NewProject {
    pub name: String,
    pub client_id: i64,
    pub on_behalf_of: Option<i64>,
    pub description: Option<String>,
    pub status: ProjectStatus,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub tags: Vec<String>,
}

fn check_completed_invariant(status: ProjectStatus, end_date: Option<NaiveDate>) -> Result<()> {
    if status == ProjectStatus::Completed && end_date.is_none() {
        return Err(MosaicError::invalid(
            "a completed project must have an end_date",
        ));
    }
    Ok(())
}

pub fn create_project(conn: &Connection, new: NewProject) -> Result<Project> {
    if new.name.trim().is_empty() {
        return Err(MosaicError::invalid("project name must not be empty"));
    }
    if !exists(conn, "clients", new.client_id)? {
        return Err(MosaicError::not_found("client", new.client_id));
    }
    if let Some(employer_id) = new.on_behalf_of {
        if !exists(conn, "employers", employer_id)? {
            return Err(MosaicError::not_found("employer", employer_id));
        }
    }
    check_completed_invariant(new.status, new.end_date)?;

    let now = fmt_dt(Utc::now());
    conn.execute(
        "INSERT INTO projects (name, client_id, on_behalf_of_id, description, status, \
         start_date, end_date, tags, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            new.name,
            new.client_id,
            new.on_behalf_of,
            new.description,
            new.status.as_str(),
            new.start_date.map(fmt_date),
            new.end_date.map(fmt_date),
            tags_json(&dedupe_tags(new.tags)),
            now,
            now
        ],
    )?;

    let id = conn.last_insert_rowid();
    get_project(conn, id)?
        .ok_or_else(|| MosaicError::Internal(anyhow!("project {id} missing after insert")))
}

pub fn get_project(conn: &Connection, id: i64) -> Result<Option<Project>> {
    conn.query_row(
        &format!("SELECT {COLUMNS} FROM projects WHERE id = ?1"),
        [id],
        from_row,
    )
    .optional()
    .map_err(Into::into)
}

#[derive(Default)]
pub struct ProjectPatch {
    pub name: Option<String>,
    pub client_id: Option<i64>,
    pub on_behalf_of: Option<i64>,
    pub description: Option<String>,
    pub status: Option<ProjectStatus>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub tags: Option<Vec<String>>,
}

pub fn update_project(conn: &Connection, id: i64, patch: ProjectPatch) -> Result<Project> {
    let existing = get_project(conn, id)?.ok_or_else(|| MosaicError::not_found("project", id))?;

    let name = patch.name.unwrap_or(existing.name);
    if name.trim().is_empty() {
        return Err(MosaicError::invalid("project name must not be empty"));
    }
    let client_id = patch.client_id.unwrap_or(existing.client_id);
    if !exists(conn, "clients", client_id)? {
        return Err(MosaicError::not_found("client", client_id));
    }
    let on_behalf_of = patch.on_behalf_of.or(existing.on_behalf_of);
    if let Some(employer_id) = patch.on_behalf_of {
        if !exists(conn, "employers", employer_id)? {
            return Err(MosaicError::not_found("employer", employer_id));
        }
    }
    let status = patch.status.unwrap_or(existing.status);
    let end_date = patch.end_date.or(existing.end_date);
    check_completed_invariant(status, end_date)?;
    let tags = patch.tags.map(dedupe_tags).unwrap_or(existing.tags);

    conn.execute(
        "UPDATE projects SET name = ?1, client_id = ?2, on_behalf_of_id = ?3, description = ?4, \
         status = ?5, start_date = ?6, end_date = ?7, tags = ?8, updated_at = ?9 WHERE id = ?10",
        params![
            name,
            client_id,
            on_behalf_of,
            patch.description.or(existing.description),
            status.as_str(),
            patch.start_date.or(existing.start_date).map(fmt_date),
            end_date.map(fmt_date),
            tags_json(&tags),
            fmt_dt(Utc::now()),
            id
        ],
    )?;

    get_project(conn, id)?
        .ok_or_else(|| MosaicError::Internal(anyhow!("project {id} missing after update")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::clients::{create_client, NewClient};
    use crate::store::types::{ClientStatus, ClientType};

    fn seed_client(conn: &Connection) -> i64 {
        create_client(
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
        .unwrap()
        .id
    }

    pub(crate) fn new_project(client_id: i64, name: &str) -> NewProject {
        NewProject {
            name: name.into(),
            client_id,
            on_behalf_of: None,
            description: None,
            status: ProjectStatus::Active,
            start_date: None,
            end_date: None,
            tags: vec![],
        }
    }

    #[test]
    fn missing_client_is_not_found() {
        let conn = crate::db::open_memory_database().unwrap();
        let err = create_project(&conn, new_project(999, "Website")).unwrap_err();
        assert_eq!(err.code(), "not_found");
    }

    #[test]
    fn completed_without_end_date_is_rejected() {
        let conn = crate::db::open_memory_database().unwrap();
        let client_id = seed_client(&conn);

        let mut new = new_project(client_id, "Website");
        new.status = ProjectStatus::Completed;
        let err = create_project(&conn, new).unwrap_err();
        assert_eq!(err.code(), "invalid_argument");

        // Same invariant on update
        let project = create_project(&conn, new_project(client_id, "Website")).unwrap();
        let err = update_project(
            &conn,
            project.id,
            ProjectPatch {
                status: Some(ProjectStatus::Completed),
                ..Default::default()
            },
        )
        .unwrap_err();
        assert_eq!(err.code(), "invalid_argument");

        let ok = update_project(
            &conn,
            project.id,
            ProjectPatch {
                status: Some(ProjectStatus::Completed),
                end_date: NaiveDate::from_ymd_opt(2026, 6, 30),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(ok.status, ProjectStatus::Completed);
    }

    #[test]
    fn client_delete_is_restricted_while_projects_exist() {
        let conn = crate::db::open_memory_database().unwrap();
        let client_id = seed_client(&conn);
        create_project(&conn, new_project(client_id, "Website")).unwrap();

        let err = conn.execute("DELETE FROM clients WHERE id = ?1", [client_id]);
        assert!(err.is_err(), "RESTRICT must block the delete");
    }
}
