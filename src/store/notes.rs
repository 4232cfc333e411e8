//! Note rows — annotations attachable to any entity via the tagged
//! `(entity_type, entity_id)` pair.

use anyhow::anyhow;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{col_dt, col_enum, col_enum_opt, col_tags, dedupe_tags, fmt_dt, tags_json, validate_entity_ref};
use crate::error::{MosaicError, Result};
use crate::store::types::{EntityKind, Note, PrivacyLevel};

pub(crate) const COLUMNS: &str =
    "id, text, privacy_level, entity_type, entity_id, tags, created_at, updated_at";

pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Note> {
    Ok(Note {
        id: row.get(0)?,
        text: row.get(1)?,
        privacy_level: col_enum(row, 2)?,
        entity_type: col_enum_opt(row, 3)?,
        entity_id: row.get(4)?,
        tags: col_tags(row, 5)?,
        created_at: col_dt(row, 6)?,
        updated_at: col_dt(row, 7)?,
    })
}

pub struct NewNote {
    pub text: String,
    pub privacy_level: PrivacyLevel,
    pub entity_type: Option<EntityKind>,
    pub entity_id: Option<i64>,
    pub tags: Vec<String>,
}

pub fn create_note(conn: &Connection, new: NewNote) -> Result<Note> {
    if new.text.trim().is_empty() {
        return Err(MosaicError::invalid("note text must not be empty"));
    }
    validate_entity_ref(conn, new.entity_type, new.entity_id)?;

    let now = fmt_dt(Utc::now());
    conn.execute(
        "INSERT INTO notes (text, privacy_level, entity_type, entity_id, tags, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            new.text,
            new.privacy_level.as_str(),
            new.entity_type.map(|k| k.as_str()),
            new.entity_id,
            tags_json(&dedupe_tags(new.tags)),
            now,
            now
        ],
    )?;

    let id = conn.last_insert_rowid();
    get_note(conn, id)?
        .ok_or_else(|| MosaicError::Internal(anyhow!("note {id} missing after insert")))
}

pub fn get_note(conn: &Connection, id: i64) -> Result<Option<Note>> {
    conn.query_row(
        &format!("SELECT {COLUMNS} FROM notes WHERE id = ?1"),
        [id],
        from_row,
    )
    .optional()
    .map_err(Into::into)
}

#[derive(Default)]
pub struct NotePatch {
    pub text: Option<String>,
    pub privacy_level: Option<PrivacyLevel>,
    pub entity_type: Option<EntityKind>,
    pub entity_id: Option<i64>,
    pub tags: Option<Vec<String>>,
}

pub fn update_note(conn: &Connection, id: i64, patch: NotePatch) -> Result<Note> {
    let existing = get_note(conn, id)?.ok_or_else(|| MosaicError::not_found("note", id))?;

    let text = patch.text.unwrap_or(existing.text);
    if text.trim().is_empty() {
        return Err(MosaicError::invalid("note text must not be empty"));
    }

    // Re-attaching requires the full pair; partial changes would break the
    // all-or-nothing invariant.
    let (entity_type, entity_id) = match (patch.entity_type, patch.entity_id) {
        (None, None) => (existing.entity_type, existing.entity_id),
        (kind, id) => {
            validate_entity_ref(conn, kind, id)?;
            (kind, id)
        }
    };

    let tags = patch.tags.map(dedupe_tags).unwrap_or(existing.tags);

    conn.execute(
        "UPDATE notes SET text = ?1, privacy_level = ?2, entity_type = ?3, entity_id = ?4, \
         tags = ?5, updated_at = ?6 WHERE id = ?7",
        params![
            text,
            patch
                .privacy_level
                .unwrap_or(existing.privacy_level)
                .as_str(),
            entity_type.map(|k| k.as_str()),
            entity_id,
            tags_json(&tags),
            fmt_dt(Utc::now()),
            id
        ],
    )?;

    get_note(conn, id)?
        .ok_or_else(|| MosaicError::Internal(anyhow!("note {id} missing after update")))
}
