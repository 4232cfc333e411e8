//! The static relationship graph and field tables behind the query DSL.
//!
//! Dotted paths are validated and compiled against this metadata: each table
//! lists its filterable fields (schema name → storage column → type) and its
//! named relationship edges. The graph is the single source of truth for
//! what the DSL can reach.

use crate::error::{MosaicError, Result};
use crate::store::types::EntityKind;

/// Leaf value type of a field, driving operator compatibility and parameter
/// binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Integer,
    /// 1-dp decimal stored as text; compared and aggregated via CAST.
    Decimal,
    Text,
    /// Stored enumeration; equality/membership only.
    Enum,
    Date,
    DateTime,
    Bool,
    /// JSON array of strings; tag operators only.
    Tags,
    /// Free-form JSON; not filterable.
    Json,
}

impl FieldType {
    pub fn orderable(&self) -> bool {
        matches!(
            self,
            Self::Integer | Self::Decimal | Self::Date | Self::DateTime
        )
    }

    /// Usable with eq/ne/in/not_in and as a grouping or min/max target.
    pub fn scalar(&self) -> bool {
        !matches!(self, Self::Tags | Self::Json)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FieldDef {
    /// Schema-level name accepted by the DSL.
    pub name: &'static str,
    /// Underlying storage column. The mapping is one-way and deterministic.
    pub column: &'static str,
    pub ty: FieldType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    One,
    Many,
}

#[derive(Debug)]
pub struct EdgeDef {
    pub name: &'static str,
    /// Target table name.
    pub target: &'static str,
    pub cardinality: Cardinality,
    /// For `One` edges: the FK column on the source table. For `Many` edges:
    /// the FK column on the target (child) table pointing back at the source.
    pub column: &'static str,
}

#[derive(Debug)]
pub struct TableMeta {
    pub table: &'static str,
    pub fields: &'static [FieldDef],
    pub edges: &'static [EdgeDef],
    /// Whether the table carries a `privacy_level` column.
    pub privacy: bool,
}

impl TableMeta {
    pub fn field(&'static self, name: &str) -> Option<&'static FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn edge(&'static self, name: &str) -> Option<&'static EdgeDef> {
        self.edges.iter().find(|e| e.name == name)
    }
}

use Cardinality::{Many, One};
use FieldType::*;

const TIMESTAMPS: [FieldDef; 2] = [
    FieldDef { name: "created_at", column: "created_at", ty: DateTime },
    FieldDef { name: "updated_at", column: "updated_at", ty: DateTime },
];

macro_rules! field {
    ($name:literal, $ty:expr) => {
        FieldDef { name: $name, column: $name, ty: $ty }
    };
    ($name:literal => $column:literal, $ty:expr) => {
        FieldDef { name: $name, column: $column, ty: $ty }
    };
}

static WORK_SESSIONS: TableMeta = TableMeta {
    table: "work_sessions",
    fields: &[
        field!("id", Integer),
        field!("project_id", Integer),
        field!("date", Date),
        field!("start_time", DateTime),
        field!("end_time", DateTime),
        field!("duration_hours", Decimal),
        field!("summary", Text),
        field!("privacy_level", Enum),
        field!("tags", Tags),
        TIMESTAMPS[0],
        TIMESTAMPS[1],
    ],
    edges: &[EdgeDef {
        name: "project",
        target: "projects",
        cardinality: One,
        column: "project_id",
    }],
    privacy: true,
};

static MEETINGS: TableMeta = TableMeta {
    table: "meetings",
    fields: &[
        field!("id", Integer),
        field!("title", Text),
        field!("start_time", DateTime),
        field!("duration_minutes", Integer),
        field!("summary", Text),
        field!("privacy_level", Enum),
        field!("project_id", Integer),
        field!("meeting_type", Text),
        field!("location", Text),
        field!("tags", Tags),
        TIMESTAMPS[0],
        TIMESTAMPS[1],
    ],
    edges: &[
        EdgeDef {
            name: "project",
            target: "projects",
            cardinality: One,
            column: "project_id",
        },
        EdgeDef {
            name: "attendees",
            target: "meeting_attendees",
            cardinality: Many,
            column: "meeting_id",
        },
    ],
    privacy: true,
};

static MEETING_ATTENDEES: TableMeta = TableMeta {
    table: "meeting_attendees",
    fields: &[
        field!("id", Integer),
        field!("meeting_id", Integer),
        field!("person_id", Integer),
    ],
    edges: &[
        EdgeDef {
            name: "person",
            target: "people",
            cardinality: One,
            column: "person_id",
        },
        EdgeDef {
            name: "meeting",
            target: "meetings",
            cardinality: One,
            column: "meeting_id",
        },
    ],
    privacy: false,
};

static PROJECTS: TableMeta = TableMeta {
    table: "projects",
    fields: &[
        field!("id", Integer),
        field!("name", Text),
        field!("client_id", Integer),
        field!("on_behalf_of" => "on_behalf_of_id", Integer),
        field!("description", Text),
        field!("status", Enum),
        field!("start_date", Date),
        field!("end_date", Date),
        field!("tags", Tags),
        TIMESTAMPS[0],
        TIMESTAMPS[1],
    ],
    edges: &[
        EdgeDef {
            name: "client",
            target: "clients",
            cardinality: One,
            column: "client_id",
        },
        EdgeDef {
            name: "on_behalf_of",
            target: "employers",
            cardinality: One,
            column: "on_behalf_of_id",
        },
    ],
    privacy: false,
};

static CLIENTS: TableMeta = TableMeta {
    table: "clients",
    fields: &[
        field!("id", Integer),
        field!("name", Text),
        field!("type", Enum),
        field!("status", Enum),
        field!("contact_person_id", Integer),
        field!("notes", Text),
        field!("tags", Tags),
        TIMESTAMPS[0],
        TIMESTAMPS[1],
    ],
    edges: &[EdgeDef {
        name: "contact_person",
        target: "people",
        cardinality: One,
        column: "contact_person_id",
    }],
    privacy: false,
};

static PEOPLE: TableMeta = TableMeta {
    table: "people",
    fields: &[
        field!("id", Integer),
        field!("full_name", Text),
        field!("email", Text),
        field!("phone", Text),
        field!("linkedin_url", Text),
        field!("company", Text),
        field!("title", Text),
        field!("notes", Text),
        field!("additional_info", Json),
        field!("is_stakeholder", Bool),
        field!("tags", Tags),
        TIMESTAMPS[0],
        TIMESTAMPS[1],
    ],
    edges: &[EdgeDef {
        name: "employments",
        target: "employment_history",
        cardinality: Many,
        column: "person_id",
    }],
    privacy: false,
};

static EMPLOYMENT_HISTORY: TableMeta = TableMeta {
    table: "employment_history",
    fields: &[
        field!("id", Integer),
        field!("person_id", Integer),
        field!("client_id", Integer),
        field!("role", Text),
        field!("start_date", Date),
        field!("end_date", Date),
    ],
    edges: &[
        EdgeDef {
            name: "person",
            target: "people",
            cardinality: One,
            column: "person_id",
        },
        EdgeDef {
            name: "client",
            target: "clients",
            cardinality: One,
            column: "client_id",
        },
    ],
    privacy: false,
};

static EMPLOYERS: TableMeta = TableMeta {
    table: "employers",
    fields: &[
        field!("id", Integer),
        field!("name", Text),
        field!("notes", Text),
        field!("tags", Tags),
        TIMESTAMPS[0],
        TIMESTAMPS[1],
    ],
    edges: &[],
    privacy: false,
};

static NOTES: TableMeta = TableMeta {
    table: "notes",
    fields: &[
        field!("id", Integer),
        field!("text", Text),
        field!("privacy_level", Enum),
        field!("entity_type", Enum),
        field!("entity_id", Integer),
        field!("tags", Tags),
        TIMESTAMPS[0],
        TIMESTAMPS[1],
    ],
    edges: &[],
    privacy: true,
};

static REMINDERS: TableMeta = TableMeta {
    table: "reminders",
    fields: &[
        field!("id", Integer),
        field!("reminder_time", DateTime),
        field!("message", Text),
        field!("is_completed", Bool),
        field!("related_entity_type", Enum),
        field!("related_entity_id", Integer),
        field!("snoozed_until", DateTime),
        field!("tags", Tags),
        TIMESTAMPS[0],
        TIMESTAMPS[1],
    ],
    edges: &[],
    privacy: false,
};

/// The base table for a query entity.
pub fn base_table(kind: EntityKind) -> &'static TableMeta {
    match kind {
        EntityKind::WorkSession => &WORK_SESSIONS,
        EntityKind::Meeting => &MEETINGS,
        EntityKind::Project => &PROJECTS,
        EntityKind::Client => &CLIENTS,
        EntityKind::Person => &PEOPLE,
        EntityKind::Employer => &EMPLOYERS,
        EntityKind::Note => &NOTES,
        EntityKind::Reminder => &REMINDERS,
    }
}

fn table_meta(table: &str) -> Option<&'static TableMeta> {
    match table {
        "work_sessions" => Some(&WORK_SESSIONS),
        "meetings" => Some(&MEETINGS),
        "meeting_attendees" => Some(&MEETING_ATTENDEES),
        "projects" => Some(&PROJECTS),
        "clients" => Some(&CLIENTS),
        "people" => Some(&PEOPLE),
        "employment_history" => Some(&EMPLOYMENT_HISTORY),
        "employers" => Some(&EMPLOYERS),
        "notes" => Some(&NOTES),
        "reminders" => Some(&REMINDERS),
        _ => None,
    }
}

/// One traversed edge of a resolved path.
#[derive(Debug, Clone, Copy)]
pub struct PathStep {
    pub edge: &'static EdgeDef,
    pub to: &'static TableMeta,
}

/// A validated dotted path: zero or more relationship steps ending in a
/// field on the final table.
#[derive(Debug, Clone)]
pub struct ResolvedPath {
    pub raw: String,
    pub steps: Vec<PathStep>,
    pub leaf: &'static FieldDef,
}

impl ResolvedPath {
    /// Whether the path crosses a collection-valued edge.
    pub fn has_many(&self) -> bool {
        self.steps
            .iter()
            .any(|s| s.edge.cardinality == Cardinality::Many)
    }

    /// Join-prefix key for the first `n` steps (used for join reuse).
    pub fn prefix_key(&self, n: usize) -> String {
        self.steps[..n]
            .iter()
            .map(|s| s.edge.name)
            .collect::<Vec<_>>()
            .join(".")
    }
}

/// Resolve a dotted field path rooted at the base entity.
pub fn resolve_path(kind: EntityKind, path: &str) -> Result<ResolvedPath> {
    if path.is_empty() {
        return Err(MosaicError::invalid("field path must not be empty"));
    }

    let mut current = base_table(kind);
    let mut steps = Vec::new();
    let parts: Vec<&str> = path.split('.').collect();

    for (i, part) in parts.iter().enumerate() {
        let is_last = i == parts.len() - 1;
        if is_last {
            let leaf = current.field(part).ok_or_else(|| {
                MosaicError::invalid(format!(
                    "invalid field: {part:?} does not exist on {}",
                    current.table
                ))
            })?;
            return Ok(ResolvedPath {
                raw: path.to_string(),
                steps,
                leaf,
            });
        }

        let edge = current.edge(part).ok_or_else(|| {
            MosaicError::invalid(format!(
                "invalid path: {part:?} is not a relationship of {}",
                current.table
            ))
        })?;
        let to = table_meta(edge.target).ok_or_else(|| {
            MosaicError::Internal(anyhow::anyhow!("edge {part} targets unknown table"))
        })?;
        steps.push(PathStep { edge, to });
        current = to;
    }

    unreachable!("split never yields an empty iterator")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_field_resolves_without_steps() {
        let path = resolve_path(EntityKind::WorkSession, "date").unwrap();
        assert!(path.steps.is_empty());
        assert_eq!(path.leaf.ty, FieldType::Date);
    }

    #[test]
    fn chained_one_edges_resolve() {
        let path = resolve_path(EntityKind::WorkSession, "project.client.name").unwrap();
        assert_eq!(path.steps.len(), 2);
        assert!(!path.has_many());
        assert_eq!(path.leaf.column, "name");
        assert_eq!(path.steps[1].to.table, "clients");
    }

    #[test]
    fn attendee_paths_cross_a_many_edge() {
        let path = resolve_path(EntityKind::Meeting, "attendees.person.email").unwrap();
        assert!(path.has_many());
        assert_eq!(path.steps[0].to.table, "meeting_attendees");
        assert_eq!(path.steps[1].to.table, "people");
    }

    #[test]
    fn schema_name_maps_to_storage_column() {
        let path = resolve_path(EntityKind::Project, "on_behalf_of").unwrap();
        assert_eq!(path.leaf.column, "on_behalf_of_id");
    }

    #[test]
    fn unknown_field_and_relationship_are_rejected() {
        assert!(resolve_path(EntityKind::WorkSession, "projectt.name").is_err());
        assert!(resolve_path(EntityKind::WorkSession, "project.nope").is_err());
        assert!(resolve_path(EntityKind::Employer, "client.name").is_err());
        // fields are not relationships
        assert!(resolve_path(EntityKind::WorkSession, "summary.name").is_err());
    }
}
