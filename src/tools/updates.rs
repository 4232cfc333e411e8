//! Parameter definitions for the partial-update MCP tools.
//!
//! Only provided fields mutate; everything else keeps its stored value.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the `update_work_session` MCP tool.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct UpdateWorkSessionParams {
    #[schemars(description = "Work session to update")]
    pub work_session_id: i64,
    #[schemars(description = "New project id")]
    pub project_id: Option<i64>,
    /// Changing either endpoint recomputes duration and date atomically.
    #[schemars(description = "New start, ISO 8601 with explicit offset")]
    pub start_time: Option<String>,
    #[schemars(description = "New end, ISO 8601 with explicit offset")]
    pub end_time: Option<String>,
    #[schemars(description = "New summary")]
    pub summary: Option<String>,
    #[schemars(description = "New privacy level")]
    pub privacy_level: Option<String>,
    #[schemars(description = "Replacement tag list")]
    pub tags: Option<Vec<String>>,
}

/// Parameters for the `update_meeting` MCP tool.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct UpdateMeetingParams {
    #[schemars(description = "Meeting to update")]
    pub meeting_id: i64,
    #[schemars(description = "New title")]
    pub title: Option<String>,
    #[schemars(description = "New start, ISO 8601 with explicit offset")]
    pub start_time: Option<String>,
    #[schemars(description = "New duration in minutes (positive)")]
    pub duration_minutes: Option<i64>,
    #[schemars(description = "New summary")]
    pub summary: Option<String>,
    #[schemars(description = "New privacy level")]
    pub privacy_level: Option<String>,
    /// Any previously auto-generated work session is left intact.
    #[schemars(description = "New project id (existing auto work sessions are not touched)")]
    pub project_id: Option<i64>,
    #[schemars(description = "New meeting type")]
    pub meeting_type: Option<String>,
    #[schemars(description = "New location")]
    pub location: Option<String>,
    #[schemars(description = "Replacement attendee person ids")]
    pub attendee_ids: Option<Vec<i64>>,
    #[schemars(description = "Replacement tag list")]
    pub tags: Option<Vec<String>>,
}

/// Parameters for the `update_person` MCP tool.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct UpdatePersonParams {
    #[schemars(description = "Person to update")]
    pub person_id: i64,
    #[schemars(description = "New full name")]
    pub full_name: Option<String>,
    #[schemars(description = "New email")]
    pub email: Option<String>,
    #[schemars(description = "New phone")]
    pub phone: Option<String>,
    #[schemars(description = "New LinkedIn URL")]
    pub linkedin_url: Option<String>,
    #[schemars(description = "New company")]
    pub company: Option<String>,
    #[schemars(description = "New title")]
    pub title: Option<String>,
    #[schemars(description = "New notes")]
    pub notes: Option<String>,
    #[schemars(description = "Replacement additional info object")]
    pub additional_info: Option<serde_json::Value>,
    #[schemars(description = "New stakeholder flag")]
    pub is_stakeholder: Option<bool>,
    #[schemars(description = "Replacement tag list")]
    pub tags: Option<Vec<String>>,
}

/// Parameters for the `update_client` MCP tool.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct UpdateClientParams {
    #[schemars(description = "Client to update")]
    pub client_id: i64,
    #[schemars(description = "New name")]
    pub name: Option<String>,
    #[schemars(description = "New type: 'company' or 'individual'")]
    pub r#type: Option<String>,
    #[schemars(description = "New status: 'active' or 'past'")]
    pub status: Option<String>,
    #[schemars(description = "New contact person id")]
    pub contact_person_id: Option<i64>,
    #[schemars(description = "New notes")]
    pub notes: Option<String>,
    #[schemars(description = "Replacement tag list")]
    pub tags: Option<Vec<String>>,
}

/// Parameters for the `update_project` MCP tool.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct UpdateProjectParams {
    #[schemars(description = "Project to update")]
    pub project_id: i64,
    #[schemars(description = "New name")]
    pub name: Option<String>,
    #[schemars(description = "New client id")]
    pub client_id: Option<i64>,
    #[schemars(description = "New employer id")]
    pub on_behalf_of: Option<i64>,
    #[schemars(description = "New description")]
    pub description: Option<String>,
    #[schemars(description = "New status; 'completed' requires an end date")]
    pub status: Option<String>,
    #[schemars(description = "New start date, YYYY-MM-DD")]
    pub start_date: Option<String>,
    #[schemars(description = "New end date, YYYY-MM-DD")]
    pub end_date: Option<String>,
    #[schemars(description = "Replacement tag list")]
    pub tags: Option<Vec<String>>,
}

/// Parameters for the `update_note` MCP tool.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct UpdateNoteParams {
    #[schemars(description = "Note to update")]
    pub note_id: i64,
    #[schemars(description = "New text")]
    pub text: Option<String>,
    #[schemars(description = "New privacy level")]
    pub privacy_level: Option<String>,
    /// Re-attachment requires both fields together.
    #[schemars(description = "New entity kind; must be provided together with entity_id")]
    pub entity_type: Option<String>,
    #[schemars(description = "New entity id; must be provided together with entity_type")]
    pub entity_id: Option<i64>,
    #[schemars(description = "Replacement tag list")]
    pub tags: Option<Vec<String>>,
}

/// Parameters for the `get_user` MCP tool (none).
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct GetUserParams {}

/// Parameters for the `update_user` MCP tool.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct UpdateUserParams {
    #[schemars(description = "Display name")]
    pub name: Option<String>,
    #[schemars(description = "Email address")]
    pub email: Option<String>,
    #[schemars(description = "IANA timezone, e.g. 'America/New_York'")]
    pub timezone: Option<String>,
    #[schemars(description = "Week boundary: 'monday' or 'sunday'")]
    pub week_boundary: Option<String>,
    #[schemars(description = "Default privacy level for new records")]
    pub default_privacy_level: Option<String>,
}
