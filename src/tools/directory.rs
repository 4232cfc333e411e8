//! Parameter definitions for the entity-creation MCP tools.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the `add_person` MCP tool.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct AddPersonParams {
    #[schemars(description = "Person's full name")]
    pub full_name: String,
    #[schemars(description = "Email address")]
    pub email: Option<String>,
    #[schemars(description = "Phone number")]
    pub phone: Option<String>,
    #[schemars(description = "LinkedIn profile URL")]
    pub linkedin_url: Option<String>,
    #[schemars(description = "Current company")]
    pub company: Option<String>,
    #[schemars(description = "Job title")]
    pub title: Option<String>,
    #[schemars(description = "Free-form notes")]
    pub notes: Option<String>,
    #[schemars(description = "Additional key/value details as a JSON object")]
    pub additional_info: Option<serde_json::Value>,
    #[schemars(description = "Whether this person is a key decision-maker")]
    pub is_stakeholder: Option<bool>,
    #[schemars(description = "Tags for categorization")]
    pub tags: Option<Vec<String>>,
}

/// Parameters for the `add_client` MCP tool.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct AddClientParams {
    #[schemars(description = "Client name")]
    pub name: String,
    /// `"company"` or `"individual"`.
    #[schemars(description = "Client type: 'company' or 'individual'")]
    pub r#type: String,
    /// `"active"` or `"past"`. Defaults to active.
    #[schemars(description = "Client status: 'active' or 'past' (default 'active')")]
    pub status: Option<String>,
    #[schemars(description = "Person id of the primary contact")]
    pub contact_person_id: Option<i64>,
    #[schemars(description = "Free-form notes")]
    pub notes: Option<String>,
    #[schemars(description = "Tags for categorization")]
    pub tags: Option<Vec<String>>,
}

/// Parameters for the `add_project` MCP tool.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct AddProjectParams {
    #[schemars(description = "Project name")]
    pub name: String,
    #[schemars(description = "Client the project is for")]
    pub client_id: i64,
    #[schemars(description = "Employer id the work is done on behalf of")]
    pub on_behalf_of: Option<i64>,
    #[schemars(description = "What the project is about")]
    pub description: Option<String>,
    /// `"active"`, `"paused"`, or `"completed"`. Completed requires end_date.
    #[schemars(
        description = "Project status: 'active', 'paused', or 'completed' (completed requires end_date)"
    )]
    pub status: Option<String>,
    #[schemars(description = "Start date, YYYY-MM-DD")]
    pub start_date: Option<String>,
    #[schemars(description = "End date, YYYY-MM-DD")]
    pub end_date: Option<String>,
    #[schemars(description = "Tags for categorization")]
    pub tags: Option<Vec<String>>,
}

/// Parameters for the `add_employer` MCP tool.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct AddEmployerParams {
    #[schemars(description = "Employer name")]
    pub name: String,
    #[schemars(description = "Free-form notes")]
    pub notes: Option<String>,
    #[schemars(description = "Tags for categorization")]
    pub tags: Option<Vec<String>>,
}

/// Parameters for the `add_note` MCP tool.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct AddNoteParams {
    #[schemars(description = "Note text")]
    pub text: String,
    #[schemars(description = "Privacy level: 'public', 'internal', or 'private'")]
    pub privacy_level: Option<String>,
    /// Entity kind this note attaches to; requires `entity_id` as well.
    #[schemars(
        description = "Entity kind to attach to (person, client, project, employer, work_session, meeting, reminder); requires entity_id"
    )]
    pub entity_type: Option<String>,
    #[schemars(description = "Id of the entity to attach to; requires entity_type")]
    pub entity_id: Option<i64>,
    #[schemars(description = "Tags for categorization")]
    pub tags: Option<Vec<String>>,
}

/// Parameters for the `add_employment` MCP tool.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct AddEmploymentParams {
    #[schemars(description = "Person taking the role")]
    pub person_id: i64,
    #[schemars(description = "Client the person works at")]
    pub client_id: i64,
    #[schemars(description = "Role title")]
    pub role: Option<String>,
    #[schemars(description = "Start date, YYYY-MM-DD")]
    pub start_date: String,
    /// Omit for a current employment; at most one current row per
    /// (person, client).
    #[schemars(description = "End date, YYYY-MM-DD; omit for a current employment")]
    pub end_date: Option<String>,
}
