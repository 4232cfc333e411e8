//! Parameter definitions for the query and timecard MCP tools.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::query::privacy::AccessMode;
use crate::query::Query;

/// Parameters for the structured `query` MCP tool.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct QueryParams {
    /// The structured query AST.
    #[schemars(
        description = "Structured query: entity_type, filters (dotted paths, 15 operators), optional aggregation with group_by, limit/offset, order_by"
    )]
    pub structured_query: Query,

    /// Privacy projection for work sessions, meetings, and notes. Defaults
    /// to full access.
    #[schemars(
        description = "Privacy projection: 'all' (default), 'internal_and_public', or 'public_only'"
    )]
    pub access_mode: Option<AccessMode>,
}

/// Parameters for the loose `search` MCP tool.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct SearchParams {
    /// Loose query text, e.g. "work sessions this week".
    #[schemars(description = "Loose query text, e.g. 'work sessions this week'")]
    pub text: String,
}

/// Parameters for the `generate_timecard` MCP tool.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct TimecardParams {
    #[schemars(description = "Project to build the timecard for")]
    pub project_id: i64,

    #[schemars(description = "First day of the range, YYYY-MM-DD (inclusive)")]
    pub start_date: String,

    #[schemars(description = "Last day of the range, YYYY-MM-DD (inclusive)")]
    pub end_date: String,

    /// When false, private sessions are excluded and internal summaries are
    /// genericized (the external-facing rendering).
    #[schemars(
        description = "Include private sessions and real internal summaries (default true)"
    )]
    pub include_private: Option<bool>,
}
