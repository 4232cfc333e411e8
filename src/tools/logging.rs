//! Parameter definitions for the time-logging MCP tools.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the `log_work_session` MCP tool.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct LogWorkSessionParams {
    /// Project the work was done for.
    #[schemars(description = "Project the work was done for")]
    pub project_id: i64,

    /// Session start, ISO 8601 with explicit offset (e.g. 2026-01-15T14:00:00Z).
    #[schemars(description = "Session start, ISO 8601 with explicit offset")]
    pub start_time: String,

    /// Session end, ISO 8601 with explicit offset. Must be after start_time.
    #[schemars(description = "Session end, ISO 8601 with explicit offset; must be after start")]
    pub end_time: String,

    /// What was worked on.
    #[schemars(description = "What was worked on")]
    pub summary: Option<String>,

    /// `"public"`, `"internal"`, or `"private"`. Defaults to the profile's default.
    #[schemars(description = "Privacy level: 'public', 'internal', or 'private'")]
    pub privacy_level: Option<String>,

    /// Tags for categorization.
    #[schemars(description = "Tags for categorization")]
    pub tags: Option<Vec<String>>,
}

/// Parameters for the `log_meeting` MCP tool.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct LogMeetingParams {
    /// Meeting title.
    #[schemars(description = "Meeting title")]
    pub title: String,

    /// Meeting start, ISO 8601 with explicit offset.
    #[schemars(description = "Meeting start, ISO 8601 with explicit offset")]
    pub start_time: String,

    /// Meeting length in minutes; must be positive.
    #[schemars(description = "Meeting length in minutes (positive)")]
    pub duration_minutes: i64,

    /// What was discussed.
    #[schemars(description = "What was discussed")]
    pub summary: Option<String>,

    /// `"public"`, `"internal"`, or `"private"`. Defaults to the profile's default.
    #[schemars(description = "Privacy level: 'public', 'internal', or 'private'")]
    pub privacy_level: Option<String>,

    /// Project to bill this meeting to. When set, a work session covering
    /// the meeting is created atomically alongside it.
    #[schemars(
        description = "Project to bill the meeting to; also auto-creates a matching work session"
    )]
    pub project_id: Option<i64>,

    /// Kind of meeting (e.g. "1:1", "standup").
    #[schemars(description = "Kind of meeting, e.g. '1:1' or 'standup'")]
    pub meeting_type: Option<String>,

    /// Where the meeting happened.
    #[schemars(description = "Where the meeting happened")]
    pub location: Option<String>,

    /// Person ids of the attendees.
    #[schemars(description = "Person ids of the attendees")]
    pub attendee_ids: Option<Vec<i64>>,

    /// Tags for categorization.
    #[schemars(description = "Tags for categorization")]
    pub tags: Option<Vec<String>>,
}

/// Parameters for the `delete_work_session` MCP tool.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct DeleteWorkSessionParams {
    /// Work session to delete.
    #[schemars(description = "Work session to delete")]
    pub work_session_id: i64,
}

/// Parameters for the `delete_meeting` MCP tool.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct DeleteMeetingParams {
    /// Meeting to delete. Attendee rows go with it; any auto-generated work
    /// session stays.
    #[schemars(description = "Meeting to delete (auto-generated work sessions stay)")]
    pub meeting_id: i64,
}
