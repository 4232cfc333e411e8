//! Parameter definitions for the reminder MCP tools.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::store::types::RecurrenceConfig;

/// Parameters for the `add_reminder` MCP tool.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct AddReminderParams {
    /// When to fire, ISO 8601 with explicit offset.
    #[schemars(description = "When to fire, ISO 8601 with explicit offset")]
    pub reminder_time: String,

    #[schemars(description = "Reminder message")]
    pub message: String,

    /// Recurrence settings; completing a recurring reminder schedules the
    /// next occurrence automatically.
    #[schemars(
        description = "Recurrence: {frequency: daily|weekly|monthly, day_of_week?: 0-6, day_of_month?: 1-31}"
    )]
    pub recurrence_config: Option<RecurrenceConfig>,

    #[schemars(
        description = "Entity kind this reminder relates to; requires related_entity_id"
    )]
    pub related_entity_type: Option<String>,

    #[schemars(description = "Id of the related entity; requires related_entity_type")]
    pub related_entity_id: Option<i64>,

    #[schemars(description = "Tags for categorization")]
    pub tags: Option<Vec<String>>,
}

/// Parameters for the `update_reminder` MCP tool.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct UpdateReminderParams {
    #[schemars(description = "Reminder to update")]
    pub reminder_id: i64,

    /// Moving the time forward re-arms dispatch for the new instant.
    #[schemars(description = "New fire time, ISO 8601 with explicit offset")]
    pub reminder_time: Option<String>,

    #[schemars(description = "New message")]
    pub message: Option<String>,

    #[schemars(description = "Replacement recurrence settings")]
    pub recurrence_config: Option<RecurrenceConfig>,

    #[schemars(description = "Replacement tag list")]
    pub tags: Option<Vec<String>>,
}

/// Parameters for the `complete_reminder` MCP tool.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct CompleteReminderParams {
    /// Reminder to complete. Recurring reminders atomically spawn their next
    /// occurrence.
    #[schemars(description = "Reminder to complete (recurring ones spawn the next occurrence)")]
    pub reminder_id: i64,
}

/// Parameters for the `snooze_reminder` MCP tool.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct SnoozeReminderParams {
    #[schemars(description = "Reminder to snooze")]
    pub reminder_id: i64,

    /// The reminder will not fire again until this instant.
    #[schemars(description = "Snooze until, ISO 8601 with explicit offset")]
    pub snoozed_until: String,
}
