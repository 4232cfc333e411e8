//! Parameter definitions for the notification MCP tool.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the `trigger_notification` MCP tool.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct TriggerNotificationParams {
    #[schemars(description = "Notification title")]
    pub title: String,

    #[schemars(description = "Notification body")]
    pub message: String,

    /// Overrides the configured default sound.
    #[schemars(description = "Notification sound; defaults to the configured sound")]
    pub sound: Option<String>,

    /// Forwarded to the bridge verbatim.
    #[schemars(description = "Arbitrary JSON metadata forwarded to the bridge")]
    pub metadata: Option<serde_json::Value>,
}
