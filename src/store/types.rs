//! Entity records and enumerations for the persistent store.
//!
//! Every stored enum round-trips through its textual name (the value written
//! to SQLite and to the wire). Records mirror the table schemas in
//! [`crate::db::schema`] and serialize with schema-level field names only.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Privacy levels for work sessions, meetings, and notes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum PrivacyLevel {
    Public,
    Internal,
    Private,
}

impl PrivacyLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Internal => "internal",
            Self::Private => "private",
        }
    }
}

impl std::fmt::Display for PrivacyLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PrivacyLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "public" => Ok(Self::Public),
            "internal" => Ok(Self::Internal),
            "private" => Ok(Self::Private),
            _ => Err(format!("unknown privacy level: {s}")),
        }
    }
}

/// Whether a client is a company or an individual.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ClientType {
    Company,
    Individual,
}

impl ClientType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Company => "company",
            Self::Individual => "individual",
        }
    }
}

impl std::str::FromStr for ClientType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "company" => Ok(Self::Company),
            "individual" => Ok(Self::Individual),
            _ => Err(format!("unknown client type: {s}")),
        }
    }
}

/// Client relationship status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ClientStatus {
    Active,
    Past,
}

impl ClientStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Past => "past",
        }
    }
}

impl std::str::FromStr for ClientStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "past" => Ok(Self::Past),
            _ => Err(format!("unknown client status: {s}")),
        }
    }
}

/// Project lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    Active,
    Paused,
    Completed,
}

impl ProjectStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Paused => "paused",
            Self::Completed => "completed",
        }
    }
}

impl std::str::FromStr for ProjectStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "paused" => Ok(Self::Paused),
            "completed" => Ok(Self::Completed),
            _ => Err(format!("unknown project status: {s}")),
        }
    }
}

/// The closed set of entity kinds, used for note/reminder attachment and as
/// the base entity of structured queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Person,
    Client,
    Project,
    Employer,
    WorkSession,
    Meeting,
    Note,
    Reminder,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Person => "person",
            Self::Client => "client",
            Self::Project => "project",
            Self::Employer => "employer",
            Self::WorkSession => "work_session",
            Self::Meeting => "meeting",
            Self::Note => "note",
            Self::Reminder => "reminder",
        }
    }

    pub const ALL: [EntityKind; 8] = [
        Self::Person,
        Self::Client,
        Self::Project,
        Self::Employer,
        Self::WorkSession,
        Self::Meeting,
        Self::Note,
        Self::Reminder,
    ];
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EntityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "person" => Ok(Self::Person),
            "client" => Ok(Self::Client),
            "project" => Ok(Self::Project),
            "employer" => Ok(Self::Employer),
            "work_session" => Ok(Self::WorkSession),
            "meeting" => Ok(Self::Meeting),
            "note" => Ok(Self::Note),
            "reminder" => Ok(Self::Reminder),
            _ => Err(format!("unknown entity type: {s}")),
        }
    }
}

/// First day of the week for `this_week` resolution and timecards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum WeekBoundary {
    Monday,
    Sunday,
}

impl WeekBoundary {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Monday => "monday",
            Self::Sunday => "sunday",
        }
    }
}

impl std::str::FromStr for WeekBoundary {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "monday" => Ok(Self::Monday),
            "sunday" => Ok(Self::Sunday),
            _ => Err(format!("unknown week boundary: {s}")),
        }
    }
}

/// How often a recurring reminder repeats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum RecurrenceFrequency {
    Daily,
    Weekly,
    Monthly,
}

/// Recurrence settings carried by a reminder.
///
/// `day_of_week` (0 = Monday … 6 = Sunday) and `day_of_month` (1–31) refine
/// weekly and monthly schedules respectively; both are optional and default
/// to the pattern established by the reminder's own time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct RecurrenceConfig {
    pub frequency: RecurrenceFrequency,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day_of_week: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day_of_month: Option<u8>,
}

impl RecurrenceConfig {
    /// Validate refinement fields against their documented ranges.
    pub fn validate(&self) -> Result<(), String> {
        if let Some(dow) = self.day_of_week {
            if dow > 6 {
                return Err("day_of_week must be 0-6 (Mon-Sun)".into());
            }
        }
        if let Some(dom) = self.day_of_month {
            if !(1..=31).contains(&dom) {
                return Err("day_of_month must be 1-31".into());
            }
        }
        Ok(())
    }
}

/// Who work is done on behalf of.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Employer {
    pub id: i64,
    pub name: String,
    pub notes: Option<String>,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A company or individual that work is done for.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Client {
    pub id: i64,
    pub name: String,
    #[serde(rename = "type")]
    pub client_type: ClientType,
    pub status: ClientStatus,
    pub contact_person_id: Option<i64>,
    pub notes: Option<String>,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A work initiative done for a client, optionally on behalf of an employer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: i64,
    pub name: String,
    pub client_id: i64,
    pub on_behalf_of: Option<i64>,
    pub description: Option<String>,
    pub status: ProjectStatus,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A person with a profile that persists across job changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Person {
    pub id: i64,
    pub full_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub linkedin_url: Option<String>,
    pub company: Option<String>,
    pub title: Option<String>,
    pub notes: Option<String>,
    pub additional_info: Option<serde_json::Value>,
    pub is_stakeholder: bool,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Temporal person↔client relationship; `end_date = None` means current.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmploymentHistory {
    pub id: i64,
    pub person_id: i64,
    pub client_id: i64,
    pub role: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A single block of time spent on one project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkSession {
    pub id: i64,
    pub project_id: i64,
    pub date: NaiveDate,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub duration_hours: Decimal,
    pub summary: Option<String>,
    pub privacy_level: PrivacyLevel,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A discussion event, optionally tied to a project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Meeting {
    pub id: i64,
    pub title: String,
    pub start_time: DateTime<Utc>,
    pub duration_minutes: i64,
    pub summary: Option<String>,
    pub privacy_level: PrivacyLevel,
    pub project_id: Option<i64>,
    pub meeting_type: Option<String>,
    pub location: Option<String>,
    pub attendee_ids: Vec<i64>,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A timestamped annotation, optionally attached to another entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Note {
    pub id: i64,
    pub text: String,
    pub privacy_level: PrivacyLevel,
    pub entity_type: Option<EntityKind>,
    pub entity_id: Option<i64>,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A time-based notification with optional recurrence and entity link.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reminder {
    pub id: i64,
    pub reminder_time: DateTime<Utc>,
    pub message: String,
    pub is_completed: bool,
    pub recurrence_config: Option<RecurrenceConfig>,
    pub related_entity_type: Option<EntityKind>,
    pub related_entity_id: Option<i64>,
    pub snoozed_until: Option<DateTime<Utc>>,
    pub last_dispatched_at: Option<DateTime<Utc>>,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The singleton user profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: i64,
    pub name: String,
    pub email: Option<String>,
    pub timezone: String,
    pub week_boundary: WeekBoundary,
    pub default_privacy_level: PrivacyLevel,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enums_round_trip_through_text() {
        for level in ["public", "internal", "private"] {
            let parsed: PrivacyLevel = level.parse().unwrap();
            assert_eq!(parsed.as_str(), level);
        }
        for kind in EntityKind::ALL {
            let parsed: EntityKind = kind.as_str().parse().unwrap();
            assert_eq!(parsed, kind);
        }
        assert!("shared".parse::<PrivacyLevel>().is_err());
        assert!("team".parse::<EntityKind>().is_err());
    }

    #[test]
    fn recurrence_config_validates_ranges() {
        let ok = RecurrenceConfig {
            frequency: RecurrenceFrequency::Weekly,
            day_of_week: Some(0),
            day_of_month: None,
        };
        assert!(ok.validate().is_ok());

        let bad_dow = RecurrenceConfig {
            frequency: RecurrenceFrequency::Weekly,
            day_of_week: Some(7),
            day_of_month: None,
        };
        assert!(bad_dow.validate().is_err());

        let bad_dom = RecurrenceConfig {
            frequency: RecurrenceFrequency::Monthly,
            day_of_week: None,
            day_of_month: Some(32),
        };
        assert!(bad_dom.validate().is_err());
    }

    #[test]
    fn recurrence_config_rejects_unknown_fields() {
        let err = serde_json::from_str::<RecurrenceConfig>(
            r#"{"frequency": "daily", "interval": 2}"#,
        );
        assert!(err.is_err());
    }
}
