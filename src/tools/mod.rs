//! The MCP tool façade.
//!
//! [`MosaicTools`] holds the shared state (database connection, notification
//! dispatcher, config) and exposes every tool via the `#[tool_router]`
//! macro. Each tool validates its inputs, runs the blocking store work under
//! `spawn_blocking`, and returns the typed output record as JSON. Errors
//! surface as `code: message` strings with the stable machine codes from the
//! error taxonomy.

pub mod directory;
pub mod logging;
pub mod notifications;
pub mod queries;
pub mod reminders;
pub mod updates;

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, NaiveDate, Utc};
use rmcp::handler::server::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::{tool, tool_handler, tool_router, ServerHandler};
use rusqlite::Connection;
use serde::Serialize;

use crate::config::MosaicConfig;
use crate::error::{MosaicError, Result as MosaicResult};
use crate::notify::NotificationDispatcher;
use crate::query::privacy::AccessMode;
use crate::query::{exec, loose, TimeContext};
use crate::store;
use crate::store::types::{EntityKind, Meeting, PrivacyLevel, UserProfile};
use crate::store::user::ProfileDefaults;
use crate::timecard;

use directory::{
    AddClientParams, AddEmployerParams, AddEmploymentParams, AddNoteParams, AddPersonParams,
    AddProjectParams,
};
use logging::{
    DeleteMeetingParams, DeleteWorkSessionParams, LogMeetingParams, LogWorkSessionParams,
};
use notifications::TriggerNotificationParams;
use queries::{QueryParams, SearchParams, TimecardParams};
use reminders::{
    AddReminderParams, CompleteReminderParams, SnoozeReminderParams, UpdateReminderParams,
};
use updates::{
    GetUserParams, UpdateClientParams, UpdateMeetingParams, UpdateNoteParams, UpdatePersonParams,
    UpdateProjectParams, UpdateUserParams, UpdateWorkSessionParams,
};

/// Render an error as the stable `code: message` wire form.
fn err_str(e: MosaicError) -> String {
    format!("{}: {}", e.code(), e)
}

fn join_err(e: tokio::task::JoinError) -> String {
    format!("internal: db task failed: {e}")
}

fn to_output<T: Serialize>(value: &T) -> std::result::Result<String, String> {
    serde_json::to_string(value).map_err(|e| format!("internal: serialization failed: {e}"))
}

/// Parse an ISO 8601 datetime; naive datetimes (no offset) are rejected.
fn parse_dt(s: &str, field: &str) -> std::result::Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| {
            format!("invalid_argument: {field} must be an ISO 8601 datetime with explicit offset")
        })
}

fn parse_date(s: &str, field: &str) -> std::result::Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|_| format!("invalid_argument: {field} must be a YYYY-MM-DD date"))
}

fn parse_opt_date(
    s: &Option<String>,
    field: &str,
) -> std::result::Result<Option<NaiveDate>, String> {
    s.as_deref().map(|s| parse_date(s, field)).transpose()
}

fn parse_enum<T>(s: &str, field: &str) -> std::result::Result<T, String>
where
    T: std::str::FromStr<Err = String>,
{
    s.parse::<T>()
        .map_err(|e| format!("invalid_argument: {field}: {e}"))
}

fn parse_opt_enum<T>(s: &Option<String>, field: &str) -> std::result::Result<Option<T>, String>
where
    T: std::str::FromStr<Err = String>,
{
    s.as_deref().map(|s| parse_enum(s, field)).transpose()
}

fn lock_db(db: &Arc<Mutex<Connection>>) -> MosaicResult<MutexGuard<'_, Connection>> {
    db.lock()
        .map_err(|e| MosaicError::Internal(anyhow::anyhow!("db lock poisoned: {e}")))
}

/// Output of `log_meeting`: the meeting plus the id of the auto-generated
/// work session when a project was attached.
#[derive(Serialize)]
struct LogMeetingOutput {
    #[serde(flatten)]
    meeting: Meeting,
    auto_work_session_id: Option<i64>,
}

#[derive(Serialize)]
struct DeletedOutput {
    deleted: bool,
}

/// The Mosaic MCP tool handler.
#[derive(Clone)]
pub struct MosaicTools {
    tool_router: ToolRouter<Self>,
    db: Arc<Mutex<Connection>>,
    dispatcher: Arc<NotificationDispatcher>,
    config: Arc<MosaicConfig>,
}

impl MosaicTools {
    fn defaults(&self) -> ProfileDefaults {
        self.config.profile_defaults()
    }

    fn profile_of(conn: &Connection, defaults: &ProfileDefaults) -> MosaicResult<UserProfile> {
        store::user::get_or_create_user(conn, defaults)
    }

    fn default_privacy(
        profile: &UserProfile,
        requested: Option<PrivacyLevel>,
    ) -> PrivacyLevel {
        requested.unwrap_or(profile.default_privacy_level)
    }
}

#[tool_router]
impl MosaicTools {
    pub fn new(
        db: Arc<Mutex<Connection>>,
        dispatcher: Arc<NotificationDispatcher>,
        config: Arc<MosaicConfig>,
    ) -> Self {
        Self {
            tool_router: Self::tool_router(),
            db,
            dispatcher,
            config,
        }
    }

    /// Log a block of time spent on a project.
    #[tool(
        description = "Log a work session for a project. Duration is derived from the interval and rounded to the half hour; the session date follows the user's timezone."
    )]
    async fn log_work_session(
        &self,
        Parameters(params): Parameters<LogWorkSessionParams>,
    ) -> std::result::Result<String, String> {
        let start_time = parse_dt(&params.start_time, "start_time")?;
        let end_time = parse_dt(&params.end_time, "end_time")?;
        let privacy = parse_opt_enum::<PrivacyLevel>(&params.privacy_level, "privacy_level")?;

        tracing::info!(project_id = params.project_id, "log_work_session called");

        let db = Arc::clone(&self.db);
        let defaults = self.defaults();
        let session = tokio::task::spawn_blocking(move || -> MosaicResult<_> {
            let conn = lock_db(&db)?;
            let profile = Self::profile_of(&conn, &defaults)?;
            store::sessions::log_session(
                &conn,
                store::user::user_timezone(&profile),
                store::sessions::NewWorkSession {
                    project_id: params.project_id,
                    start_time,
                    end_time,
                    summary: params.summary,
                    privacy_level: Self::default_privacy(&profile, privacy),
                    tags: params.tags.unwrap_or_default(),
                },
            )
        })
        .await
        .map_err(join_err)?
        .map_err(err_str)?;

        tracing::info!(id = session.id, duration = %session.duration_hours, "work session logged");
        to_output(&session)
    }

    /// Log a meeting; with a project attached, also the derived work session.
    #[tool(
        description = "Log a meeting. With project_id set, atomically creates a matching work session (rounded duration, meeting title as summary) and returns its id."
    )]
    async fn log_meeting(
        &self,
        Parameters(params): Parameters<LogMeetingParams>,
    ) -> std::result::Result<String, String> {
        let start_time = parse_dt(&params.start_time, "start_time")?;
        let privacy = parse_opt_enum::<PrivacyLevel>(&params.privacy_level, "privacy_level")?;

        tracing::info!(
            title = %params.title,
            project_id = params.project_id,
            "log_meeting called"
        );

        let db = Arc::clone(&self.db);
        let defaults = self.defaults();
        let logged = tokio::task::spawn_blocking(move || -> MosaicResult<_> {
            let mut conn = lock_db(&db)?;
            let profile = Self::profile_of(&conn, &defaults)?;
            store::meetings::log_meeting(
                &mut conn,
                store::user::user_timezone(&profile),
                store::meetings::NewMeeting {
                    title: params.title,
                    start_time,
                    duration_minutes: params.duration_minutes,
                    summary: params.summary,
                    privacy_level: Self::default_privacy(&profile, privacy),
                    project_id: params.project_id,
                    meeting_type: params.meeting_type,
                    location: params.location,
                    attendee_ids: params.attendee_ids.unwrap_or_default(),
                    tags: params.tags.unwrap_or_default(),
                },
            )
        })
        .await
        .map_err(join_err)?
        .map_err(err_str)?;

        let output = LogMeetingOutput {
            auto_work_session_id: logged.auto_work_session.as_ref().map(|s| s.id),
            meeting: logged.meeting,
        };
        tracing::info!(
            id = output.meeting.id,
            auto_work_session_id = output.auto_work_session_id,
            "meeting logged"
        );
        to_output(&output)
    }

    /// Delete a work session.
    #[tool(description = "Delete a work session by id.")]
    async fn delete_work_session(
        &self,
        Parameters(params): Parameters<DeleteWorkSessionParams>,
    ) -> std::result::Result<String, String> {
        let db = Arc::clone(&self.db);
        let deleted = tokio::task::spawn_blocking(move || -> MosaicResult<bool> {
            let conn = lock_db(&db)?;
            store::sessions::delete_session(&conn, params.work_session_id)
        })
        .await
        .map_err(join_err)?
        .map_err(err_str)?;

        if !deleted {
            return Err(err_str(MosaicError::not_found(
                "work session",
                params.work_session_id,
            )));
        }
        to_output(&DeletedOutput { deleted })
    }

    /// Delete a meeting (attendee rows cascade; work sessions stay).
    #[tool(description = "Delete a meeting by id. Auto-generated work sessions are kept.")]
    async fn delete_meeting(
        &self,
        Parameters(params): Parameters<DeleteMeetingParams>,
    ) -> std::result::Result<String, String> {
        let db = Arc::clone(&self.db);
        let deleted = tokio::task::spawn_blocking(move || -> MosaicResult<bool> {
            let conn = lock_db(&db)?;
            store::meetings::delete_meeting(&conn, params.meeting_id)
        })
        .await
        .map_err(join_err)?
        .map_err(err_str)?;

        if !deleted {
            return Err(err_str(MosaicError::not_found(
                "meeting",
                params.meeting_id,
            )));
        }
        to_output(&DeletedOutput { deleted })
    }

    /// Add a person.
    #[tool(description = "Add a person with contact details and profile attributes.")]
    async fn add_person(
        &self,
        Parameters(params): Parameters<AddPersonParams>,
    ) -> std::result::Result<String, String> {
        let db = Arc::clone(&self.db);
        let person = tokio::task::spawn_blocking(move || -> MosaicResult<_> {
            let conn = lock_db(&db)?;
            store::people::create_person(
                &conn,
                store::people::NewPerson {
                    full_name: params.full_name,
                    email: params.email,
                    phone: params.phone,
                    linkedin_url: params.linkedin_url,
                    company: params.company,
                    title: params.title,
                    notes: params.notes,
                    additional_info: params.additional_info,
                    is_stakeholder: params.is_stakeholder.unwrap_or(false),
                    tags: params.tags.unwrap_or_default(),
                },
            )
        })
        .await
        .map_err(join_err)?
        .map_err(err_str)?;

        to_output(&person)
    }

    /// Add a client.
    #[tool(description = "Add a client (company or individual that work is done for).")]
    async fn add_client(
        &self,
        Parameters(params): Parameters<AddClientParams>,
    ) -> std::result::Result<String, String> {
        let client_type = parse_enum(&params.r#type, "type")?;
        let status = parse_opt_enum(&params.status, "status")?;

        let db = Arc::clone(&self.db);
        let client = tokio::task::spawn_blocking(move || -> MosaicResult<_> {
            let conn = lock_db(&db)?;
            store::clients::create_client(
                &conn,
                store::clients::NewClient {
                    name: params.name,
                    client_type,
                    status: status.unwrap_or(store::types::ClientStatus::Active),
                    contact_person_id: params.contact_person_id,
                    notes: params.notes,
                    tags: params.tags.unwrap_or_default(),
                },
            )
        })
        .await
        .map_err(join_err)?
        .map_err(err_str)?;

        to_output(&client)
    }

    /// Add a project.
    #[tool(description = "Add a project for a client, optionally on behalf of an employer.")]
    async fn add_project(
        &self,
        Parameters(params): Parameters<AddProjectParams>,
    ) -> std::result::Result<String, String> {
        let status = parse_opt_enum(&params.status, "status")?;
        let start_date = parse_opt_date(&params.start_date, "start_date")?;
        let end_date = parse_opt_date(&params.end_date, "end_date")?;

        let db = Arc::clone(&self.db);
        let project = tokio::task::spawn_blocking(move || -> MosaicResult<_> {
            let conn = lock_db(&db)?;
            store::projects::create_project(
                &conn,
                store::projects::NewProject {
                    name: params.name,
                    client_id: params.client_id,
                    on_behalf_of: params.on_behalf_of,
                    description: params.description,
                    status: status.unwrap_or(store::types::ProjectStatus::Active),
                    start_date,
                    end_date,
                    tags: params.tags.unwrap_or_default(),
                },
            )
        })
        .await
        .map_err(join_err)?
        .map_err(err_str)?;

        to_output(&project)
    }

    /// Add an employer.
    #[tool(description = "Add an employer (who work is done on behalf of).")]
    async fn add_employer(
        &self,
        Parameters(params): Parameters<AddEmployerParams>,
    ) -> std::result::Result<String, String> {
        let db = Arc::clone(&self.db);
        let employer = tokio::task::spawn_blocking(move || -> MosaicResult<_> {
            let conn = lock_db(&db)?;
            store::employers::create_employer(
                &conn,
                store::employers::NewEmployer {
                    name: params.name,
                    notes: params.notes,
                    tags: params.tags.unwrap_or_default(),
                },
            )
        })
        .await
        .map_err(join_err)?
        .map_err(err_str)?;

        to_output(&employer)
    }

    /// Add a note, optionally attached to another entity.
    #[tool(
        description = "Add a note, optionally attached to another entity via entity_type + entity_id."
    )]
    async fn add_note(
        &self,
        Parameters(params): Parameters<AddNoteParams>,
    ) -> std::result::Result<String, String> {
        let privacy = parse_opt_enum::<PrivacyLevel>(&params.privacy_level, "privacy_level")?;
        let entity_type = parse_opt_enum::<EntityKind>(&params.entity_type, "entity_type")?;

        let db = Arc::clone(&self.db);
        let defaults = self.defaults();
        let note = tokio::task::spawn_blocking(move || -> MosaicResult<_> {
            let conn = lock_db(&db)?;
            let profile = Self::profile_of(&conn, &defaults)?;
            store::notes::create_note(
                &conn,
                store::notes::NewNote {
                    text: params.text,
                    privacy_level: Self::default_privacy(&profile, privacy),
                    entity_type,
                    entity_id: params.entity_id,
                    tags: params.tags.unwrap_or_default(),
                },
            )
        })
        .await
        .map_err(join_err)?
        .map_err(err_str)?;

        to_output(&note)
    }

    /// Record an employment of a person at a client.
    #[tool(
        description = "Record an employment (person at client). Omit end_date for a current role; one current role per person/client pair."
    )]
    async fn add_employment(
        &self,
        Parameters(params): Parameters<AddEmploymentParams>,
    ) -> std::result::Result<String, String> {
        let start_date = parse_date(&params.start_date, "start_date")?;
        let end_date = parse_opt_date(&params.end_date, "end_date")?;

        let db = Arc::clone(&self.db);
        let employment = tokio::task::spawn_blocking(move || -> MosaicResult<_> {
            let conn = lock_db(&db)?;
            store::people::add_employment(
                &conn,
                store::people::NewEmployment {
                    person_id: params.person_id,
                    client_id: params.client_id,
                    role: params.role,
                    start_date,
                    end_date,
                },
            )
        })
        .await
        .map_err(join_err)?
        .map_err(err_str)?;

        to_output(&employment)
    }

    /// Create a reminder, optionally recurring.
    #[tool(
        description = "Create a reminder, optionally recurring (daily/weekly/monthly) and optionally linked to another entity."
    )]
    async fn add_reminder(
        &self,
        Parameters(params): Parameters<AddReminderParams>,
    ) -> std::result::Result<String, String> {
        let reminder_time = parse_dt(&params.reminder_time, "reminder_time")?;
        let related_entity_type =
            parse_opt_enum::<EntityKind>(&params.related_entity_type, "related_entity_type")?;

        let db = Arc::clone(&self.db);
        let reminder = tokio::task::spawn_blocking(move || -> MosaicResult<_> {
            let conn = lock_db(&db)?;
            store::reminders::create_reminder(
                &conn,
                store::reminders::NewReminder {
                    reminder_time,
                    message: params.message,
                    recurrence_config: params.recurrence_config,
                    related_entity_type,
                    related_entity_id: params.related_entity_id,
                    tags: params.tags.unwrap_or_default(),
                },
            )
        })
        .await
        .map_err(join_err)?
        .map_err(err_str)?;

        to_output(&reminder)
    }

    /// Update a reminder; moving its time forward re-arms dispatch.
    #[tool(
        description = "Update a reminder. Only provided fields change; moving reminder_time forward makes it fire again at the new instant."
    )]
    async fn update_reminder(
        &self,
        Parameters(params): Parameters<UpdateReminderParams>,
    ) -> std::result::Result<String, String> {
        let reminder_time = params
            .reminder_time
            .as_deref()
            .map(|s| parse_dt(s, "reminder_time"))
            .transpose()?;

        let db = Arc::clone(&self.db);
        let reminder = tokio::task::spawn_blocking(move || -> MosaicResult<_> {
            let conn = lock_db(&db)?;
            store::reminders::update_reminder(
                &conn,
                params.reminder_id,
                store::reminders::ReminderPatch {
                    reminder_time,
                    message: params.message,
                    recurrence_config: params.recurrence_config,
                    tags: params.tags,
                },
            )
        })
        .await
        .map_err(join_err)?
        .map_err(err_str)?;

        to_output(&reminder)
    }

    /// Complete a reminder; recurring ones spawn the next occurrence.
    #[tool(
        description = "Complete a reminder. Recurring reminders atomically create their next occurrence and return it."
    )]
    async fn complete_reminder(
        &self,
        Parameters(params): Parameters<CompleteReminderParams>,
    ) -> std::result::Result<String, String> {
        let db = Arc::clone(&self.db);
        let defaults = self.defaults();
        let outcome = tokio::task::spawn_blocking(move || -> MosaicResult<_> {
            let mut conn = lock_db(&db)?;
            let profile = Self::profile_of(&conn, &defaults)?;
            let tz = store::user::user_timezone(&profile);
            store::reminders::complete_reminder(&mut conn, tz, params.reminder_id)
        })
        .await
        .map_err(join_err)?
        .map_err(err_str)?;

        tracing::info!(
            reminder_id = outcome.completed.id,
            next = outcome.next_occurrence.as_ref().map(|r| r.id),
            "reminder completed"
        );
        to_output(&outcome)
    }

    /// Snooze a reminder until a later instant.
    #[tool(description = "Snooze a reminder until the given instant; its time and recurrence are unchanged.")]
    async fn snooze_reminder(
        &self,
        Parameters(params): Parameters<SnoozeReminderParams>,
    ) -> std::result::Result<String, String> {
        let until = parse_dt(&params.snoozed_until, "snoozed_until")?;

        let db = Arc::clone(&self.db);
        let reminder = tokio::task::spawn_blocking(move || -> MosaicResult<_> {
            let conn = lock_db(&db)?;
            store::reminders::snooze_reminder(&conn, params.reminder_id, until)
        })
        .await
        .map_err(join_err)?
        .map_err(err_str)?;

        to_output(&reminder)
    }

    /// Update a work session (times recompute duration and date).
    #[tool(
        description = "Update a work session. Only provided fields change; changing either time recomputes duration and date atomically."
    )]
    async fn update_work_session(
        &self,
        Parameters(params): Parameters<UpdateWorkSessionParams>,
    ) -> std::result::Result<String, String> {
        let start_time = params
            .start_time
            .as_deref()
            .map(|s| parse_dt(s, "start_time"))
            .transpose()?;
        let end_time = params
            .end_time
            .as_deref()
            .map(|s| parse_dt(s, "end_time"))
            .transpose()?;
        let privacy = parse_opt_enum::<PrivacyLevel>(&params.privacy_level, "privacy_level")?;

        let db = Arc::clone(&self.db);
        let defaults = self.defaults();
        let session = tokio::task::spawn_blocking(move || -> MosaicResult<_> {
            let conn = lock_db(&db)?;
            let profile = Self::profile_of(&conn, &defaults)?;
            store::sessions::update_session(
                &conn,
                store::user::user_timezone(&profile),
                params.work_session_id,
                store::sessions::WorkSessionPatch {
                    project_id: params.project_id,
                    start_time,
                    end_time,
                    summary: params.summary,
                    privacy_level: privacy,
                    tags: params.tags,
                },
            )
        })
        .await
        .map_err(join_err)?
        .map_err(err_str)?;

        to_output(&session)
    }

    /// Update a meeting (never touches generated work sessions).
    #[tool(
        description = "Update a meeting. Only provided fields change; previously generated work sessions are never touched."
    )]
    async fn update_meeting(
        &self,
        Parameters(params): Parameters<UpdateMeetingParams>,
    ) -> std::result::Result<String, String> {
        let start_time = params
            .start_time
            .as_deref()
            .map(|s| parse_dt(s, "start_time"))
            .transpose()?;
        let privacy = parse_opt_enum::<PrivacyLevel>(&params.privacy_level, "privacy_level")?;

        let db = Arc::clone(&self.db);
        let meeting = tokio::task::spawn_blocking(move || -> MosaicResult<_> {
            let mut conn = lock_db(&db)?;
            store::meetings::update_meeting(
                &mut conn,
                params.meeting_id,
                store::meetings::MeetingPatch {
                    title: params.title,
                    start_time,
                    duration_minutes: params.duration_minutes,
                    summary: params.summary,
                    privacy_level: privacy,
                    project_id: params.project_id,
                    meeting_type: params.meeting_type,
                    location: params.location,
                    attendee_ids: params.attendee_ids,
                    tags: params.tags,
                },
            )
        })
        .await
        .map_err(join_err)?
        .map_err(err_str)?;

        to_output(&meeting)
    }

    /// Update a person.
    #[tool(description = "Update a person. Only provided fields change.")]
    async fn update_person(
        &self,
        Parameters(params): Parameters<UpdatePersonParams>,
    ) -> std::result::Result<String, String> {
        let db = Arc::clone(&self.db);
        let person = tokio::task::spawn_blocking(move || -> MosaicResult<_> {
            let conn = lock_db(&db)?;
            store::people::update_person(
                &conn,
                params.person_id,
                store::people::PersonPatch {
                    full_name: params.full_name,
                    email: params.email,
                    phone: params.phone,
                    linkedin_url: params.linkedin_url,
                    company: params.company,
                    title: params.title,
                    notes: params.notes,
                    additional_info: params.additional_info,
                    is_stakeholder: params.is_stakeholder,
                    tags: params.tags,
                },
            )
        })
        .await
        .map_err(join_err)?
        .map_err(err_str)?;

        to_output(&person)
    }

    /// Update a client.
    #[tool(description = "Update a client. Only provided fields change.")]
    async fn update_client(
        &self,
        Parameters(params): Parameters<UpdateClientParams>,
    ) -> std::result::Result<String, String> {
        let client_type = parse_opt_enum(&params.r#type, "type")?;
        let status = parse_opt_enum(&params.status, "status")?;

        let db = Arc::clone(&self.db);
        let client = tokio::task::spawn_blocking(move || -> MosaicResult<_> {
            let conn = lock_db(&db)?;
            store::clients::update_client(
                &conn,
                params.client_id,
                store::clients::ClientPatch {
                    name: params.name,
                    client_type,
                    status,
                    contact_person_id: params.contact_person_id,
                    notes: params.notes,
                    tags: params.tags,
                },
            )
        })
        .await
        .map_err(join_err)?
        .map_err(err_str)?;

        to_output(&client)
    }

    /// Update a project.
    #[tool(description = "Update a project. Only provided fields change; completed status requires an end date.")]
    async fn update_project(
        &self,
        Parameters(params): Parameters<UpdateProjectParams>,
    ) -> std::result::Result<String, String> {
        let status = parse_opt_enum(&params.status, "status")?;
        let start_date = parse_opt_date(&params.start_date, "start_date")?;
        let end_date = parse_opt_date(&params.end_date, "end_date")?;

        let db = Arc::clone(&self.db);
        let project = tokio::task::spawn_blocking(move || -> MosaicResult<_> {
            let conn = lock_db(&db)?;
            store::projects::update_project(
                &conn,
                params.project_id,
                store::projects::ProjectPatch {
                    name: params.name,
                    client_id: params.client_id,
                    on_behalf_of: params.on_behalf_of,
                    description: params.description,
                    status,
                    start_date,
                    end_date,
                    tags: params.tags,
                },
            )
        })
        .await
        .map_err(join_err)?
        .map_err(err_str)?;

        to_output(&project)
    }

    /// Update a note.
    #[tool(description = "Update a note. Re-attachment needs entity_type and entity_id together.")]
    async fn update_note(
        &self,
        Parameters(params): Parameters<UpdateNoteParams>,
    ) -> std::result::Result<String, String> {
        let privacy = parse_opt_enum::<PrivacyLevel>(&params.privacy_level, "privacy_level")?;
        let entity_type = parse_opt_enum::<EntityKind>(&params.entity_type, "entity_type")?;

        let db = Arc::clone(&self.db);
        let note = tokio::task::spawn_blocking(move || -> MosaicResult<_> {
            let conn = lock_db(&db)?;
            store::notes::update_note(
                &conn,
                params.note_id,
                store::notes::NotePatch {
                    text: params.text,
                    privacy_level: privacy,
                    entity_type,
                    entity_id: params.entity_id,
                    tags: params.tags,
                },
            )
        })
        .await
        .map_err(join_err)?
        .map_err(err_str)?;

        to_output(&note)
    }

    /// Run a structured query.
    #[tool(
        description = "Run a structured query: filters with dotted relationship paths (e.g. project.client.name), 15 operators, time shortcuts (today, this_week, ...), aggregations with group_by, ordering and pagination."
    )]
    async fn query(
        &self,
        Parameters(params): Parameters<QueryParams>,
    ) -> std::result::Result<String, String> {
        let access = params.access_mode.unwrap_or_default();

        tracing::info!(
            entity_type = %params.structured_query.entity_type,
            filters = params.structured_query.filters.len(),
            "query called"
        );

        let db = Arc::clone(&self.db);
        let defaults = self.defaults();
        let outcome = tokio::task::spawn_blocking(move || -> MosaicResult<_> {
            let conn = lock_db(&db)?;
            let profile = Self::profile_of(&conn, &defaults)?;
            let ctx = TimeContext::from_profile(&profile);
            exec::execute(&conn, &params.structured_query, access, &ctx)
        })
        .await
        .map_err(join_err)?
        .map_err(err_str)?;

        to_output(&outcome)
    }

    /// Loose text query, a thin adapter over the structured engine.
    #[tool(
        description = "Loose text query, e.g. 'work sessions this week' or 'meetings about onboarding'. A thin phrase adapter over the structured query engine."
    )]
    async fn search(
        &self,
        Parameters(params): Parameters<SearchParams>,
    ) -> std::result::Result<String, String> {
        let structured = loose::parse(&params.text);
        tracing::info!(text = %params.text, entity_type = %structured.entity_type, "search called");

        let db = Arc::clone(&self.db);
        let defaults = self.defaults();
        let outcome = tokio::task::spawn_blocking(move || -> MosaicResult<_> {
            let conn = lock_db(&db)?;
            let profile = Self::profile_of(&conn, &defaults)?;
            let ctx = TimeContext::from_profile(&profile);
            exec::execute(&conn, &structured, AccessMode::All, &ctx)
        })
        .await
        .map_err(join_err)?
        .map_err(err_str)?;

        to_output(&outcome)
    }

    /// Build a privacy-filtered per-day timecard for a project.
    #[tool(
        description = "Build a timecard: per-day summed hours and merged summaries for one project over a date range. include_private=false renders the external view."
    )]
    async fn generate_timecard(
        &self,
        Parameters(params): Parameters<TimecardParams>,
    ) -> std::result::Result<String, String> {
        let from = parse_date(&params.start_date, "start_date")?;
        let to = parse_date(&params.end_date, "end_date")?;
        let include_private = params.include_private.unwrap_or(true);

        let db = Arc::clone(&self.db);
        let rows = tokio::task::spawn_blocking(move || -> MosaicResult<_> {
            let conn = lock_db(&db)?;
            timecard::generate_timecard(&conn, params.project_id, from, to, include_private)
        })
        .await
        .map_err(join_err)?
        .map_err(err_str)?;

        to_output(&serde_json::json!({
            "project_id": params.project_id,
            "include_private": include_private,
            "entries": rows,
        }))
    }

    /// Read the user profile (created from defaults on first access).
    #[tool(description = "Get the user profile (timezone, week boundary, default privacy).")]
    async fn get_user(
        &self,
        Parameters(_params): Parameters<GetUserParams>,
    ) -> std::result::Result<String, String> {
        let db = Arc::clone(&self.db);
        let defaults = self.defaults();
        let profile = tokio::task::spawn_blocking(move || -> MosaicResult<_> {
            let conn = lock_db(&db)?;
            Self::profile_of(&conn, &defaults)
        })
        .await
        .map_err(join_err)?
        .map_err(err_str)?;

        to_output(&profile)
    }

    /// Update the user profile.
    #[tool(description = "Update the user profile. Only provided fields change.")]
    async fn update_user(
        &self,
        Parameters(params): Parameters<UpdateUserParams>,
    ) -> std::result::Result<String, String> {
        let week_boundary = parse_opt_enum(&params.week_boundary, "week_boundary")?;
        let default_privacy_level =
            parse_opt_enum(&params.default_privacy_level, "default_privacy_level")?;

        let db = Arc::clone(&self.db);
        let defaults = self.defaults();
        let profile = tokio::task::spawn_blocking(move || -> MosaicResult<_> {
            let conn = lock_db(&db)?;
            store::user::update_user(
                &conn,
                &defaults,
                store::user::UserPatch {
                    name: params.name,
                    email: params.email,
                    timezone: params.timezone,
                    week_boundary,
                    default_privacy_level,
                },
            )
        })
        .await
        .map_err(join_err)?
        .map_err(err_str)?;

        to_output(&profile)
    }

    /// Send a notification through the bridge.
    #[tool(
        description = "Send a desktop notification through the bridge. Retries transient failures with backoff; returns delivered flag and attempt count."
    )]
    async fn trigger_notification(
        &self,
        Parameters(params): Parameters<TriggerNotificationParams>,
    ) -> std::result::Result<String, String> {
        let receipt = self
            .dispatcher
            .notify(
                &params.title,
                &params.message,
                params.sound.as_deref(),
                params.metadata.as_ref(),
            )
            .await
            .map_err(err_str)?;

        to_output(&receipt)
    }
}

#[tool_handler]
impl ServerHandler for MosaicTools {
    fn get_info(&self) -> rmcp::model::ServerInfo {
        rmcp::model::ServerInfo {
            instructions: Some(
                "Mosaic is a personal work-memory and time-tracking server. Log work with \
                 log_work_session and log_meeting, manage people/clients/projects with the add_* \
                 and update_* tools, query history with query (structured) or search (loose), \
                 build timecards with generate_timecard, and manage reminders with add_reminder, \
                 complete_reminder, and snooze_reminder."
                    .into(),
            ),
            capabilities: rmcp::model::ServerCapabilities::builder()
                .enable_tools()
                .build(),
            ..Default::default()
        }
    }
}
