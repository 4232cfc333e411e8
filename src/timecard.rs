//! Privacy-filtered timecard aggregation.
//!
//! Sums rounded session hours per day for one project over an inclusive date
//! range. Sums use decimal addition over the already-rounded per-session
//! durations; nothing is re-rounded here.

use chrono::NaiveDate;
use rusqlite::Connection;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::error::{MosaicError, Result};
use crate::query::privacy::AccessMode;
use crate::store::types::{PrivacyLevel, WorkSession};
use crate::store::{exists, fmt_date, sessions};

/// Placeholder summary for internal sessions in external-facing timecards.
const GENERIC_SUMMARY: &str = "Project work";

/// One aggregated day on the timecard.
#[derive(Debug, Clone, Serialize)]
pub struct TimecardRow {
    pub date: NaiveDate,
    pub hours: Decimal,
    pub summary: String,
}

/// Build a timecard for one project over an inclusive date range.
///
/// Privacy rules: public sessions appear verbatim; internal sessions always
/// count toward the sums but their summaries are replaced with a generic
/// placeholder when `include_private` is false; private sessions are dropped
/// entirely unless `include_private` is true.
pub fn generate_timecard(
    conn: &Connection,
    project_id: i64,
    from: NaiveDate,
    to: NaiveDate,
    include_private: bool,
) -> Result<Vec<TimecardRow>> {
    if to < from {
        return Err(MosaicError::invalid(
            "end of date range must not precede its start",
        ));
    }
    if !exists(conn, "projects", project_id)? {
        return Err(MosaicError::not_found("project", project_id));
    }

    let access = if include_private {
        AccessMode::All
    } else {
        AccessMode::InternalAndPublic
    };
    let privacy_clause = access
        .sql_condition("privacy_level")
        .map(|cond| format!(" AND {cond}"))
        .unwrap_or_default();

    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM work_sessions \
         WHERE project_id = ?1 AND date >= ?2 AND date <= ?3{privacy_clause} \
         ORDER BY date, start_time",
        sessions::COLUMNS
    ))?;
    let rows: Vec<WorkSession> = stmt
        .query_map(
            rusqlite::params![project_id, fmt_date(from), fmt_date(to)],
            sessions::from_row,
        )?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    let mut timecard: Vec<TimecardRow> = Vec::new();
    for session in rows {
        let summary = match session.privacy_level {
            PrivacyLevel::Internal if !include_private => Some(GENERIC_SUMMARY.to_string()),
            _ => session.summary.clone().filter(|s| !s.trim().is_empty()),
        };

        match timecard.last_mut() {
            Some(row) if row.date == session.date => {
                row.hours += session.duration_hours;
                if let Some(summary) = summary {
                    if !row.summary.split('\n').any(|s| s == summary) {
                        if !row.summary.is_empty() {
                            row.summary.push('\n');
                        }
                        row.summary.push_str(&summary);
                    }
                }
            }
            _ => timecard.push(TimecardRow {
                date: session.date,
                hours: session.duration_hours,
                summary: summary.unwrap_or_default(),
            }),
        }
    }

    Ok(timecard)
}
