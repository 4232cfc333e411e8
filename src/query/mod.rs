//! The structured query DSL — AST, validation, and execution.
//!
//! The AST ([`Query`]) is the contract between the tool façade and the
//! executor: a base entity, AND-joined filter clauses with dotted
//! relationship paths, an optional aggregation, ordering, and pagination.
//! [`validate`] checks the whole tree against the relationship graph before
//! anything touches SQL; [`exec::execute`] compiles and runs it.

pub mod exec;
pub mod graph;
pub mod loose;
pub mod privacy;

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::{MosaicError, Result};
use crate::store::types::{EntityKind, UserProfile, WeekBoundary};
use graph::{resolve_path, FieldType, ResolvedPath};

pub const DEFAULT_LIMIT: u32 = 100;
pub const MAX_LIMIT: u32 = 1000;

fn default_limit() -> u32 {
    DEFAULT_LIMIT
}

/// A structured query over one entity type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct Query {
    /// Base entity to query.
    pub entity_type: EntityKind,
    /// AND-joined filter clauses.
    #[serde(default)]
    pub filters: Vec<FilterClause>,
    /// Optional aggregation; without `group_by` the result is a scalar.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggregation: Option<Aggregation>,
    /// Maximum rows returned (entity queries). Capped at 1000.
    #[serde(default = "default_limit")]
    pub limit: u32,
    /// Rows skipped before the limit applies.
    #[serde(default)]
    pub offset: u32,
    /// Explicit ordering; defaults to `created_at` descending.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_by: Option<Vec<OrderBy>>,
}

/// One filter over a (possibly dotted) field path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct FilterClause {
    /// Field path, e.g. `"date"` or `"project.client.name"`.
    pub field: String,
    pub operator: FilterOp,
    /// Literal, list, time shortcut token, or null (for the null tests).
    #[serde(default)]
    pub value: serde_json::Value,
}

/// The fifteen filter operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum FilterOp {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    In,
    NotIn,
    Contains,
    StartsWith,
    EndsWith,
    IsNull,
    IsNotNull,
    HasTag,
    HasAnyTag,
}

/// The six aggregation functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum AggFunction {
    Count,
    Sum,
    Avg,
    Min,
    Max,
    CountDistinct,
}

impl AggFunction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Count => "count",
            Self::Sum => "sum",
            Self::Avg => "avg",
            Self::Min => "min",
            Self::Max => "max",
            Self::CountDistinct => "count_distinct",
        }
    }
}

/// Aggregation over the filtered relation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct Aggregation {
    pub function: AggFunction,
    /// Aggregated field path; only `count` may omit it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    /// Grouping paths; empty or absent yields a single scalar.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_by: Option<Vec<String>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct OrderBy {
    pub field: String,
    #[serde(default)]
    pub direction: SortDirection,
}

/// Time shortcut tokens legal wherever a date or datetime literal is.
pub const TIME_SHORTCUTS: [&str; 5] = ["today", "this_week", "this_month", "this_year", "now"];

/// Clock, timezone, and week boundary used to resolve time shortcuts.
#[derive(Debug, Clone)]
pub struct TimeContext {
    pub now: DateTime<Utc>,
    pub tz: Tz,
    pub week_boundary: WeekBoundary,
}

impl TimeContext {
    pub fn from_profile(profile: &UserProfile) -> Self {
        Self {
            now: Utc::now(),
            tz: crate::store::user::user_timezone(profile),
            week_boundary: profile.week_boundary,
        }
    }

    pub fn local_today(&self) -> NaiveDate {
        self.now.with_timezone(&self.tz).date_naive()
    }

    pub fn start_of_week(&self) -> NaiveDate {
        let today = self.local_today();
        let days_back = match self.week_boundary {
            WeekBoundary::Monday => today.weekday().num_days_from_monday(),
            WeekBoundary::Sunday => today.weekday().num_days_from_sunday(),
        };
        today - Duration::days(days_back as i64)
    }

    pub fn start_of_month(&self) -> NaiveDate {
        let today = self.local_today();
        today.with_day(1).unwrap_or(today)
    }

    pub fn start_of_year(&self) -> NaiveDate {
        let today = self.local_today();
        NaiveDate::from_ymd_opt(today.year(), 1, 1).unwrap_or(today)
    }

    /// Resolve a shortcut token to a storage-comparable SQL value for the
    /// given leaf type, or `None` when the token is not a shortcut.
    pub fn resolve_shortcut(
        &self,
        token: &str,
        ty: FieldType,
    ) -> Result<Option<rusqlite::types::Value>> {
        let date = match token {
            "today" => self.local_today(),
            "this_week" => self.start_of_week(),
            "this_month" => self.start_of_month(),
            "this_year" => self.start_of_year(),
            "now" => {
                return match ty {
                    FieldType::Date => Ok(Some(rusqlite::types::Value::Text(
                        crate::store::fmt_date(self.local_today()),
                    ))),
                    FieldType::DateTime => Ok(Some(rusqlite::types::Value::Text(
                        crate::store::fmt_dt(self.now),
                    ))),
                    _ => Err(MosaicError::invalid(
                        "time shortcuts apply only to date and datetime fields",
                    )),
                };
            }
            _ => return Ok(None),
        };

        match ty {
            FieldType::Date => Ok(Some(rusqlite::types::Value::Text(crate::store::fmt_date(
                date,
            )))),
            FieldType::DateTime => {
                let midnight = self.local_midnight_utc(date)?;
                Ok(Some(rusqlite::types::Value::Text(crate::store::fmt_dt(
                    midnight,
                ))))
            }
            _ => Err(MosaicError::invalid(
                "time shortcuts apply only to date and datetime fields",
            )),
        }
    }

    /// 00:00 local on the given date, as a UTC instant.
    fn local_midnight_utc(&self, date: NaiveDate) -> Result<DateTime<Utc>> {
        let naive: NaiveDateTime = date
            .and_hms_opt(0, 0, 0)
            .ok_or_else(|| MosaicError::Internal(anyhow::anyhow!("invalid midnight")))?;
        self.tz
            .from_local_datetime(&naive)
            .earliest()
            .or_else(|| {
                self.tz
                    .from_local_datetime(&(naive + Duration::hours(1)))
                    .earliest()
            })
            .map(|dt| dt.with_timezone(&Utc))
            .ok_or_else(|| {
                MosaicError::Internal(anyhow::anyhow!("cannot localize midnight of {date}"))
            })
    }
}

/// Validate a query against the relationship graph and operator rules.
/// Returns the resolved filter paths so the executor can reuse them.
pub fn validate(query: &Query) -> Result<Vec<ResolvedPath>> {
    if query.limit > MAX_LIMIT {
        return Err(MosaicError::invalid(format!(
            "limit must not exceed {MAX_LIMIT}"
        )));
    }

    let mut resolved = Vec::with_capacity(query.filters.len());
    for clause in &query.filters {
        let path = resolve_path(query.entity_type, &clause.field)?;
        check_operator(clause, &path)?;
        resolved.push(path);
    }

    if let Some(agg) = &query.aggregation {
        validate_aggregation(query.entity_type, agg)?;
    }

    if let Some(order_by) = &query.order_by {
        for entry in order_by {
            let path = resolve_path(query.entity_type, &entry.field)?;
            if !path.leaf.ty.scalar() {
                return Err(MosaicError::invalid(format!(
                    "cannot order by {:?}",
                    entry.field
                )));
            }
            if query.aggregation.is_none() && path.has_many() {
                return Err(MosaicError::invalid(format!(
                    "cannot order entity results by collection path {:?}",
                    entry.field
                )));
            }
        }
    }

    Ok(resolved)
}

fn check_operator(clause: &FilterClause, path: &ResolvedPath) -> Result<()> {
    use serde_json::Value;

    let ty = path.leaf.ty;
    let field = &clause.field;
    let value = &clause.value;

    let scalar_value = |v: &Value| matches!(v, Value::String(_) | Value::Number(_) | Value::Bool(_));

    match clause.operator {
        FilterOp::Eq | FilterOp::Ne => {
            if !ty.scalar() {
                return Err(invalid_op(clause, field, "a scalar field"));
            }
            if !scalar_value(value) {
                return Err(MosaicError::invalid(format!(
                    "invalid value for eq/ne on {field:?}: expected a scalar literal"
                )));
            }
        }
        FilterOp::Gt | FilterOp::Gte | FilterOp::Lt | FilterOp::Lte => {
            if !ty.orderable() {
                return Err(invalid_op(clause, field, "an orderable field"));
            }
            if !scalar_value(value) {
                return Err(MosaicError::invalid(format!(
                    "invalid value for comparison on {field:?}: expected a scalar literal"
                )));
            }
        }
        FilterOp::In | FilterOp::NotIn => {
            if !ty.scalar() {
                return Err(invalid_op(clause, field, "a scalar field"));
            }
            match value {
                Value::Array(items) if items.iter().all(scalar_value) => {}
                _ => {
                    return Err(MosaicError::invalid(format!(
                        "invalid value for in/not_in on {field:?}: expected a list of scalars"
                    )))
                }
            }
        }
        FilterOp::Contains | FilterOp::StartsWith | FilterOp::EndsWith => {
            if ty != FieldType::Text {
                return Err(invalid_op(clause, field, "a string field"));
            }
            if !matches!(value, Value::String(_)) {
                return Err(MosaicError::invalid(format!(
                    "invalid value for string match on {field:?}: expected a string"
                )));
            }
        }
        FilterOp::IsNull | FilterOp::IsNotNull => {
            if !value.is_null() {
                return Err(MosaicError::invalid(format!(
                    "invalid value for null test on {field:?}: value must be null"
                )));
            }
        }
        FilterOp::HasTag => {
            if ty != FieldType::Tags {
                return Err(invalid_op(clause, field, "a tag set"));
            }
            if !matches!(value, Value::String(_)) {
                return Err(MosaicError::invalid(format!(
                    "invalid value for has_tag on {field:?}: expected a string"
                )));
            }
        }
        FilterOp::HasAnyTag => {
            if ty != FieldType::Tags {
                return Err(invalid_op(clause, field, "a tag set"));
            }
            match value {
                Value::Array(items) if items.iter().all(|v| matches!(v, Value::String(_))) => {}
                _ => {
                    return Err(MosaicError::invalid(format!(
                        "invalid value for has_any_tag on {field:?}: expected a list of strings"
                    )))
                }
            }
        }
    }
    Ok(())
}

fn invalid_op(clause: &FilterClause, field: &str, expected: &str) -> MosaicError {
    MosaicError::invalid(format!(
        "invalid operator {:?} for {field:?}: requires {expected}",
        serde_json::to_string(&clause.operator).unwrap_or_default()
    ))
}

fn validate_aggregation(kind: EntityKind, agg: &Aggregation) -> Result<()> {
    match (&agg.function, &agg.field) {
        (AggFunction::Count, None) => {}
        (function, None) => {
            return Err(MosaicError::invalid(format!(
                "invalid aggregation: {} requires a field",
                function.as_str()
            )));
        }
        (function, Some(field)) => {
            let path = resolve_path(kind, field)?;
            match function {
                AggFunction::Sum | AggFunction::Avg => {
                    if !matches!(path.leaf.ty, FieldType::Integer | FieldType::Decimal) {
                        return Err(MosaicError::invalid(format!(
                            "invalid aggregation: {} requires a numeric field, {field:?} is not",
                            function.as_str()
                        )));
                    }
                }
                AggFunction::Count | AggFunction::Min | AggFunction::Max
                | AggFunction::CountDistinct => {
                    if !path.leaf.ty.scalar() {
                        return Err(MosaicError::invalid(format!(
                            "invalid aggregation: cannot apply {} to {field:?}",
                            function.as_str()
                        )));
                    }
                }
            }
        }
    }

    if let Some(group_by) = &agg.group_by {
        for field in group_by {
            let path = resolve_path(kind, field)?;
            if !path.leaf.ty.scalar() {
                return Err(MosaicError::invalid(format!(
                    "invalid aggregation: cannot group by {field:?}"
                )));
            }
        }
    }

    Ok(())
}
