//! Compiles a validated [`Query`] into SQL and runs it.
//!
//! Single-valued path steps become LEFT JOINs, one per distinct path prefix,
//! shared across clauses. Collection-valued steps in filters compile to
//! correlated EXISTS subqueries so entity results never multiply; in
//! group_by/aggregation positions they become INNER JOINs. Raw storage
//! column names never leak: outputs are the typed entity DTOs.

use std::collections::BTreeMap;

use rusqlite::types::Value as SqlValue;
use rusqlite::Connection;
use serde::Serialize;
use serde_json::Value as Json;

use super::graph::{base_table, resolve_path, Cardinality, FieldType, ResolvedPath, TableMeta};
use super::privacy::AccessMode;
use super::{
    validate, AggFunction, Aggregation, FilterClause, FilterOp, Query, SortDirection, TimeContext,
};
use crate::error::{MosaicError, Result};
use crate::store::types::EntityKind;
use crate::store::{clients, employers, meetings, notes, people, projects, reminders, sessions};

/// Entity-query result: full DTO rows plus the pre-pagination count.
#[derive(Debug, Serialize)]
pub struct EntityResult {
    pub entity_type: EntityKind,
    pub results: Vec<Json>,
    pub total_count: i64,
}

#[derive(Debug, Serialize)]
pub struct ScalarAggregation {
    pub function: AggFunction,
    pub field: Option<String>,
    pub result: Json,
}

#[derive(Debug, Serialize)]
pub struct ScalarResult {
    pub entity_type: EntityKind,
    pub aggregation: ScalarAggregation,
}

#[derive(Debug, Serialize)]
pub struct GroupEntry {
    pub group_values: Vec<Json>,
    pub result: Json,
}

#[derive(Debug, Serialize)]
pub struct GroupedAggregation {
    pub function: AggFunction,
    pub field: Option<String>,
    pub groups: Vec<GroupEntry>,
}

#[derive(Debug, Serialize)]
pub struct GroupedResult {
    pub entity_type: EntityKind,
    pub aggregation: GroupedAggregation,
    pub total_groups: usize,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum QueryOutcome {
    Entities(Box<EntityResult>),
    Scalar(ScalarResult),
    Grouped(GroupedResult),
}

/// Validate and run a structured query.
pub fn execute(
    conn: &Connection,
    query: &Query,
    access: AccessMode,
    ctx: &TimeContext,
) -> Result<QueryOutcome> {
    let resolved_filters = validate(query)?;

    match &query.aggregation {
        Some(aggregation) => run_aggregation(conn, query, aggregation, &resolved_filters, access, ctx),
        None => run_entity(conn, query, &resolved_filters, access, ctx)
            .map(|r| QueryOutcome::Entities(Box::new(r))),
    }
}

struct Compiler<'a> {
    base: &'static TableMeta,
    ctx: &'a TimeContext,
    /// `true` when collection edges may be joined inline (aggregations).
    inline_many: bool,
    joins: Vec<String>,
    aliases: BTreeMap<String, String>,
    wheres: Vec<String>,
    params: Vec<SqlValue>,
}

impl<'a> Compiler<'a> {
    fn new(kind: EntityKind, ctx: &'a TimeContext, inline_many: bool) -> Self {
        Self {
            base: base_table(kind),
            ctx,
            inline_many,
            joins: Vec::new(),
            aliases: BTreeMap::new(),
            wheres: Vec::new(),
            params: Vec::new(),
        }
    }

    fn push_param(&mut self, value: SqlValue) -> String {
        self.params.push(value);
        format!("?{}", self.params.len())
    }

    /// Join every step of the path into the main query, reusing aliases for
    /// shared prefixes. Returns the alias holding the leaf column.
    fn ensure_joined(&mut self, path: &ResolvedPath) -> Result<String> {
        let mut parent = "b".to_string();
        for (i, step) in path.steps.iter().enumerate() {
            let key = path.prefix_key(i + 1);
            if let Some(alias) = self.aliases.get(&key) {
                parent = alias.clone();
                continue;
            }
            let alias = format!("j_{}", key.replace('.', "_"));
            let clause = match step.edge.cardinality {
                Cardinality::One => format!(
                    "LEFT JOIN {} {alias} ON {alias}.id = {parent}.{}",
                    step.to.table, step.edge.column
                ),
                Cardinality::Many => {
                    if !self.inline_many {
                        return Err(MosaicError::invalid(format!(
                            "collection path {:?} is not allowed here",
                            path.raw
                        )));
                    }
                    format!(
                        "INNER JOIN {} {alias} ON {alias}.{} = {parent}.id",
                        step.to.table, step.edge.column
                    )
                }
            };
            self.joins.push(clause);
            self.aliases.insert(key, alias.clone());
            parent = alias;
        }
        Ok(parent)
    }

    /// Fully-qualified column expression for a path, joining as needed.
    fn column_expr(&mut self, path: &ResolvedPath) -> Result<String> {
        let alias = self.ensure_joined(path)?;
        Ok(format!("{alias}.{}", path.leaf.column))
    }

    fn add_filter(&mut self, clause: &FilterClause, path: &ResolvedPath) -> Result<()> {
        let condition = if path.has_many() {
            self.exists_condition(clause, path)?
        } else {
            let col = self.column_expr(path)?;
            self.predicate(&col, clause, path.leaf.ty)?
        };
        self.wheres.push(condition);
        Ok(())
    }

    /// Correlated EXISTS for a path that crosses a collection edge. All
    /// steps live inside the subquery, linked back to the base row.
    fn exists_condition(&mut self, clause: &FilterClause, path: &ResolvedPath) -> Result<String> {
        let mut from = String::new();
        let mut link = String::new();
        let mut prev = String::new();

        for (i, step) in path.steps.iter().enumerate() {
            let alias = format!("s{}", i + 1);
            if i == 0 {
                from = format!("{} {alias}", step.to.table);
                link = match step.edge.cardinality {
                    Cardinality::One => format!("{alias}.id = b.{}", step.edge.column),
                    Cardinality::Many => format!("{alias}.{} = b.id", step.edge.column),
                };
            } else {
                let on = match step.edge.cardinality {
                    Cardinality::One => format!("{alias}.id = {prev}.{}", step.edge.column),
                    Cardinality::Many => format!("{alias}.{} = {prev}.id", step.edge.column),
                };
                from.push_str(&format!(" JOIN {} {alias} ON {on}", step.to.table));
            }
            prev = alias;
        }

        let leaf_col = format!("{prev}.{}", path.leaf.column);
        let predicate = self.predicate(&leaf_col, clause, path.leaf.ty)?;
        Ok(format!(
            "EXISTS (SELECT 1 FROM {from} WHERE {link} AND {predicate})"
        ))
    }

    fn predicate(&mut self, col: &str, clause: &FilterClause, ty: FieldType) -> Result<String> {
        let value = &clause.value;
        match clause.operator {
            FilterOp::Eq | FilterOp::Ne | FilterOp::Gt | FilterOp::Gte | FilterOp::Lt
            | FilterOp::Lte => {
                let op = match clause.operator {
                    FilterOp::Eq => "=",
                    FilterOp::Ne => "!=",
                    FilterOp::Gt => ">",
                    FilterOp::Gte => ">=",
                    FilterOp::Lt => "<",
                    _ => "<=",
                };
                let expr = comparable_expr(col, ty);
                let param = self.bind_value(value, ty, &clause.field)?;
                let ph = self.push_param(param);
                Ok(format!("{expr} {op} {ph}"))
            }
            FilterOp::In | FilterOp::NotIn => {
                let items = value
                    .as_array()
                    .ok_or_else(|| MosaicError::invalid("in/not_in requires a list value"))?;
                if items.is_empty() {
                    // Membership in the empty set is vacuously false.
                    return Ok(if clause.operator == FilterOp::In {
                        "0 = 1".into()
                    } else {
                        "1 = 1".into()
                    });
                }
                let expr = comparable_expr(col, ty);
                let placeholders = items
                    .iter()
                    .map(|item| {
                        let param = self.bind_value(item, ty, &clause.field)?;
                        Ok(self.push_param(param))
                    })
                    .collect::<Result<Vec<_>>>()?
                    .join(", ");
                let op = if clause.operator == FilterOp::In {
                    "IN"
                } else {
                    "NOT IN"
                };
                Ok(format!("{expr} {op} ({placeholders})"))
            }
            FilterOp::Contains | FilterOp::StartsWith | FilterOp::EndsWith => {
                let needle = value
                    .as_str()
                    .ok_or_else(|| MosaicError::invalid("string match requires a string value"))?;
                let ph = self.push_param(SqlValue::Text(needle.to_string()));
                Ok(match clause.operator {
                    FilterOp::Contains => {
                        format!("LOWER({col}) LIKE '%' || LOWER({ph}) || '%'")
                    }
                    FilterOp::StartsWith => format!("LOWER({col}) LIKE LOWER({ph}) || '%'"),
                    _ => format!("LOWER({col}) LIKE '%' || LOWER({ph})"),
                })
            }
            FilterOp::IsNull => Ok(format!("{col} IS NULL")),
            FilterOp::IsNotNull => Ok(format!("{col} IS NOT NULL")),
            FilterOp::HasTag => {
                let tag = value
                    .as_str()
                    .ok_or_else(|| MosaicError::invalid("has_tag requires a string value"))?;
                let ph = self.push_param(SqlValue::Text(tag.to_string()));
                Ok(format!(
                    "EXISTS (SELECT 1 FROM json_each({col}) WHERE json_each.value = {ph})"
                ))
            }
            FilterOp::HasAnyTag => {
                let items = value
                    .as_array()
                    .ok_or_else(|| MosaicError::invalid("has_any_tag requires a list value"))?;
                if items.is_empty() {
                    return Ok("0 = 1".into());
                }
                let placeholders = items
                    .iter()
                    .map(|item| {
                        let tag = item.as_str().ok_or_else(|| {
                            MosaicError::invalid("has_any_tag requires string tags")
                        })?;
                        Ok(self.push_param(SqlValue::Text(tag.to_string())))
                    })
                    .collect::<Result<Vec<_>>>()?
                    .join(", ");
                Ok(format!(
                    "EXISTS (SELECT 1 FROM json_each({col}) WHERE json_each.value IN ({placeholders}))"
                ))
            }
        }
    }

    /// Convert a JSON literal (or time shortcut) into a bound SQL value for
    /// the leaf type.
    fn bind_value(&self, value: &Json, ty: FieldType, field: &str) -> Result<SqlValue> {
        let type_err = |expected: &str| {
            MosaicError::invalid(format!("invalid value for {field:?}: expected {expected}"))
        };

        match ty {
            FieldType::Integer => value
                .as_i64()
                .map(SqlValue::Integer)
                .ok_or_else(|| type_err("an integer")),
            FieldType::Decimal => {
                if let Some(n) = value.as_f64() {
                    Ok(SqlValue::Real(n))
                } else if let Some(s) = value.as_str() {
                    s.parse::<f64>()
                        .map(SqlValue::Real)
                        .map_err(|_| type_err("a number"))
                } else {
                    Err(type_err("a number"))
                }
            }
            FieldType::Bool => value
                .as_bool()
                .map(|b| SqlValue::Integer(b as i64))
                .ok_or_else(|| type_err("a boolean")),
            FieldType::Text | FieldType::Enum => value
                .as_str()
                .map(|s| SqlValue::Text(s.to_string()))
                .ok_or_else(|| type_err("a string")),
            FieldType::Date => {
                let s = value.as_str().ok_or_else(|| type_err("a date string"))?;
                if let Some(resolved) = self.ctx.resolve_shortcut(s, ty)? {
                    return Ok(resolved);
                }
                chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d")
                    .map(|d| SqlValue::Text(crate::store::fmt_date(d)))
                    .map_err(|_| type_err("a YYYY-MM-DD date or time shortcut"))
            }
            FieldType::DateTime => {
                let s = value
                    .as_str()
                    .ok_or_else(|| type_err("a datetime string"))?;
                if let Some(resolved) = self.ctx.resolve_shortcut(s, ty)? {
                    return Ok(resolved);
                }
                chrono::DateTime::parse_from_rfc3339(s)
                    .map(|dt| SqlValue::Text(crate::store::fmt_dt(dt.with_timezone(&chrono::Utc))))
                    .map_err(|_| {
                        type_err("an RFC 3339 datetime with explicit offset, or a time shortcut")
                    })
            }
            FieldType::Tags | FieldType::Json => Err(type_err("a filterable scalar")),
        }
    }

    fn add_privacy(&mut self, access: AccessMode) {
        if self.base.privacy {
            if let Some(cond) = access.sql_condition("b.privacy_level") {
                self.wheres.push(cond);
            }
        }
    }

    fn where_sql(&self) -> String {
        if self.wheres.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.wheres.join(" AND "))
        }
    }

    fn join_sql(&self) -> String {
        if self.joins.is_empty() {
            String::new()
        } else {
            format!(" {}", self.joins.join(" "))
        }
    }
}

/// Decimal columns are stored as text; comparisons and aggregates go through
/// a numeric cast.
fn comparable_expr(col: &str, ty: FieldType) -> String {
    match ty {
        FieldType::Decimal => format!("CAST({col} AS REAL)"),
        _ => col.to_string(),
    }
}

fn run_entity(
    conn: &Connection,
    query: &Query,
    resolved_filters: &[ResolvedPath],
    access: AccessMode,
    ctx: &TimeContext,
) -> Result<EntityResult> {
    let kind = query.entity_type;
    let mut compiler = Compiler::new(kind, ctx, false);

    for (clause, path) in query.filters.iter().zip(resolved_filters) {
        compiler.add_filter(clause, path)?;
    }
    compiler.add_privacy(access);

    // Resolve ordering before rendering so its joins are shared.
    let order_sql = match &query.order_by {
        Some(entries) if !entries.is_empty() => {
            let mut parts = Vec::with_capacity(entries.len());
            for entry in entries {
                let path = resolve_path(kind, &entry.field)?;
                let col = compiler.column_expr(&path)?;
                let dir = match entry.direction {
                    SortDirection::Asc => "ASC",
                    SortDirection::Desc => "DESC",
                };
                parts.push(format!("{} {dir}", comparable_expr(&col, path.leaf.ty)));
            }
            format!(" ORDER BY {}", parts.join(", "))
        }
        _ => " ORDER BY b.created_at DESC, b.id DESC".to_string(),
    };

    let table = compiler.base.table;
    let joins = compiler.join_sql();
    let wheres = compiler.where_sql();

    let count_sql = format!("SELECT COUNT(*) FROM {table} b{joins}{wheres}");
    let total_count: i64 = conn.query_row(
        &count_sql,
        rusqlite::params_from_iter(compiler.params.iter()),
        |row| row.get(0),
    )?;

    let select_sql = format!(
        "SELECT {} FROM {table} b{joins}{wheres}{order_sql} LIMIT {} OFFSET {}",
        prefixed_columns(kind),
        query.limit,
        query.offset
    );
    let results = fetch_entities(conn, kind, &select_sql, &compiler.params)?;

    Ok(EntityResult {
        entity_type: kind,
        results,
        total_count,
    })
}

fn prefixed_columns(kind: EntityKind) -> String {
    columns_for(kind)
        .split(", ")
        .map(|c| format!("b.{c}"))
        .collect::<Vec<_>>()
        .join(", ")
}

fn columns_for(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::WorkSession => sessions::COLUMNS,
        EntityKind::Meeting => meetings::COLUMNS,
        EntityKind::Project => projects::COLUMNS,
        EntityKind::Client => clients::COLUMNS,
        EntityKind::Person => people::COLUMNS,
        EntityKind::Employer => employers::COLUMNS,
        EntityKind::Note => notes::COLUMNS,
        EntityKind::Reminder => reminders::COLUMNS,
    }
}

fn fetch_entities(
    conn: &Connection,
    kind: EntityKind,
    sql: &str,
    params: &[SqlValue],
) -> Result<Vec<Json>> {
    let mut stmt = conn.prepare(sql)?;
    let params = rusqlite::params_from_iter(params.iter());

    fn collect<T, F>(
        stmt: &mut rusqlite::Statement<'_>,
        params: impl rusqlite::Params,
        mapper: F,
    ) -> Result<Vec<T>>
    where
        F: Fn(&rusqlite::Row<'_>) -> rusqlite::Result<T>,
    {
        Ok(stmt
            .query_map(params, mapper)?
            .collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn to_json<T: Serialize>(items: Vec<T>) -> Result<Vec<Json>> {
        items
            .into_iter()
            .map(|item| {
                serde_json::to_value(item)
                    .map_err(|e| MosaicError::Internal(anyhow::anyhow!("DTO serialization: {e}")))
            })
            .collect()
    }

    match kind {
        EntityKind::WorkSession => to_json(collect(&mut stmt, params, sessions::from_row)?),
        EntityKind::Meeting => {
            let mut rows = collect(&mut stmt, params, meetings::from_row)?;
            meetings::attach_attendees(conn, &mut rows)?;
            to_json(rows)
        }
        EntityKind::Project => to_json(collect(&mut stmt, params, projects::from_row)?),
        EntityKind::Client => to_json(collect(&mut stmt, params, clients::from_row)?),
        EntityKind::Person => to_json(collect(&mut stmt, params, people::from_row)?),
        EntityKind::Employer => to_json(collect(&mut stmt, params, employers::from_row)?),
        EntityKind::Note => to_json(collect(&mut stmt, params, notes::from_row)?),
        EntityKind::Reminder => to_json(collect(&mut stmt, params, reminders::from_row)?),
    }
}

fn run_aggregation(
    conn: &Connection,
    query: &Query,
    aggregation: &Aggregation,
    resolved_filters: &[ResolvedPath],
    access: AccessMode,
    ctx: &TimeContext,
) -> Result<QueryOutcome> {
    let kind = query.entity_type;
    let mut compiler = Compiler::new(kind, ctx, true);

    // Group columns join first so filters on the same paths share aliases.
    let group_by: &[String] = aggregation.group_by.as_deref().unwrap_or(&[]);
    let mut group_cols = Vec::with_capacity(group_by.len());
    let mut group_types = Vec::with_capacity(group_by.len());
    for field in group_by {
        let path = resolve_path(kind, field)?;
        let col = compiler.column_expr(&path)?;
        group_types.push(path.leaf.ty);
        group_cols.push(col);
    }

    let agg_expr = match &aggregation.field {
        None => "COUNT(*)".to_string(),
        Some(field) => {
            let path = resolve_path(kind, field)?;
            let col = compiler.column_expr(&path)?;
            let numeric = comparable_expr(&col, path.leaf.ty);
            match aggregation.function {
                AggFunction::Count => format!("COUNT({col})"),
                AggFunction::Sum => format!("COALESCE(SUM({numeric}), 0)"),
                AggFunction::Avg => format!("AVG({numeric})"),
                AggFunction::Min => format!("MIN({numeric})"),
                AggFunction::Max => format!("MAX({numeric})"),
                AggFunction::CountDistinct => format!("COUNT(DISTINCT {col})"),
            }
        }
    };

    for (clause, path) in query.filters.iter().zip(resolved_filters) {
        compiler.add_filter(clause, path)?;
    }
    compiler.add_privacy(access);

    let table = compiler.base.table;
    let joins = compiler.join_sql();
    let wheres = compiler.where_sql();

    if group_cols.is_empty() {
        let sql = format!("SELECT {agg_expr} FROM {table} b{joins}{wheres}");
        let result: SqlValue = conn.query_row(
            &sql,
            rusqlite::params_from_iter(compiler.params.iter()),
            |row| row.get(0),
        )?;

        return Ok(QueryOutcome::Scalar(ScalarResult {
            entity_type: kind,
            aggregation: ScalarAggregation {
                function: aggregation.function,
                field: aggregation.field.clone(),
                result: sql_to_json(result, None),
            },
        }));
    }

    // Grouped: default order is the group tuple ascending; an explicit
    // order_by may reorder over the grouping fields.
    let order_sql = match &query.order_by {
        Some(entries) if !entries.is_empty() => {
            let mut parts = Vec::with_capacity(entries.len());
            for entry in entries {
                let idx = group_by
                    .iter()
                    .position(|g| g == &entry.field)
                    .ok_or_else(|| {
                        MosaicError::invalid(format!(
                            "order_by field {:?} must be one of the group_by paths",
                            entry.field
                        ))
                    })?;
                let dir = match entry.direction {
                    SortDirection::Asc => "ASC",
                    SortDirection::Desc => "DESC",
                };
                parts.push(format!("{} {dir}", group_cols[idx]));
            }
            parts.join(", ")
        }
        _ => group_cols
            .iter()
            .map(|c| format!("{c} ASC"))
            .collect::<Vec<_>>()
            .join(", "),
    };

    let select_list = group_cols.join(", ");
    let sql = format!(
        "SELECT {select_list}, {agg_expr} FROM {table} b{joins}{wheres} \
         GROUP BY {select_list} ORDER BY {order_sql}"
    );

    let mut stmt = conn.prepare(&sql)?;
    let n_groups = group_cols.len();
    let rows = stmt
        .query_map(
            rusqlite::params_from_iter(compiler.params.iter()),
            |row| {
                let mut group_values = Vec::with_capacity(n_groups);
                for i in 0..n_groups {
                    group_values.push(row.get::<_, SqlValue>(i)?);
                }
                let result: SqlValue = row.get(n_groups)?;
                Ok((group_values, result))
            },
        )?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    let groups: Vec<GroupEntry> = rows
        .into_iter()
        .map(|(values, result)| GroupEntry {
            group_values: values
                .into_iter()
                .zip(&group_types)
                .map(|(v, ty)| sql_to_json(v, Some(*ty)))
                .collect(),
            result: sql_to_json(result, None),
        })
        .collect();

    // Pagination applies to group rows; total_groups counts before it.
    let total_groups = groups.len();
    let groups: Vec<GroupEntry> = groups
        .into_iter()
        .skip(query.offset as usize)
        .take(query.limit as usize)
        .collect();
    Ok(QueryOutcome::Grouped(GroupedResult {
        entity_type: kind,
        aggregation: GroupedAggregation {
            function: aggregation.function,
            field: aggregation.field.clone(),
            groups,
        },
        total_groups,
    }))
}

fn sql_to_json(value: SqlValue, ty: Option<FieldType>) -> Json {
    match value {
        SqlValue::Null => Json::Null,
        SqlValue::Integer(i) => match ty {
            Some(FieldType::Bool) => Json::Bool(i != 0),
            _ => Json::from(i),
        },
        SqlValue::Real(f) => serde_json::Number::from_f64(f)
            .map(Json::Number)
            .unwrap_or(Json::Null),
        SqlValue::Text(s) => Json::String(s),
        SqlValue::Blob(_) => Json::Null,
    }
}
