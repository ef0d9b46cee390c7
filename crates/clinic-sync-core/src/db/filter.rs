//! Translation of the store filter grammar into SQL.

use rusqlite::types::Value as SqlValue;
use serde_json::Value;

use super::{ColumnKind, DbError, DbResult, TableSpec};
use crate::store::{Filter, Order};

/// A rendered WHERE clause with its positional parameters.
#[derive(Debug, Default)]
pub(crate) struct SqlClause {
    pub sql: String,
    pub params: Vec<SqlValue>,
}

/// Render a filter; field names are checked against the table, never interpolated raw.
pub(crate) fn render_filter(spec: &TableSpec, filter: &Filter) -> DbResult<SqlClause> {
    let mut clause = SqlClause::default();
    render_into(spec, filter, &mut clause)?;
    Ok(clause)
}

fn render_into(spec: &TableSpec, filter: &Filter, out: &mut SqlClause) -> DbResult<()> {
    match filter {
        Filter::Eq { field, value } => {
            let column = checked_column(spec, field)?;
            if value.is_null() {
                out.sql.push_str(&format!("{column} IS NULL"));
            } else {
                out.sql.push_str(&format!("{column} = ?"));
                out.params.push(json_to_sql(field, value, ColumnKind::Text)?);
            }
        }
        Filter::Contains { field, needle } => {
            let column = checked_column(spec, field)?;
            out.sql.push_str(&format!("{column} LIKE ? ESCAPE '\\'"));
            out.params
                .push(SqlValue::Text(format!("%{}%", escape_like(needle))));
        }
        Filter::And(parts) => render_group(spec, parts, " AND ", "1", out)?,
        Filter::Or(parts) => render_group(spec, parts, " OR ", "0", out)?,
    }
    Ok(())
}

fn render_group(
    spec: &TableSpec,
    parts: &[Filter],
    joiner: &str,
    empty: &str,
    out: &mut SqlClause,
) -> DbResult<()> {
    if parts.is_empty() {
        out.sql.push_str(empty);
        return Ok(());
    }
    out.sql.push('(');
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            out.sql.push_str(joiner);
        }
        render_into(spec, part, out)?;
    }
    out.sql.push(')');
    Ok(())
}

/// ORDER BY list; `id` is always appended as the final tie-breaker.
pub(crate) fn render_order(spec: &TableSpec, order: &[Order]) -> DbResult<String> {
    let mut keys = Vec::with_capacity(order.len() + 1);
    for key in order {
        let column = spec.column(&key.field).ok_or_else(|| DbError::UnknownField {
            table: spec.name,
            field: key.field.clone(),
        })?;
        let collate = if column.kind == ColumnKind::Text {
            " COLLATE NOCASE"
        } else {
            ""
        };
        let direction = if key.ascending { "ASC" } else { "DESC" };
        keys.push(format!("{}{collate} {direction}", column.name));
    }
    if !order.iter().any(|key| key.field == "id") {
        keys.push("id ASC".to_string());
    }
    Ok(keys.join(", "))
}

fn checked_column(spec: &TableSpec, field: &str) -> DbResult<&'static str> {
    spec.columns
        .iter()
        .find(|c| c.name == field)
        .map(|c| c.name)
        .ok_or_else(|| DbError::UnknownField {
            table: spec.name,
            field: field.to_string(),
        })
}

/// Escape LIKE wildcards so the needle matches literally.
fn escape_like(needle: &str) -> String {
    let mut escaped = String::with_capacity(needle.len());
    for ch in needle.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

/// Convert a JSON value into a bindable SQLite value.
pub(crate) fn json_to_sql(column: &str, value: &Value, kind: ColumnKind) -> DbResult<SqlValue> {
    if kind == ColumnKind::Json {
        return Ok(SqlValue::Text(serde_json::to_string(value)?));
    }
    match value {
        Value::Null => Ok(SqlValue::Null),
        Value::Bool(b) => Ok(SqlValue::Integer(i64::from(*b))),
        Value::Number(n) => match n.as_i64() {
            Some(i) => Ok(SqlValue::Integer(i)),
            None => n.as_f64().map(SqlValue::Real).ok_or_else(|| DbError::InvalidValue {
                column: column.to_string(),
                reason: format!("number {n} out of range"),
            }),
        },
        Value::String(s) => Ok(SqlValue::Text(s.clone())),
        Value::Array(_) | Value::Object(_) => Err(DbError::InvalidValue {
            column: column.to_string(),
            reason: "nested values are only allowed in JSON columns".to_string(),
        }),
    }
}
