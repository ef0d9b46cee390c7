//! Generic row operations over the collection tables.

use rusqlite::params_from_iter;
use rusqlite::types::{Type, Value as SqlValue, ValueRef};
use rusqlite::OptionalExtension;
use serde_json::Value;

use super::filter::{json_to_sql, render_filter, render_order};
use super::{ColumnKind, Database, DbError, DbResult, TableSpec};
use crate::models::RecordId;
use crate::store::{Query, Row};

impl Database {
    /// Run a query; returns the requested window and the size of the filtered set.
    pub fn query_rows(&self, spec: &TableSpec, query: &Query) -> DbResult<(Vec<Row>, u64)> {
        let clause = query
            .filter
            .as_ref()
            .map(|f| render_filter(spec, f))
            .transpose()?
            .unwrap_or_default();
        let where_sql = if clause.sql.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", clause.sql)
        };

        let total: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {}{}", spec.name, where_sql),
            params_from_iter(clause.params.iter()),
            |row| row.get(0),
        )?;

        let mut sql = format!(
            "SELECT {} FROM {}{} ORDER BY {}",
            spec.select_list(),
            spec.name,
            where_sql,
            render_order(spec, &query.order)?
        );
        let mut params = clause.params;
        if let Some(range) = query.range {
            sql.push_str(" LIMIT ? OFFSET ?");
            params.push(SqlValue::Integer(range.limit as i64));
            params.push(SqlValue::Integer(range.offset as i64));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(params.iter()), |row| read_row(spec, row))?;
        let rows = rows.collect::<Result<Vec<_>, _>>()?;

        Ok((rows, total.max(0) as u64))
    }

    /// Get a row by ID.
    pub fn get_row(&self, spec: &TableSpec, id: RecordId) -> DbResult<Option<Row>> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM {} WHERE id = ?", spec.select_list(), spec.name),
                [id],
                |row| read_row(spec, row),
            )
            .optional()
            .map_err(Into::into)
    }

    /// Insert a row and return it as stored.
    pub fn insert_row(&self, spec: &TableSpec, row: &Row) -> DbResult<Row> {
        let (columns, values) = writable_values(spec, row)?;

        let sql = if columns.is_empty() {
            format!("INSERT INTO {} DEFAULT VALUES", spec.name)
        } else {
            let placeholders = vec!["?"; columns.len()].join(", ");
            format!(
                "INSERT INTO {} ({}) VALUES ({})",
                spec.name,
                columns.join(", "),
                placeholders
            )
        };

        self.conn
            .execute(&sql, params_from_iter(values.iter()))
            .map_err(DbError::classify)?;

        let id = self.conn.last_insert_rowid();
        self.get_row(spec, id)?
            .ok_or_else(|| DbError::Constraint(format!("{} #{} vanished after insert", spec.name, id)))
    }

    /// Apply a partial update. Returns `None` when no row has that ID.
    pub fn update_row(&self, spec: &TableSpec, id: RecordId, patch: &Row) -> DbResult<Option<Row>> {
        let (columns, mut values) = writable_values(spec, patch)?;

        if !columns.is_empty() {
            let assignments = columns
                .iter()
                .map(|c| format!("{c} = ?"))
                .collect::<Vec<_>>()
                .join(", ");
            values.push(SqlValue::Integer(id));

            let rows_affected = self
                .conn
                .execute(
                    &format!("UPDATE {} SET {} WHERE id = ?", spec.name, assignments),
                    params_from_iter(values.iter()),
                )
                .map_err(DbError::classify)?;
            if rows_affected == 0 {
                return Ok(None);
            }
        }

        self.get_row(spec, id)
    }

    /// Delete a row. Returns `false` when no row has that ID.
    pub fn delete_row(&self, spec: &TableSpec, id: RecordId) -> DbResult<bool> {
        let rows_affected = self
            .conn
            .execute(&format!("DELETE FROM {} WHERE id = ?", spec.name), [id])
            .map_err(DbError::classify)?;
        Ok(rows_affected > 0)
    }
}

/// Split a JSON row into writable column names and bound values.
///
/// Server-managed keys (`id`, `created_at`) are skipped; any other unknown key is rejected.
fn writable_values(spec: &TableSpec, row: &Row) -> DbResult<(Vec<&'static str>, Vec<SqlValue>)> {
    let mut columns = Vec::with_capacity(row.len());
    let mut values = Vec::with_capacity(row.len());

    for (key, value) in row {
        match spec.column(key) {
            Some(column) if column.writable => {
                columns.push(column.name);
                values.push(json_to_sql(column.name, value, column.kind)?);
            }
            Some(_) => {}
            None => {
                return Err(DbError::UnknownField {
                    table: spec.name,
                    field: key.clone(),
                })
            }
        }
    }

    Ok((columns, values))
}

fn read_row(spec: &TableSpec, row: &rusqlite::Row<'_>) -> rusqlite::Result<Row> {
    let mut out = Row::new();
    for (idx, column) in spec.columns.iter().enumerate() {
        let value = match row.get_ref(idx)? {
            ValueRef::Null => Value::Null,
            ValueRef::Integer(i) => Value::from(i),
            ValueRef::Real(f) => serde_json::Number::from_f64(f)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            ValueRef::Text(bytes) => {
                let text = std::str::from_utf8(bytes).map_err(|e| {
                    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e))
                })?;
                if column.kind == ColumnKind::Json {
                    serde_json::from_str(text).map_err(|e| {
                        rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e))
                    })?
                } else {
                    Value::String(text.to_owned())
                }
            }
            ValueRef::Blob(_) => Value::Null,
        };
        out.insert(column.name.to_string(), value);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::table_for;
    use crate::store::{Collection, Filter, Order};
    use serde_json::json;

    fn setup_db() -> Database {
        Database::open_in_memory().unwrap()
    }

    fn row(value: Value) -> Row {
        value.as_object().cloned().unwrap()
    }

    fn insert_patient(db: &Database, first: &str, last: &str, doc: &str) -> Row {
        db.insert_row(
            table_for(Collection::Patients),
            &row(json!({"first_name": first, "last_name": last, "document_number": doc})),
        )
        .unwrap()
    }

    #[test]
    fn test_insert_assigns_id_and_timestamp() {
        let db = setup_db();
        let stored = insert_patient(&db, "Ana", "Gomez", "30111222");

        assert_eq!(stored["id"], json!(1));
        assert!(stored["created_at"].is_string());
        assert_eq!(stored["social_work"], Value::Null);
    }

    #[test]
    fn test_insert_ignores_client_id() {
        let db = setup_db();
        let stored = db
            .insert_row(
                table_for(Collection::SocialWorks),
                &row(json!({"id": 99, "name": "OSDE"})),
            )
            .unwrap();
        assert_eq!(stored["id"], json!(1));
    }

    #[test]
    fn test_unknown_key_rejected() {
        let db = setup_db();
        let result = db.insert_row(
            table_for(Collection::SocialWorks),
            &row(json!({"name": "OSDE", "colour": "blue"})),
        );
        assert!(matches!(result, Err(DbError::UnknownField { .. })));
    }

    #[test]
    fn test_json_column_round_trips() {
        let db = setup_db();
        insert_patient(&db, "Ana", "Gomez", "30111222");
        db.insert_row(
            table_for(Collection::Doctors),
            &row(json!({"first_name": "Julia", "last_name": "Paz", "license_number": "MN-1"})),
        )
        .unwrap();

        let items = json!([{"practice_id": 3, "laterality": "right_eye"}]);
        let stored = db
            .insert_row(
                table_for(Collection::Prescriptions),
                &row(json!({"patient_id": 1, "doctor_id": 1, "issued_on": "2024-03-01", "items": items})),
            )
            .unwrap();
        assert_eq!(stored["items"], items);
    }

    #[test]
    fn test_update_and_missing_row() {
        let db = setup_db();
        let spec = table_for(Collection::Patients);
        insert_patient(&db, "Ana", "Gomez", "30111222");

        let updated = db
            .update_row(spec, 1, &row(json!({"phone": "555-0101"})))
            .unwrap()
            .unwrap();
        assert_eq!(updated["phone"], "555-0101");
        assert_eq!(updated["first_name"], "Ana");

        assert!(db
            .update_row(spec, 42, &row(json!({"phone": "x"})))
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_delete_constraint_classified() {
        let db = setup_db();
        insert_patient(&db, "Ana", "Gomez", "30111222");
        db.insert_row(
            table_for(Collection::Doctors),
            &row(json!({"first_name": "Julia", "last_name": "Paz", "license_number": "MN-1"})),
        )
        .unwrap();
        db.insert_row(
            table_for(Collection::Prescriptions),
            &row(json!({"patient_id": 1, "doctor_id": 1, "issued_on": "2024-03-01"})),
        )
        .unwrap();

        let result = db.delete_row(table_for(Collection::Doctors), 1);
        assert!(matches!(result, Err(DbError::Constraint(_))));
        assert!(!db.delete_row(table_for(Collection::Doctors), 2).unwrap());
    }

    #[test]
    fn test_query_window_and_count() {
        let db = setup_db();
        let spec = table_for(Collection::Patients);
        for (i, last) in ["Zapata", "alvarez", "Molina", "Benitez", "Alonso"].iter().enumerate() {
            insert_patient(&db, "X", last, &format!("{i}"));
        }

        let query = Query::all().order_by(Order::asc("last_name")).range(1, 2);
        let (rows, total) = db.query_rows(spec, &query).unwrap();

        assert_eq!(total, 5);
        let names: Vec<_> = rows.iter().map(|r| r["last_name"].as_str().unwrap()).collect();
        assert_eq!(names, vec!["alvarez", "Benitez"]);
    }

    #[test]
    fn test_contains_is_case_insensitive() {
        let db = setup_db();
        let spec = table_for(Collection::Patients);
        insert_patient(&db, "Ana", "Gomez", "30111222");
        insert_patient(&db, "Mariana", "Lopez", "28999000");
        insert_patient(&db, "Pedro", "Diaz", "31000111");

        let query = Query::all().filter(Some(Filter::contains("first_name", "ANA")));
        let (rows, total) = db.query_rows(spec, &query).unwrap();
        assert_eq!(total, 2);
        assert_eq!(rows.len(), 2);
    }
}
