//! Builds parameterized INSERT, SELECT, UPDATE, DELETE from a table descriptor.

use super::PgBindValue;
use crate::contract::TableDescriptor;
use serde_json::{Map, Value};

/// Quote identifier for PostgreSQL (safe: only from descriptors).
pub(crate) fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

/// Full qualified table name.
fn qualified_table(table: &TableDescriptor) -> String {
    format!("{}.{}", quoted(table.schema), quoted(table.name))
}

#[derive(Debug)]
pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<PgBindValue>,
}

impl QueryBuf {
    fn new() -> Self {
        QueryBuf {
            sql: String::new(),
            params: Vec::new(),
        }
    }

    /// Binds `v` as the column's declared type: `$n::type`, or `$n` when undeclared.
    fn placeholder(&mut self, v: &Value, pg_type: Option<&str>) -> String {
        self.params.push(PgBindValue::from_json(v, pg_type));
        let n = self.params.len();
        pg_type
            .map(|t| format!("${}::{}", n, t))
            .unwrap_or_else(|| format!("${}", n))
    }
}

fn select_column_list(table: &TableDescriptor) -> String {
    table
        .columns
        .iter()
        .map(|c| quoted(c.name))
        .collect::<Vec<_>>()
        .join(", ")
}

/// SELECT by primary key. Id is the sole param.
pub fn select_by_id(table: &TableDescriptor, id: &Value) -> QueryBuf {
    let mut q = QueryBuf::new();
    let ph = q.placeholder(id, table.primary_key_type());
    q.sql = format!(
        "SELECT {} FROM {} WHERE {} = {}",
        select_column_list(table),
        qualified_table(table),
        quoted(table.primary_key),
        ph
    );
    q
}

/// SELECT by primary key, locking the row for the rest of the transaction.
pub fn select_for_update(table: &TableDescriptor, id: &Value) -> QueryBuf {
    let mut q = select_by_id(table, id);
    q.sql.push_str(" FOR UPDATE");
    q
}

/// SELECT ordered by primary key with LIMIT/OFFSET.
pub fn select_list(table: &TableDescriptor, limit: u32, offset: u32) -> QueryBuf {
    let mut q = QueryBuf::new();
    q.sql = format!(
        "SELECT {} FROM {} ORDER BY {} LIMIT {} OFFSET {}",
        select_column_list(table),
        qualified_table(table),
        quoted(table.primary_key),
        limit,
        offset
    );
    q
}

/// INSERT: the primary key is always left to the database.
/// Columns with a DB default are omitted when the body has no value (or null) for them.
pub fn insert(table: &TableDescriptor, body: &Map<String, Value>) -> QueryBuf {
    let mut q = QueryBuf::new();
    let mut cols = Vec::new();
    let mut placeholders = Vec::new();
    for c in table.columns {
        if c.name == table.primary_key {
            continue;
        }
        let val = body.get(c.name).unwrap_or(&Value::Null);
        if val.is_null() && c.has_default {
            continue;
        }
        placeholders.push(q.placeholder(val, c.pg_type));
        cols.push(quoted(c.name));
    }
    let returning = select_column_list(table);
    q.sql = if cols.is_empty() {
        format!("INSERT INTO {} DEFAULT VALUES RETURNING {}", qualified_table(table), returning)
    } else {
        format!(
            "INSERT INTO {} ({}) VALUES ({}) RETURNING {}",
            qualified_table(table),
            cols.join(", "),
            placeholders.join(", "),
            returning
        )
    };
    q
}

/// UPDATE by id: SET every non-key column present in body. Falls back to a plain
/// SELECT when nothing is settable so callers still get the row back.
pub fn update(table: &TableDescriptor, id: &Value, body: &Map<String, Value>) -> QueryBuf {
    let mut q = QueryBuf::new();
    let mut sets = Vec::new();
    for c in table.columns {
        if c.name == table.primary_key {
            continue;
        }
        let Some(v) = body.get(c.name) else { continue };
        let rhs = q.placeholder(v, c.pg_type);
        sets.push(format!("{} = {}", quoted(c.name), rhs));
    }
    if sets.is_empty() {
        return select_by_id(table, id);
    }
    let id_ph = q.placeholder(id, table.primary_key_type());
    q.sql = format!(
        "UPDATE {} SET {} WHERE {} = {} RETURNING {}",
        qualified_table(table),
        sets.join(", "),
        quoted(table.primary_key),
        id_ph,
        select_column_list(table)
    );
    q
}

/// DELETE by id, returning the removed row.
pub fn delete(table: &TableDescriptor, id: &Value) -> QueryBuf {
    let mut q = QueryBuf::new();
    let ph = q.placeholder(id, table.primary_key_type());
    q.sql = format!(
        "DELETE FROM {} WHERE {} = {} RETURNING {}",
        qualified_table(table),
        quoted(table.primary_key),
        ph,
        select_column_list(table)
    );
    q
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::ColumnDef;
    use serde_json::json;

    const NOTES: TableDescriptor = TableDescriptor {
        schema: "public",
        name: "notes",
        primary_key: "id",
        columns: &[
            ColumnDef { name: "id", pg_type: Some("bigint"), has_default: true },
            ColumnDef { name: "body", pg_type: None, has_default: false },
            ColumnDef { name: "token", pg_type: Some("uuid"), has_default: false },
            ColumnDef { name: "created_at", pg_type: Some("timestamptz"), has_default: true },
        ],
    };

    const TOKEN: &str = "6f1c2f0e-8f8a-4f53-9a57-1b7c1e9c1d11";

    fn body(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn insert_skips_key_and_defaulted_columns() {
        let q = insert(&NOTES, &body(json!({"id": 9, "body": "hi", "token": null})));
        assert_eq!(
            q.sql,
            "INSERT INTO \"public\".\"notes\" (\"body\", \"token\") VALUES ($1, $2::uuid) \
             RETURNING \"id\", \"body\", \"token\", \"created_at\""
        );
        assert_eq!(q.params, vec![PgBindValue::String("hi".into()), PgBindValue::Null]);
    }

    #[test]
    fn insert_binds_provided_default_column() {
        let q = insert(
            &NOTES,
            &body(json!({"body": "hi", "token": TOKEN, "created_at": "2024-01-01T00:00:00Z"})),
        );
        assert!(q.sql.contains("\"created_at\") VALUES ($1, $2::uuid, $3::timestamptz)"));
        assert!(matches!(q.params[1], PgBindValue::Uuid(_)));
        assert_eq!(q.params[2], PgBindValue::String("2024-01-01T00:00:00Z".into()));
    }

    #[test]
    fn untyped_column_keeps_uuid_shaped_text() {
        let q = insert(&NOTES, &body(json!({"body": TOKEN})));
        assert_eq!(q.params[0], PgBindValue::String(TOKEN.into()));
    }

    #[test]
    fn update_sets_only_present_columns_and_binds_id_last() {
        let q = update(&NOTES, &json!(4), &body(json!({"id": 4, "body": "edited"})));
        assert_eq!(
            q.sql,
            "UPDATE \"public\".\"notes\" SET \"body\" = $1 WHERE \"id\" = $2::bigint \
             RETURNING \"id\", \"body\", \"token\", \"created_at\""
        );
        assert_eq!(q.params, vec![PgBindValue::String("edited".into()), PgBindValue::I64(4)]);
    }

    #[test]
    fn empty_update_degrades_to_select() {
        let q = update(&NOTES, &json!(4), &Map::new());
        assert!(q.sql.starts_with("SELECT "));
        assert_eq!(q.params, vec![PgBindValue::I64(4)]);
    }

    #[test]
    fn list_and_lock_queries() {
        let q = select_list(&NOTES, 10, 20);
        assert!(q.sql.ends_with("ORDER BY \"id\" LIMIT 10 OFFSET 20"));
        assert!(q.params.is_empty());
        let q = select_for_update(&NOTES, &json!(1));
        assert!(q.sql.ends_with("WHERE \"id\" = $1::bigint FOR UPDATE"));
        let q = delete(&NOTES, &json!(1));
        assert!(q.sql.starts_with("DELETE FROM \"public\".\"notes\" WHERE \"id\" = $1::bigint RETURNING"));
    }

    #[test]
    fn identifiers_are_escaped() {
        assert_eq!(quoted("we\"ird"), "\"we\"\"ird\"");
    }
}
