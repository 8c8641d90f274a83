//! Introspection, filters and joins
//!
//! Table and column names are checked against the live schema before they
//! are quoted into SQL; filter values are always bound parameters.

use crate::{quote_ident, Result, Storage, StorageError};
use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::{params_from_iter, Connection};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::debug;

/// Column metadata
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ColumnInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: String,
    pub nullable: bool,
    pub default: Option<String>,
    pub primary_key: bool,
}

/// Rows of a single table, optionally filtered
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableRows {
    pub table: String,
    pub columns: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filters: Option<Value>,
    pub row_count: usize,
    pub rows: Vec<Map<String, Value>>,
}

/// Join condition
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JoinOn {
    pub left_column: String,
    pub right_column: String,
}

/// Inner join result; each row nests its values by table name
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinRows {
    pub left_table: String,
    pub right_table: String,
    pub columns: Map<String, Value>,
    pub join_on: JoinOn,
    pub row_count: usize,
    pub rows: Vec<Map<String, Value>>,
}

impl Storage {
    /// User table names, sorted
    pub fn list_tables(&self) -> Result<Vec<String>> {
        let conn = self.conn()?;
        table_names(&conn)
    }

    /// Column metadata for one table
    pub fn describe_columns(&self, table: &str) -> Result<Vec<ColumnInfo>> {
        let conn = self.conn()?;
        columns_of(&conn, table)
    }

    /// Every row of a table
    pub fn all_rows(&self, table: &str) -> Result<TableRows> {
        let conn = self.conn()?;
        let columns = column_names(&conn, table)?;
        let sql = format!("SELECT * FROM {}", quote_ident(table));
        let rows = fetch_rows(&conn, &sql, Vec::new(), &columns)?;
        Ok(table_rows(table, columns, None, rows))
    }

    /// Rows whose numeric `column` lies within the inclusive bounds
    pub fn filter_numeric(
        &self,
        table: &str,
        column: &str,
        gte: Option<f64>,
        lte: Option<f64>,
    ) -> Result<TableRows> {
        let conn = self.conn()?;
        let columns = column_names(&conn, table)?;
        require_column(table, &columns, column)?;

        let col = quote_ident(column);
        let mut clauses = Vec::new();
        let mut params = Vec::new();
        if gte.is_some() || lte.is_some() {
            clauses.push(format!("typeof({}) IN ('integer', 'real')", col));
        }
        if let Some(bound) = gte {
            params.push(SqlValue::Real(bound));
            clauses.push(format!("{} >= ?{}", col, params.len()));
        }
        if let Some(bound) = lte {
            params.push(SqlValue::Real(bound));
            clauses.push(format!("{} <= ?{}", col, params.len()));
        }

        let mut sql = format!("SELECT * FROM {}", quote_ident(table));
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }

        let rows = fetch_rows(&conn, &sql, params, &columns)?;

        let mut filters = json!({ "column": column });
        if let Some(bound) = gte {
            filters["gte"] = json!(bound);
        }
        if let Some(bound) = lte {
            filters["lte"] = json!(bound);
        }
        Ok(table_rows(table, columns, Some(filters), rows))
    }

    /// Rows whose `column` equals one of `values`
    pub fn filter_inclusion(&self, table: &str, column: &str, values: &[Value]) -> Result<TableRows> {
        let conn = self.conn()?;
        let columns = column_names(&conn, table)?;
        require_column(table, &columns, column)?;

        let rows = if values.is_empty() {
            Vec::new()
        } else {
            let placeholders: Vec<String> = (1..=values.len()).map(|i| format!("?{}", i)).collect();
            let sql = format!(
                "SELECT * FROM {} WHERE {} IN ({})",
                quote_ident(table),
                quote_ident(column),
                placeholders.join(", ")
            );
            let params = values.iter().map(to_sql_value).collect();
            fetch_rows(&conn, &sql, params, &columns)?
        };

        let filters = json!({ "column": column, "include_values": values });
        Ok(table_rows(table, columns, Some(filters), rows))
    }

    /// Rows whose `column` matches a SQL LIKE pattern
    pub fn filter_like(&self, table: &str, column: &str, pattern: &str) -> Result<TableRows> {
        let conn = self.conn()?;
        let columns = column_names(&conn, table)?;
        require_column(table, &columns, column)?;

        let sql = format!(
            "SELECT * FROM {} WHERE {} LIKE ?1",
            quote_ident(table),
            quote_ident(column)
        );
        let params = vec![SqlValue::Text(pattern.to_string())];
        let rows = fetch_rows(&conn, &sql, params, &columns)?;

        let filters = json!({ "column": column, "like": pattern });
        Ok(table_rows(table, columns, Some(filters), rows))
    }

    /// Inner join of two tables on `left.left_column = right.right_column`
    pub fn join(
        &self,
        left: &str,
        right: &str,
        left_column: &str,
        right_column: &str,
    ) -> Result<JoinRows> {
        let conn = self.conn()?;
        let left_columns = column_names(&conn, left)?;
        let right_columns = column_names(&conn, right)?;
        require_column(left, &left_columns, left_column)?;
        require_column(right, &right_columns, right_column)?;

        let sql = format!(
            "SELECT l.*, r.* FROM {} AS l JOIN {} AS r ON l.{} = r.{}",
            quote_ident(left),
            quote_ident(right),
            quote_ident(left_column),
            quote_ident(right_column)
        );
        debug!("◆ JOIN {} ⋈ {}", left, right);

        // A self-join would otherwise collapse both sides into one key
        let right_key = if left == right {
            format!("{}_right", right)
        } else {
            right.to_string()
        };

        let mut stmt = conn.prepare(&sql)?;
        let split = left_columns.len();
        let rows = stmt
            .query_map([], |row| {
                let mut left_obj = Map::new();
                for (idx, name) in left_columns.iter().enumerate() {
                    left_obj.insert(name.clone(), json_value(row.get_ref(idx)?));
                }
                let mut right_obj = Map::new();
                for (idx, name) in right_columns.iter().enumerate() {
                    right_obj.insert(name.clone(), json_value(row.get_ref(split + idx)?));
                }
                let mut nested = Map::new();
                nested.insert(left.to_string(), Value::Object(left_obj));
                nested.insert(right_key.clone(), Value::Object(right_obj));
                Ok(nested)
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut columns = Map::new();
        columns.insert(left.to_string(), json!(left_columns));
        columns.insert(right_key, json!(right_columns));

        Ok(JoinRows {
            left_table: left.to_string(),
            right_table: right.to_string(),
            columns,
            join_on: JoinOn {
                left_column: left_column.to_string(),
                right_column: right_column.to_string(),
            },
            row_count: rows.len(),
            rows,
        })
    }
}

fn table_names(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT name FROM sqlite_master \
         WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
    )?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(names)
}

fn require_table(conn: &Connection, table: &str) -> Result<()> {
    if table_names(conn)?.iter().any(|t| t == table) {
        Ok(())
    } else {
        Err(StorageError::TableNotFound(table.to_string()))
    }
}

fn columns_of(conn: &Connection, table: &str) -> Result<Vec<ColumnInfo>> {
    require_table(conn, table)?;
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", quote_ident(table)))?;
    let columns = stmt
        .query_map([], |row| {
            Ok(ColumnInfo {
                name: row.get(1)?,
                data_type: row.get(2)?,
                nullable: row.get::<_, i64>(3)? == 0,
                default: row.get(4)?,
                primary_key: row.get::<_, i64>(5)? > 0,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(columns)
}

fn column_names(conn: &Connection, table: &str) -> Result<Vec<String>> {
    Ok(columns_of(conn, table)?
        .into_iter()
        .map(|c| c.name)
        .collect())
}

fn require_column(table: &str, columns: &[String], column: &str) -> Result<()> {
    if columns.iter().any(|c| c == column) {
        Ok(())
    } else {
        Err(StorageError::ColumnNotFound {
            table: table.to_string(),
            column: column.to_string(),
        })
    }
}

fn fetch_rows(
    conn: &Connection,
    sql: &str,
    params: Vec<SqlValue>,
    columns: &[String],
) -> Result<Vec<Map<String, Value>>> {
    debug!("◆ SQL: {}", sql);
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params_from_iter(params), |row| {
            let mut obj = Map::new();
            for (idx, name) in columns.iter().enumerate() {
                obj.insert(name.clone(), json_value(row.get_ref(idx)?));
            }
            Ok(obj)
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

fn table_rows(
    table: &str,
    columns: Vec<String>,
    filters: Option<Value>,
    rows: Vec<Map<String, Value>>,
) -> TableRows {
    TableRows {
        table: table.to_string(),
        columns,
        filters,
        row_count: rows.len(),
        rows,
    }
}

fn json_value(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => json!(i),
        ValueRef::Real(f) => json!(f),
        ValueRef::Text(bytes) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => Value::String(format!("<blob {} bytes>", bytes.len())),
    }
}

fn to_sql_value(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
        Value::Number(n) => match n.as_i64() {
            Some(i) => SqlValue::Integer(i),
            None => SqlValue::Real(n.as_f64().unwrap_or(f64::NAN)),
        },
        Value::String(s) => SqlValue::Text(s.clone()),
        other => SqlValue::Text(other.to_string()),
    }
}
