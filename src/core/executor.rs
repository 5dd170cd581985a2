//! GS-006: Executor stage. Runs validated SQL against the grades database.
//!
//! The database is opened read-only; no transaction is needed.

use super::types::{QueryResult, Row};
use rusqlite::types::Value as SqlValue;
use rusqlite::{Connection, OpenFlags};
use serde_json::{json, Value};
use std::path::Path;

/// Open the grades database read-only.
pub fn open_read_only(db_path: &Path) -> Result<Connection, String> {
    if !db_path.exists() {
        return Err(format!("Database not found: {}", db_path.display()));
    }
    Connection::open_with_flags(
        db_path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .map_err(|e| format!("cannot open {}: {}", db_path.display(), e))
}

/// Execute `sql` against the database at `db_path`, collecting at most `row_cap` rows.
pub fn execute_query(db_path: &Path, sql: &str, row_cap: usize) -> Result<QueryResult, String> {
    let conn = open_read_only(db_path)?;
    execute_on(&conn, sql, row_cap)
}

/// Execute `sql` on an open connection.
pub fn execute_on(conn: &Connection, sql: &str, row_cap: usize) -> Result<QueryResult, String> {
    let mut stmt = conn.prepare(sql).map_err(|e| e.to_string())?;
    let columns: Vec<String> = stmt.column_names().iter().map(ToString::to_string).collect();

    let mut rows = stmt.query([]).map_err(|e| e.to_string())?;
    let mut out = Vec::new();
    let mut truncated = false;
    while let Some(row) = rows.next().map_err(|e| e.to_string())? {
        if out.len() >= row_cap {
            truncated = true;
            break;
        }
        let mut record = Row::with_capacity(columns.len());
        for (i, name) in columns.iter().enumerate() {
            let value: SqlValue = row.get(i).map_err(|e| e.to_string())?;
            record.insert(name.clone(), json_value_from_sql(value));
        }
        out.push(record);
    }

    if truncated {
        tracing::warn!(row_cap, "result truncated at row cap");
    }

    Ok(QueryResult {
        columns,
        rows: out,
        truncated,
    })
}

fn json_value_from_sql(value: SqlValue) -> Value {
    match value {
        SqlValue::Null => Value::Null,
        SqlValue::Integer(v) => json!(v),
        SqlValue::Real(v) => json!(v),
        SqlValue::Text(v) => json!(v),
        SqlValue::Blob(v) => json!(format!("<{} bytes>", v.len())),
    }
}
