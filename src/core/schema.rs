//! GS-003: The fixed `students` table.

/// The only table queries may touch.
pub const TABLE: &str = "students";

/// Known columns, in declaration order.
pub const COLUMNS: &[&str] = &["id", "name", "subject", "grade"];

/// DDL used for the validator's in-memory dry run.
pub const DDL: &str = "CREATE TABLE students (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    subject TEXT NOT NULL,
    grade INTEGER NOT NULL
)";

/// Schema description given to the model.
pub const SCHEMA_DESCRIPTION: &str = "Database Schema:
Table: students
Columns:
- id (INTEGER PRIMARY KEY): Unique student record ID
- name (TEXT): Student name
- subject (TEXT): Subject name (Math, Science, English)
- grade (INTEGER): Grade score (0-100)

Each row is one grade for one student in one subject.";

/// Whether `ident` names the known table (case-insensitive, quotes ignored).
pub fn is_known_table(ident: &str) -> bool {
    unquote(ident).eq_ignore_ascii_case(TABLE)
}

/// Whether `ident` names a known column (case-insensitive, quotes ignored).
pub fn is_known_column(ident: &str) -> bool {
    let ident = unquote(ident);
    COLUMNS.iter().any(|c| c.eq_ignore_ascii_case(ident))
}

pub fn unquote(ident: &str) -> &str {
    ident.trim_matches(|c| c == '"' || c == '`' || c == '[' || c == ']')
}
