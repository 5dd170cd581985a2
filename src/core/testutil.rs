//! Test fixtures: throwaway grades databases.

use super::schema;
use rusqlite::Connection;
use std::path::{Path, PathBuf};

/// The sample grades: (name, subject, grade).
pub const SAMPLE_GRADES: &[(&str, &str, i64)] = &[
    ("Alice", "Math", 85),
    ("Alice", "Science", 78),
    ("Alice", "English", 92),
    ("Bob", "Math", 92),
    ("Bob", "Science", 88),
    ("Bob", "English", 79),
    ("Charlie", "Math", 76),
    ("Charlie", "Science", 94),
    ("Charlie", "English", 85),
    ("Diana", "Math", 88),
    ("Diana", "Science", 91),
    ("Diana", "English", 87),
    ("Eve", "Math", 79),
    ("Eve", "Science", 82),
    ("Eve", "English", 90),
    ("Frank", "Math", 95),
    ("Frank", "Science", 89),
    ("Frank", "English", 83),
    ("Grace", "Math", 82),
    ("Grace", "Science", 86),
    ("Grace", "English", 94),
    ("Henry", "Math", 77),
    ("Henry", "Science", 79),
    ("Henry", "English", 81),
];

/// Write a grades database at `path` holding `grades`.
pub fn write_db(path: &Path, grades: &[(&str, &str, i64)]) {
    let conn = Connection::open(path).unwrap();
    conn.execute_batch(schema::DDL).unwrap();
    let mut stmt = conn
        .prepare("INSERT INTO students (name, subject, grade) VALUES (?1, ?2, ?3)")
        .unwrap();
    for (name, subject, grade) in grades {
        stmt.execute(rusqlite::params![name, subject, grade]).unwrap();
    }
}

/// A temp dir holding `student_grades.db` seeded with [`SAMPLE_GRADES`].
pub fn seeded_db() -> (tempfile::TempDir, PathBuf) {
    db_with(SAMPLE_GRADES)
}

/// A temp dir holding `student_grades.db` seeded with `grades`.
pub fn db_with(grades: &[(&str, &str, i64)]) -> (tempfile::TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("student_grades.db");
    write_db(&path, grades);
    (dir, path)
}
