//! gradesql: ask a student-grades table questions in plain English.
//!
//! A language model writes the SQL, a validator keeps it read-only and on the
//! known table, SQLite runs it, and a second model call turns the rows back
//! into prose.

pub mod cli;
pub mod core;
pub mod llm;
pub mod trace;
