//! GS-005: Validator stage. Read-only, single-table sanity check.
//!
//! Checks, in order:
//! - statement is non-empty after trailing semicolons are stripped
//! - exactly one statement (semicolons inside literals and comments ignored)
//! - no destructive keyword anywhere (whole word, case-insensitive)
//! - statement starts with SELECT or WITH
//! - no `sqlite_*` or `pragma_*` object is named
//! - every FROM-list entry and JOIN target is `students` (or a CTE defined
//!   in the statement)
//! - `students.<col>` references name known columns
//! - dry run against an in-memory copy of the schema succeeds and is read-only

use super::schema;
use regex::Regex;
use rusqlite::Connection;
use std::sync::OnceLock;

/// Keywords rejected unconditionally.
pub const FORBIDDEN_KEYWORDS: &[&str] = &[
    "insert", "update", "delete", "drop", "alter", "create", "truncate", "attach", "detach",
    "pragma", "vacuum",
];

/// Validate `raw_sql`. Returns the cleaned statement (no trailing `;`) on success.
pub fn validate_sql(raw_sql: &str) -> Result<String, String> {
    let candidate = strip_trailing_semicolons(raw_sql);
    if candidate.is_empty() {
        return Err("Empty SQL query generated".to_string());
    }

    let masked = mask_literals(candidate);
    if masked.contains(';') {
        return Err("Multiple statements are not allowed".to_string());
    }

    let normalized = candidate.to_ascii_lowercase();
    if let Some(keyword) = first_forbidden_keyword(&normalized) {
        return Err(format!(
            "Dangerous SQL keyword '{}' detected",
            keyword.to_ascii_uppercase()
        ));
    }

    let leading = leading_keyword(&normalized);
    if leading != "select" && leading != "with" {
        return Err(format!(
            "Only SELECT statements are allowed (got '{}')",
            leading.to_ascii_uppercase()
        ));
    }

    if let Some(object) = first_system_object(&masked) {
        return Err(format!("System object '{}' may not be queried", object));
    }

    let ctes = cte_names(&masked);
    for table in referenced_tables(&masked) {
        let is_cte = ctes.iter().any(|c| c.eq_ignore_ascii_case(&table));
        if !is_main_table(&table) && !is_cte {
            return Err(format!(
                "Unknown table '{}'; only '{}' may be queried",
                table,
                schema::TABLE
            ));
        }
    }

    if let Some(column) = unknown_qualified_column(&masked) {
        return Err(format!("Unknown column '{}.{}'", schema::TABLE, column));
    }

    dry_run(candidate)?;

    Ok(candidate.to_string())
}

/// Trim whitespace and any number of trailing semicolons.
pub fn strip_trailing_semicolons(raw_sql: &str) -> &str {
    let mut candidate = raw_sql.trim();
    while let Some(stripped) = candidate.strip_suffix(';') {
        candidate = stripped.trim_end();
    }
    candidate
}

/// First forbidden keyword appearing as a whole word in lowercase SQL.
pub fn first_forbidden_keyword(normalized_sql: &str) -> Option<&'static str> {
    normalized_sql
        .split(|ch: char| !ch.is_ascii_alphanumeric() && ch != '_')
        .find_map(|token| FORBIDDEN_KEYWORDS.iter().copied().find(|k| *k == token))
}

fn leading_keyword(normalized_sql: &str) -> &str {
    normalized_sql
        .split(|ch: char| !ch.is_ascii_alphanumeric() && ch != '_')
        .find(|token| !token.is_empty())
        .unwrap_or("unknown")
}

/// Blank out string literal contents and comments so structural checks
/// only see SQL. Quotes themselves are kept.
fn mask_literals(sql: &str) -> String {
    let mut out = String::with_capacity(sql.len());
    let mut chars = sql.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '\'' => {
                out.push('\'');
                while let Some(inner) = chars.next() {
                    if inner == '\'' {
                        if chars.peek() == Some(&'\'') {
                            chars.next();
                            out.push_str("  ");
                            continue;
                        }
                        out.push('\'');
                        break;
                    }
                    out.push(' ');
                }
            }
            '-' if chars.peek() == Some(&'-') => {
                out.push(' ');
                for inner in chars.by_ref() {
                    if inner == '\n' {
                        out.push('\n');
                        break;
                    }
                    out.push(' ');
                }
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                out.push_str("  ");
                let mut prev = ' ';
                for inner in chars.by_ref() {
                    out.push(' ');
                    if prev == '*' && inner == '/' {
                        break;
                    }
                    prev = inner;
                }
            }
            _ => out.push(ch),
        }
    }
    out
}

/// First identifier naming a built-in SQLite object (`sqlite_master`,
/// `pragma_table_info`, ...).
fn first_system_object(masked_sql: &str) -> Option<&str> {
    masked_sql
        .split(|ch: char| !ch.is_ascii_alphanumeric() && ch != '_')
        .find(|token| {
            let lower = token.to_ascii_lowercase();
            lower.starts_with("sqlite_") || lower.starts_with("pragma_")
        })
}

/// Whether a (possibly `main.`-qualified) table name is `students`.
fn is_main_table(name: &str) -> bool {
    match name.split_once('.') {
        Some((db, table)) => {
            schema::unquote(db).eq_ignore_ascii_case("main") && schema::is_known_table(table)
        }
        None => schema::is_known_table(name),
    }
}

/// Every table named in a FROM list or as a JOIN target.
fn referenced_tables(masked_sql: &str) -> Vec<String> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"(?i)\b(from|join)\b").expect("valid regex"));

    let mut tables = Vec::new();
    for m in re.find_iter(masked_sql) {
        let before = masked_sql[..m.start()].trim_end();
        if m.as_str().eq_ignore_ascii_case("from")
            && before.to_ascii_lowercase().ends_with("distinct")
        {
            // `IS [NOT] DISTINCT FROM` is a comparison, not a table list
            continue;
        }
        let allow_list = m.as_str().eq_ignore_ascii_case("from");
        tables.extend(table_list(&masked_sql[m.end()..], allow_list));
    }
    tables
}

/// Table names at the start of `tail`. Parenthesized subqueries and
/// table-function arguments are skipped; their own FROM clauses are visited
/// separately. Only a FROM clause continues past a comma.
fn table_list(tail: &str, allow_list: bool) -> Vec<String> {
    let mut names = Vec::new();
    let mut rest = tail;
    loop {
        rest = rest.trim_start();
        if rest.starts_with('(') {
            rest = skip_parens(rest);
        } else {
            let Some((name, after)) = qualified_ident(rest) else {
                break;
            };
            names.push(name);
            rest = after.trim_start();
            if rest.starts_with('(') {
                rest = skip_parens(rest);
            }
        }
        rest = skip_alias(rest).trim_start();
        match rest.strip_prefix(',') {
            Some(after) if allow_list => rest = after,
            _ => break,
        }
    }
    names
}

/// One identifier, bare or quoted with `"`, backticks or brackets.
fn ident_part(s: &str) -> Option<(&str, &str)> {
    let close = match s.chars().next()? {
        '"' => Some('"'),
        '`' => Some('`'),
        '[' => Some(']'),
        _ => None,
    };
    if let Some(close) = close {
        let end = s[1..].find(close)? + 2;
        return Some(s.split_at(end));
    }
    if s.starts_with(|c: char| c.is_ascii_digit()) {
        return None;
    }
    let end = s
        .find(|c: char| !c.is_ascii_alphanumeric() && c != '_')
        .unwrap_or(s.len());
    if end == 0 {
        return None;
    }
    Some(s.split_at(end))
}

/// `name` or `schema.name`, returned as written.
fn qualified_ident(s: &str) -> Option<(String, &str)> {
    let (first, rest) = ident_part(s)?;
    if let Some(after_dot) = rest.trim_start().strip_prefix('.') {
        if let Some((second, after)) = ident_part(after_dot.trim_start()) {
            return Some((format!("{}.{}", first, second), after));
        }
    }
    Some((first.to_string(), rest))
}

/// Skip a balanced `( ... )` group at the start of `s`.
fn skip_parens(s: &str) -> &str {
    let mut depth = 0usize;
    for (i, ch) in s.char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return &s[i + 1..];
                }
            }
            _ => {}
        }
    }
    ""
}

const CLAUSE_WORDS: &[&str] = &[
    "where", "join", "inner", "left", "right", "full", "cross", "natural", "outer", "on",
    "using", "group", "order", "limit", "offset", "having", "union", "intersect", "except",
    "window", "indexed", "not",
];

/// Skip an optional `[AS] alias` after a table.
fn skip_alias(s: &str) -> &str {
    let mut rest = s.trim_start();
    if let Some((word, after)) = ident_part(rest) {
        if word.eq_ignore_ascii_case("as") {
            rest = after.trim_start();
        }
    }
    match ident_part(rest) {
        Some((word, after)) if !CLAUSE_WORDS.iter().any(|c| c.eq_ignore_ascii_case(word)) => {
            after
        }
        _ => rest,
    }
}

/// Names bound by `WITH name AS (...)` clauses.
fn cte_names(sql: &str) -> Vec<String> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(r"(?i)(?:\bwith\s+(?:recursive\s+)?|,\s*)([A-Za-z_][A-Za-z0-9_]*)\s*(?:\([^)]*\)\s*)?as\s*\(")
            .expect("valid regex")
    });
    re.captures_iter(sql).map(|c| c[1].to_string()).collect()
}

fn unknown_qualified_column(sql: &str) -> Option<String> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(r"(?i)\bstudents\s*\.\s*([A-Za-z_][A-Za-z0-9_]*)").expect("valid regex")
    });
    re.captures_iter(sql)
        .map(|c| c[1].to_string())
        .find(|col| !schema::is_known_column(col))
}

/// Prepare and fully step the statement against a one-row in-memory copy of
/// the schema.
fn dry_run(sql: &str) -> Result<(), String> {
    let conn = Connection::open_in_memory().map_err(|e| format!("dry run setup: {}", e))?;
    conn.execute_batch(schema::DDL)
        .map_err(|e| format!("dry run setup: {}", e))?;
    conn.execute(
        "INSERT INTO students (id, name, subject, grade) VALUES (1, 'Test', 'Math', 85)",
        [],
    )
    .map_err(|e| format!("dry run setup: {}", e))?;

    let mut stmt = conn
        .prepare(sql)
        .map_err(|e| format!("SQL execution test failed: {}", e))?;
    if !stmt.readonly() {
        return Err("Statement would modify the database".to_string());
    }
    let mut rows = stmt
        .query([])
        .map_err(|e| format!("SQL execution test failed: {}", e))?;
    while rows
        .next()
        .map_err(|e| format!("SQL execution test failed: {}", e))?
        .is_some()
    {}
    Ok(())
}
