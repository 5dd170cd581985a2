//! GS-014: BLAKE3 fingerprints for generated SQL.

/// Hash a string. Returns `"blake3:{hex}"`.
pub fn hash_string(s: &str) -> String {
    format!("blake3:{}", blake3::hash(s.as_bytes()).to_hex())
}

/// Fingerprint a SQL statement. Whitespace runs, letter case and trailing
/// semicolons do not change the result.
pub fn sql_fingerprint(sql: &str) -> String {
    let normalized = sql
        .trim()
        .trim_end_matches(';')
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();
    hash_string(&normalized)
}
