//! GS-004: Parser stage, natural-language question to candidate SQL.
//!
//! One model call per question, no retries. The reply is cleaned of
//! surrounding whitespace and Markdown code fences before validation.

use super::schema;
use crate::llm::LanguageModel;
use regex::Regex;
use std::sync::OnceLock;

/// Build the SQL generation prompt for a question.
pub fn build_prompt(question: &str) -> String {
    format!(
        "Convert the following natural language question into a SQL query for the student grades database.

{schema}

Question: {question}

Rules:
1. Only use SELECT statements
2. Use the exact table and column names provided
3. Return only the SQL query without any explanation
4. Use proper SQL syntax (SQLite dialect)
5. For \"highest\" or \"lowest\" questions, return every student tied for that grade using \
grade = (SELECT MAX(grade) ...) or MIN, and ORDER BY name

SQL Query:",
        schema = schema::SCHEMA_DESCRIPTION,
        question = question.trim(),
    )
}

/// Strip whitespace and Markdown code fences from a model reply.
pub fn clean_sql(raw: &str) -> String {
    static OPEN: OnceLock<Regex> = OnceLock::new();
    static CLOSE: OnceLock<Regex> = OnceLock::new();
    let open = OPEN.get_or_init(|| Regex::new(r"(?i)^```(?:sqlite|sql)?\s*").expect("valid regex"));
    let close = CLOSE.get_or_init(|| Regex::new(r"\s*```$").expect("valid regex"));

    let trimmed = raw.trim();
    let without_open = open.replace(trimmed, "");
    let without_close = close.replace(&without_open, "");
    without_close.trim().to_string()
}

/// Generate SQL for `question`.
pub fn generate_sql(model: &dyn LanguageModel, question: &str) -> Result<String, String> {
    if question.trim().is_empty() {
        return Err("question is empty".to_string());
    }
    let reply = model.complete(&build_prompt(question))?;
    let sql = clean_sql(&reply);
    if sql.is_empty() {
        return Err("model returned no SQL".to_string());
    }
    Ok(sql)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_gs004_prompt_contains_question_and_schema() {
        let p = build_prompt("  What grades did Alice get?  ");
        assert!(p.contains("Question: What grades did Alice get?\n"));
        assert!(p.contains("Table: students"));
        assert!(p.contains("Only use SELECT statements"));
        assert!(p.trim_end().ends_with("SQL Query:"));
    }

    #[test]
    fn test_gs004_clean_plain() {
        assert_eq!(clean_sql("  SELECT * FROM students \n"), "SELECT * FROM students");
    }

    #[test]
    fn test_gs004_clean_fenced() {
        let raw = "```sql\nSELECT name FROM students;\n```";
        assert_eq!(clean_sql(raw), "SELECT name FROM students;");
    }

    #[test]
    fn test_gs004_clean_bare_fence() {
        let raw = "```\nSELECT 1\n```";
        assert_eq!(clean_sql(raw), "SELECT 1");
    }

    #[test]
    fn test_gs004_clean_uppercase_fence() {
        assert_eq!(clean_sql("```SQL\nSELECT 1```"), "SELECT 1");
    }

    #[test]
    fn test_gs004_generate_calls_model_once() {
        let calls = Cell::new(0);
        let model = |prompt: &str| -> Result<String, String> {
            calls.set(calls.get() + 1);
            assert!(prompt.contains("Alice"));
            Ok("```sql\nSELECT subject, grade FROM students WHERE name = 'Alice'\n```".into())
        };
        let sql = generate_sql(&model, "What grades did Alice get?").unwrap();
        assert_eq!(sql, "SELECT subject, grade FROM students WHERE name = 'Alice'");
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_gs004_generate_model_error() {
        let model = |_: &str| -> Result<String, String> { Err("timeout".into()) };
        assert_eq!(generate_sql(&model, "anything").unwrap_err(), "timeout");
    }

    #[test]
    fn test_gs004_generate_empty_question_skips_model() {
        let model = |_: &str| -> Result<String, String> { panic!("model must not be called") };
        assert_eq!(generate_sql(&model, "   ").unwrap_err(), "question is empty");
    }

    #[test]
    fn test_gs004_generate_blank_reply() {
        let model = |_: &str| -> Result<String, String> { Ok("```sql\n```".into()) };
        assert_eq!(generate_sql(&model, "q").unwrap_err(), "model returned no SQL");
    }
}
