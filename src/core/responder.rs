//! GS-007: Responder stage, rows to natural-language answer.

use super::types::QueryResult;
use crate::llm::LanguageModel;

/// Answer given when the query matched nothing. The model is not consulted.
pub const NO_RESULTS: &str = "No results found for your query.";

/// Build the summarization prompt.
pub fn build_prompt(question: &str, result: &QueryResult) -> Result<String, String> {
    let rows = serde_json::to_string(&result.rows)
        .map_err(|e| format!("cannot render rows: {}", e))?;
    let note = if result.truncated {
        format!(
            "\nNote: only the first {} rows are shown; say that the list may be incomplete.\n",
            result.len()
        )
    } else {
        String::new()
    };
    Ok(format!(
        "Convert the following SQL query results into a natural, human-readable response.

Original Question: {question}
SQL Results: {rows}
{note}
Provide a clear, conversational response that directly answers the user's question.
Use only the values present in the results.
If there are multiple results, format them in a readable way.

Response:",
        question = question.trim(),
    ))
}

/// Produce the final answer for `question` from `result`.
pub fn generate_response(
    model: &dyn LanguageModel,
    question: &str,
    result: &QueryResult,
) -> Result<String, String> {
    if result.is_empty() {
        return Ok(NO_RESULTS.to_string());
    }
    let prompt = build_prompt(question, result)?;
    let reply = model.complete(&prompt)?;
    let answer = reply.trim().trim_start_matches("Response:").trim();
    if answer.is_empty() {
        return Err("model returned an empty answer".to_string());
    }
    Ok(answer.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Row;
    use serde_json::json;

    fn alice_rows() -> QueryResult {
        let mut rows = Vec::new();
        for (subject, grade) in [("Math", 85), ("Science", 78), ("English", 92)] {
            let mut r = Row::new();
            r.insert("subject".into(), json!(subject));
            r.insert("grade".into(), json!(grade));
            rows.push(r);
        }
        QueryResult {
            columns: vec!["subject".into(), "grade".into()],
            rows,
            truncated: false,
        }
    }

    #[test]
    fn test_gs007_prompt_contains_rows() {
        let p = build_prompt("What grades did Alice get?", &alice_rows()).unwrap();
        assert!(p.contains("Original Question: What grades did Alice get?"));
        assert!(p.contains(r#"{"subject":"Math","grade":85}"#));
        assert!(!p.contains("incomplete"));
    }

    #[test]
    fn test_gs007_prompt_mentions_truncation() {
        let mut result = alice_rows();
        result.truncated = true;
        let p = build_prompt("q", &result).unwrap();
        assert!(p.contains("only the first 3 rows"));
    }

    #[test]
    fn test_gs007_empty_rows_skip_model() {
        let model = |_: &str| -> Result<String, String> { panic!("model must not be called") };
        let answer = generate_response(&model, "Show me students named XYZ", &QueryResult::default())
            .unwrap();
        assert_eq!(answer, NO_RESULTS);
        assert!(!answer.chars().any(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_gs007_model_answer_trimmed() {
        let model = |_: &str| -> Result<String, String> {
            Ok("Response: Alice got 85 in Math.\n".into())
        };
        let answer = generate_response(&model, "q", &alice_rows()).unwrap();
        assert_eq!(answer, "Alice got 85 in Math.");
    }

    #[test]
    fn test_gs007_model_error() {
        let model = |_: &str| -> Result<String, String> { Err("status 500".into()) };
        assert_eq!(
            generate_response(&model, "q", &alice_rows()).unwrap_err(),
            "status 500"
        );
    }

    #[test]
    fn test_gs007_blank_answer_is_error() {
        let model = |_: &str| -> Result<String, String> { Ok("  ".into()) };
        assert!(generate_response(&model, "q", &alice_rows()).is_err());
    }
}
