//! GS-017: CLI subcommands (init, ask, repl, check, schema).

use crate::core::pipeline::Pipeline;
use crate::core::{config, schema, types, validator};
use crate::llm;
use clap::Subcommand;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write a template gradesql.yaml
    Init {
        /// Directory to initialize (default: current)
        #[arg(default_value = ".")]
        path: PathBuf,
    },

    /// Answer one question about the grades table
    Ask {
        /// The question, in plain English
        question: String,

        /// Show generated SQL, validation verdict and rows
        #[arg(long)]
        debug: bool,

        /// Print the full run report as JSON
        #[arg(long, conflicts_with = "debug")]
        json: bool,
    },

    /// Interactive question loop (quit, exit or q to leave)
    Repl,

    /// Run the SQL validator on a statement without executing it
    Check {
        /// SQL statement to check
        sql: String,
    },

    /// Print the table schema given to the model
    Schema,
}

/// Options shared by every subcommand.
#[derive(Debug, Clone)]
pub struct GlobalOpts {
    /// Path to gradesql.yaml (optional; defaults apply when absent)
    pub config: PathBuf,
    /// Database path override
    pub db: Option<PathBuf>,
}

/// Dispatch a CLI command.
pub fn dispatch(cmd: Commands, opts: &GlobalOpts) -> Result<(), String> {
    match cmd {
        Commands::Init { path } => cmd_init(&path),
        Commands::Ask {
            question,
            debug,
            json,
        } => cmd_ask(opts, &question, debug, json),
        Commands::Repl => cmd_repl(opts),
        Commands::Check { sql } => cmd_check(&sql, &mut std::io::stdout()),
        Commands::Schema => {
            println!("{}", schema::SCHEMA_DESCRIPTION);
            Ok(())
        }
    }
}

fn cmd_init(path: &Path) -> Result<(), String> {
    let config_path = path.join("gradesql.yaml");
    if config_path.exists() {
        return Err(format!("{} already exists", config_path.display()));
    }
    std::fs::create_dir_all(path)
        .map_err(|e| format!("cannot create {}: {}", path.display(), e))?;

    let template = r#"version: "1.0"
database: student_grades.db

model:
  name: gpt-3.5-turbo
  base_url: https://api.openai.com/v1
  api_key_env: OPENAI_API_KEY
  temperature: 0.0
  timeout_secs: 30

policy:
  row_cap: 1000
  # trace_log: gradesql-trace.jsonl
"#;
    std::fs::write(&config_path, template)
        .map_err(|e| format!("cannot write {}: {}", config_path.display(), e))?;

    println!("Initialized gradesql at {}", path.display());
    println!("  Created: {}", config_path.display());
    Ok(())
}

/// Load, validate and apply overrides to the config.
fn load_settings(opts: &GlobalOpts) -> Result<types::GradesConfig, String> {
    let mut cfg = config::load_config(&opts.config)?;
    if let Some(db) = &opts.db {
        cfg.database.clone_from(db);
    }
    let errors = config::validate_config(&cfg);
    if errors.is_empty() {
        return Ok(cfg);
    }
    for e in &errors {
        eprintln!("  ERROR: {}", e);
    }
    Err(format!("{} config error(s) in {}", errors.len(), opts.config.display()))
}

fn cmd_ask(opts: &GlobalOpts, question: &str, debug: bool, json: bool) -> Result<(), String> {
    let cfg = load_settings(opts)?;
    let model = llm::from_config(&cfg.model)?;
    let pipeline = Pipeline::new(&model, &cfg);
    ask_with(&pipeline, question, debug, json, &mut std::io::stdout())
}

/// Run one question and write the answer (or report) to `out`.
fn ask_with(
    pipeline: &Pipeline,
    question: &str,
    debug: bool,
    json: bool,
    out: &mut dyn Write,
) -> Result<(), String> {
    let report = pipeline.debug(question);
    if json {
        let text = serde_json::to_string_pretty(&report)
            .map_err(|e| format!("JSON serialize error: {}", e))?;
        return emit(out, &text);
    }
    if debug {
        print_debug(&report, out)?;
        return Ok(());
    }
    let answer = report
        .final_response
        .unwrap_or_else(|| "No response generated".to_string());
    emit(out, &answer)
}

/// Display a run report.
fn print_debug(report: &types::DebugReport, out: &mut dyn Write) -> Result<(), String> {
    let sql = report.generated_sql.as_deref().unwrap_or("-");
    let verdict = match report.validation_result {
        Some(true) => "valid",
        Some(false) => "INVALID",
        None => "not run",
    };
    emit(out, &format!("Question:      {}", report.original_query))?;
    emit(out, &format!("Generated SQL: {}", sql))?;
    emit(out, &format!("Validation:    {}", verdict))?;
    match (&report.error, &report.query_results) {
        (Some(e), _) => emit(out, &format!("Error:         {}", e))?,
        (None, Some(r)) => {
            let more = if r.truncated { " (truncated)" } else { "" };
            emit(out, &format!("Rows:          {}{}", r.len(), more))?;
            for row in &r.rows {
                let row = serde_json::to_string(row)
                    .map_err(|e| format!("JSON serialize error: {}", e))?;
                emit(out, &format!("  {}", row))?;
            }
        }
        (None, None) => {}
    }
    let response = report.final_response.as_deref().unwrap_or("-");
    emit(out, &format!("Response:      {}", response))
}

fn emit(out: &mut dyn Write, line: &str) -> Result<(), String> {
    writeln!(out, "{}", line).map_err(|e| format!("write error: {}", e))
}

fn cmd_repl(opts: &GlobalOpts) -> Result<(), String> {
    let cfg = load_settings(opts)?;
    let model = llm::from_config(&cfg.model)?;
    let pipeline = Pipeline::new(&model, &cfg);
    let stdin = std::io::stdin();
    repl_loop(&pipeline, stdin.lock(), &mut std::io::stdout())
}

/// Read questions line by line until EOF or a quit word.
fn repl_loop(pipeline: &Pipeline, input: impl BufRead, out: &mut dyn Write) -> Result<(), String> {
    let io_err = |e: std::io::Error| format!("io error: {}", e);
    writeln!(out, "Ask about student grades. Type 'quit' to exit.").map_err(io_err)?;
    write!(out, "> ").map_err(io_err)?;
    out.flush().map_err(io_err)?;

    for line in input.lines() {
        let line = line.map_err(io_err)?;
        let question = line.trim();
        if matches!(question.to_lowercase().as_str(), "quit" | "exit" | "q") {
            break;
        }
        if !question.is_empty() {
            writeln!(out, "{}", pipeline.answer(question)).map_err(io_err)?;
        }
        write!(out, "> ").map_err(io_err)?;
        out.flush().map_err(io_err)?;
    }
    writeln!(out, "Goodbye!").map_err(io_err)
}

fn cmd_check(sql: &str, out: &mut dyn Write) -> Result<(), String> {
    match validator::validate_sql(sql) {
        Ok(cleaned) => emit(out, &format!("OK: {}", cleaned)),
        Err(reason) => Err(format!("rejected: {}", reason)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::testutil;
    use crate::core::types::GradesConfig;

    fn echo_model(sql: &'static str) -> impl Fn(&str) -> Result<String, String> {
        move |prompt: &str| -> Result<String, String> {
            if prompt.trim_end().ends_with("SQL Query:") {
                Ok(sql.to_string())
            } else {
                let rows = prompt
                    .lines()
                    .find_map(|l| l.strip_prefix("SQL Results: "))
                    .unwrap_or("");
                Ok(format!("Answer: {}", rows))
            }
        }
    }

    fn config_for(db: &Path) -> GradesConfig {
        GradesConfig {
            database: db.to_path_buf(),
            ..GradesConfig::default()
        }
    }

    #[test]
    fn test_gs017_init() {
        let dir = tempfile::tempdir().unwrap();
        let sub = dir.path().join("project");
        cmd_init(&sub).unwrap();
        let written = sub.join("gradesql.yaml");
        assert!(written.exists());
        let cfg = config::parse_config_file(&written).unwrap();
        assert!(config::validate_config(&cfg).is_empty());
    }

    #[test]
    fn test_gs017_init_already_exists() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("gradesql.yaml"), "exists").unwrap();
        assert!(cmd_init(dir.path()).is_err());
    }

    #[test]
    fn test_gs017_load_settings_db_override() {
        let dir = tempfile::tempdir().unwrap();
        let opts = GlobalOpts {
            config: dir.path().join("missing.yaml"),
            db: Some(PathBuf::from("/data/other.db")),
        };
        let cfg = load_settings(&opts).unwrap();
        assert_eq!(cfg.database, PathBuf::from("/data/other.db"));
    }

    #[test]
    fn test_gs017_load_settings_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gradesql.yaml");
        std::fs::write(&path, "version: \"9\"\npolicy:\n  row_cap: 0\n").unwrap();
        let opts = GlobalOpts {
            config: path,
            db: None,
        };
        let err = load_settings(&opts).unwrap_err();
        assert!(err.starts_with("2 config error(s)"));
    }

    #[test]
    fn test_gs017_ask_plain() {
        let (_dir, db) = testutil::seeded_db();
        let model = echo_model("SELECT grade FROM students WHERE name = 'Bob' AND subject = 'Math'");
        let cfg = config_for(&db);
        let pipeline = Pipeline::new(&model, &cfg);
        let mut out = Vec::new();
        ask_with(&pipeline, "Bob's math grade?", false, false, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.trim(), r#"Answer: [{"grade":92}]"#);
    }

    #[test]
    fn test_gs017_ask_debug() {
        let (_dir, db) = testutil::seeded_db();
        let model = echo_model("SELECT name FROM students WHERE grade > 93 ORDER BY name");
        let cfg = config_for(&db);
        let pipeline = Pipeline::new(&model, &cfg);
        let mut out = Vec::new();
        ask_with(&pipeline, "List all students who got above 93", true, false, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Generated SQL: SELECT name FROM students WHERE grade > 93"));
        assert!(text.contains("Validation:    valid"));
        assert!(text.contains("Rows:          3"));
        assert!(text.contains(r#"{"name":"Charlie"}"#));
        assert!(text.contains("Response:"));
    }

    #[test]
    fn test_gs017_ask_debug_error() {
        let (_dir, db) = testutil::seeded_db();
        let model = echo_model("DROP TABLE students");
        let cfg = config_for(&db);
        let pipeline = Pipeline::new(&model, &cfg);
        let mut out = Vec::new();
        ask_with(&pipeline, "drop it", true, false, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Validation:    INVALID"));
        assert!(text.contains("Error:         Invalid SQL: Dangerous SQL keyword 'DROP' detected"));
        assert!(text.contains("Response:      Sorry, I encountered an error:"));
    }

    #[test]
    fn test_gs017_ask_json() {
        let (_dir, db) = testutil::seeded_db();
        let model = echo_model("SELECT DISTINCT subject FROM students ORDER BY subject");
        let cfg = config_for(&db);
        let pipeline = Pipeline::new(&model, &cfg);
        let mut out = Vec::new();
        ask_with(&pipeline, "What subjects are available?", false, true, &mut out).unwrap();
        let report: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(report["original_query"], "What subjects are available?");
        assert_eq!(report["validation_result"], true);
        assert_eq!(report["query_results"]["rows"].as_array().unwrap().len(), 3);
        assert_eq!(report["query_results"]["rows"][0]["subject"], "English");
        assert!(report["error"].is_null());
    }

    #[test]
    fn test_gs017_repl_loop() {
        let (_dir, db) = testutil::seeded_db();
        let model = echo_model("SELECT COUNT(*) AS n FROM students");
        let cfg = config_for(&db);
        let pipeline = Pipeline::new(&model, &cfg);
        let input = b"How many grades?\n\n   \nQUIT\nnever asked\n" as &[u8];
        let mut out = Vec::new();
        repl_loop(&pipeline, input, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.matches("Answer:").count(), 1);
        assert!(text.contains(r#"[{"n":24}]"#));
        assert!(text.trim_end().ends_with("Goodbye!"));
    }

    #[test]
    fn test_gs017_repl_eof() {
        let (_dir, db) = testutil::seeded_db();
        let model = echo_model("SELECT 1");
        let cfg = config_for(&db);
        let pipeline = Pipeline::new(&model, &cfg);
        let mut out = Vec::new();
        repl_loop(&pipeline, &b""[..], &mut out).unwrap();
        assert!(String::from_utf8(out).unwrap().contains("Goodbye!"));
    }

    #[test]
    fn test_gs017_check_ok() {
        let mut out = Vec::new();
        cmd_check("SELECT * FROM students;", &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "OK: SELECT * FROM students\n");
    }

    #[test]
    fn test_gs017_check_rejected() {
        let mut out = Vec::new();
        let err = cmd_check("DELETE FROM students", &mut out).unwrap_err();
        assert_eq!(err, "rejected: Dangerous SQL keyword 'DELETE' detected");
        assert!(out.is_empty());
    }

    #[test]
    fn test_gs017_dispatch_init() {
        let dir = tempfile::tempdir().unwrap();
        let opts = GlobalOpts {
            config: PathBuf::from("gradesql.yaml"),
            db: None,
        };
        dispatch(
            Commands::Init {
                path: dir.path().to_path_buf(),
            },
            &opts,
        )
        .unwrap();
        assert!(dir.path().join("gradesql.yaml").exists());
    }

    #[test]
    fn test_gs017_dispatch_schema() {
        let opts = GlobalOpts {
            config: PathBuf::from("gradesql.yaml"),
            db: None,
        };
        dispatch(Commands::Schema, &opts).unwrap();
    }

    #[test]
    fn test_gs017_dispatch_ask_without_api_key() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gradesql.yaml");
        std::fs::write(
            &path,
            "version: \"1.0\"\nmodel:\n  api_key_env: GRADESQL_TEST_KEY_THAT_IS_NEVER_SET\n",
        )
        .unwrap();
        let opts = GlobalOpts {
            config: path,
            db: None,
        };
        let err = dispatch(
            Commands::Ask {
                question: "anything".into(),
                debug: false,
                json: false,
            },
            &opts,
        )
        .unwrap_err();
        assert!(err.contains("GRADESQL_TEST_KEY_THAT_IS_NEVER_SET"));
    }
}
