//! GS-001: Shared types for config, pipeline state, stage errors and trace events.
//!
//! Configuration types derive Serialize/Deserialize for YAML roundtripping;
//! pipeline artifacts serialize to JSON for `ask --json` and the run trace.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

// ============================================================================
// Top-level gradesql.yaml
// ============================================================================

/// Root configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradesConfig {
    /// Schema version (must be "1.0")
    pub version: String,

    /// Path to the SQLite grades database
    #[serde(default = "default_database")]
    pub database: PathBuf,

    /// Language model endpoint settings
    #[serde(default)]
    pub model: ModelConfig,

    /// Execution policy
    #[serde(default)]
    pub policy: Policy,
}

impl Default for GradesConfig {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            database: default_database(),
            model: ModelConfig::default(),
            policy: Policy::default(),
        }
    }
}

fn default_database() -> PathBuf {
    PathBuf::from("student_grades.db")
}

// ============================================================================
// Model
// ============================================================================

/// OpenAI-compatible chat completion endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Model identifier sent with every request
    #[serde(default = "default_model_name")]
    pub name: String,

    /// API base URL (without the `/chat/completions` suffix)
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Sampling temperature
    #[serde(default)]
    pub temperature: f32,

    /// Per-request timeout
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            name: default_model_name(),
            base_url: default_base_url(),
            api_key_env: default_api_key_env(),
            temperature: 0.0,
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_model_name() -> String {
    "gpt-3.5-turbo".to_string()
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

// ============================================================================
// Policy
// ============================================================================

/// Execution policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Policy {
    /// Maximum rows collected by the executor
    #[serde(default = "default_row_cap")]
    pub row_cap: usize,

    /// Append a JSONL run trace to this file
    #[serde(default)]
    pub trace_log: Option<PathBuf>,
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            row_cap: default_row_cap(),
            trace_log: None,
        }
    }
}

fn default_row_cap() -> usize {
    1000
}

// ============================================================================
// Pipeline state
// ============================================================================

/// One result row, column name → value, in select-list order.
pub type Row = IndexMap<String, serde_json::Value>;

/// Rows collected by the executor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
    /// True when `row_cap` cut the result short
    #[serde(default)]
    pub truncated: bool,
}

impl QueryResult {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }
}

/// Per-invocation state record threaded through the stages.
#[derive(Debug, Clone, Default)]
pub struct PipelineState {
    /// Original natural-language question
    pub query: String,
    /// Generated SQL (cleaned by the validator on success)
    pub sql_query: Option<String>,
    /// Whether `sql_query` is acceptable to run
    pub validation_result: Option<bool>,
    /// Raw result set
    pub query_result: Option<QueryResult>,
    /// Final natural-language answer
    pub response: Option<String>,
    /// First error encountered
    pub error: Option<StageError>,
}

impl PipelineState {
    pub fn new(query: &str) -> Self {
        Self {
            query: query.to_string(),
            ..Self::default()
        }
    }
}

/// Everything a run produced, for `ask --debug` / `ask --json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebugReport {
    pub original_query: String,
    pub generated_sql: Option<String>,
    pub validation_result: Option<bool>,
    pub query_results: Option<QueryResult>,
    pub final_response: Option<String>,
    pub error: Option<String>,
}

impl From<PipelineState> for DebugReport {
    fn from(state: PipelineState) -> Self {
        Self {
            original_query: state.query,
            generated_sql: state.sql_query,
            validation_result: state.validation_result,
            query_results: state.query_result,
            final_response: state.response,
            error: state.error.map(|e| e.to_string()),
        }
    }
}

// ============================================================================
// Stages and errors
// ============================================================================

/// Pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Parse,
    Validate,
    Execute,
    Respond,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse => write!(f, "parse"),
            Self::Validate => write!(f, "validate"),
            Self::Execute => write!(f, "execute"),
            Self::Respond => write!(f, "respond"),
        }
    }
}

/// First error a stage produced. Every variant is recovered at the pipeline
/// boundary into a user-visible answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageError {
    /// The model could not produce SQL
    Parse(String),
    /// Disallowed or malformed SQL
    Validation(String),
    /// Database-level failure
    Execution(String),
    /// The model could not summarize the rows
    Response(String),
}

impl StageError {
    pub fn stage(&self) -> Stage {
        match self {
            Self::Parse(_) => Stage::Parse,
            Self::Validation(_) => Stage::Validate,
            Self::Execution(_) => Stage::Execute,
            Self::Response(_) => Stage::Respond,
        }
    }
}

impl fmt::Display for StageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse(m) => write!(f, "Error parsing query: {}", m),
            Self::Validation(m) => write!(f, "Invalid SQL: {}", m),
            Self::Execution(m) => write!(f, "Query execution error: {}", m),
            Self::Response(m) => write!(f, "Error generating response: {}", m),
        }
    }
}

impl std::error::Error for StageError {}

// ============================================================================
// Run trace events
// ============================================================================

/// Event for the JSONL run trace.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TraceEvent {
    RunStarted {
        run_id: String,
        question: String,
        gradesql_version: String,
    },
    StageCompleted {
        run_id: String,
        stage: Stage,
        duration_seconds: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        sql_hash: Option<String>,
    },
    StageFailed {
        run_id: String,
        stage: Stage,
        error: String,
    },
    RunCompleted {
        run_id: String,
        ok: bool,
        rows: usize,
        total_seconds: f64,
    },
}

/// Timestamped event wrapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimestampedEvent {
    pub ts: String,
    #[serde(flatten)]
    pub event: TraceEvent,
}

// ============================================================================
// Tests
// ============================================================================
