//! GS-002: gradesql.yaml parsing and validation.
//!
//! Structural constraints:
//! - Version must be "1.0"
//! - Database path, model name and base URL must not be empty
//! - Temperature within 0.0..=2.0, timeout and row cap non-zero

use super::types::*;
use std::path::Path;

/// Validation error.
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// Parse a gradesql.yaml file from disk.
pub fn parse_config_file(path: &Path) -> Result<GradesConfig, String> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("failed to read {}: {}", path.display(), e))?;
    parse_config(&content)
}

/// Parse a gradesql.yaml from a string.
pub fn parse_config(yaml: &str) -> Result<GradesConfig, String> {
    serde_yaml_ng::from_str(yaml).map_err(|e| format!("YAML parse error: {}", e))
}

/// Load the config at `path`, falling back to defaults when the file is absent.
pub fn load_config(path: &Path) -> Result<GradesConfig, String> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "no config file, using defaults");
        return Ok(GradesConfig::default());
    }
    parse_config_file(path)
}

/// Validate a parsed config. Returns a list of errors (empty = valid).
pub fn validate_config(config: &GradesConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if config.version != "1.0" {
        errors.push(ValidationError {
            message: format!("version must be \"1.0\", got \"{}\"", config.version),
        });
    }

    if config.database.as_os_str().is_empty() {
        errors.push(ValidationError {
            message: "database must not be empty".to_string(),
        });
    }

    let model = &config.model;
    if model.name.trim().is_empty() {
        errors.push(ValidationError {
            message: "model.name must not be empty".to_string(),
        });
    }
    if !(model.base_url.starts_with("http://") || model.base_url.starts_with("https://")) {
        errors.push(ValidationError {
            message: format!(
                "model.base_url must be an http(s) URL, got \"{}\"",
                model.base_url
            ),
        });
    }
    if model.api_key_env.trim().is_empty() {
        errors.push(ValidationError {
            message: "model.api_key_env must not be empty".to_string(),
        });
    }
    if !(0.0..=2.0).contains(&model.temperature) {
        errors.push(ValidationError {
            message: format!(
                "model.temperature must be within 0.0..=2.0, got {}",
                model.temperature
            ),
        });
    }
    if model.timeout_secs == 0 {
        errors.push(ValidationError {
            message: "model.timeout_secs must be > 0".to_string(),
        });
    }

    if config.policy.row_cap == 0 {
        errors.push(ValidationError {
            message: "policy.row_cap must be > 0".to_string(),
        });
    }

    errors
}
