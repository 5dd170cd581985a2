//! GS-015: Per-run JSONL trace events and SQL fingerprints.

pub mod eventlog;
pub mod hasher;

use crate::core::types::TraceEvent;
use std::path::{Path, PathBuf};

/// Trace sink for a single pipeline run. Disabled when no path is configured.
#[derive(Debug, Clone)]
pub struct RunTrace {
    path: Option<PathBuf>,
    run_id: String,
}

impl RunTrace {
    pub fn new(path: Option<&Path>) -> Self {
        Self {
            path: path.map(Path::to_path_buf),
            run_id: eventlog::generate_run_id(),
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Append `event`. Trace failures never fail the run.
    pub fn record(&self, event: TraceEvent) {
        let Some(path) = &self.path else {
            return;
        };
        if let Err(e) = eventlog::append_event(path, event) {
            tracing::warn!(path = %path.display(), error = %e, "trace write failed");
        }
    }
}
