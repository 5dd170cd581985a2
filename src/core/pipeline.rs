//! GS-008: The four stages driven as an explicit state machine.
//!
//! parse → validate → execute → respond → done
//!
//! Any stage error moves straight to the failure step, which writes the
//! error-flavored response. Nothing is retried.

use super::executor;
use super::responder;
use super::sqlgen;
use super::types::*;
use super::validator;
use crate::llm::LanguageModel;
use crate::trace::{hasher, RunTrace};
use std::path::PathBuf;
use std::time::Instant;

/// Prefix of every error-flavored answer.
pub const ERROR_PREFIX: &str = "Sorry, I encountered an error:";

/// Where the state machine goes next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Transition {
    Run(Stage),
    Fail,
    Done,
}

fn successor(stage: Stage) -> Transition {
    match stage {
        Stage::Parse => Transition::Run(Stage::Validate),
        Stage::Validate => Transition::Run(Stage::Execute),
        Stage::Execute => Transition::Run(Stage::Respond),
        Stage::Respond => Transition::Done,
    }
}

/// Question-answering pipeline over one grades database.
pub struct Pipeline<'a> {
    model: &'a dyn LanguageModel,
    database: PathBuf,
    row_cap: usize,
    trace_log: Option<PathBuf>,
}

impl<'a> Pipeline<'a> {
    pub fn new(model: &'a dyn LanguageModel, config: &GradesConfig) -> Self {
        Self {
            model,
            database: config.database.clone(),
            row_cap: config.policy.row_cap,
            trace_log: config.policy.trace_log.clone(),
        }
    }

    /// Run every stage for `question` and return the final state record.
    pub fn run(&self, question: &str) -> PipelineState {
        let run_start = Instant::now();
        let trace = RunTrace::new(self.trace_log.as_deref());
        trace.record(TraceEvent::RunStarted {
            run_id: trace.run_id().to_string(),
            question: question.to_string(),
            gradesql_version: env!("CARGO_PKG_VERSION").to_string(),
        });

        let mut state = PipelineState::new(question);
        let mut next = Transition::Run(Stage::Parse);
        loop {
            next = match next {
                Transition::Run(stage) => self.advance(&trace, stage, &mut state),
                Transition::Fail => {
                    if let Some(err) = &state.error {
                        state.response = Some(error_response(err));
                    }
                    Transition::Done
                }
                Transition::Done => break,
            };
        }

        trace.record(TraceEvent::RunCompleted {
            run_id: trace.run_id().to_string(),
            ok: state.error.is_none(),
            rows: state.query_result.as_ref().map_or(0, QueryResult::len),
            total_seconds: run_start.elapsed().as_secs_f64(),
        });
        state
    }

    /// Run the pipeline and return only the final answer.
    pub fn answer(&self, question: &str) -> String {
        self.run(question)
            .response
            .unwrap_or_else(|| "No response generated".to_string())
    }

    /// Run the pipeline and return every intermediate artifact.
    pub fn debug(&self, question: &str) -> DebugReport {
        DebugReport::from(self.run(question))
    }

    /// Execute one stage and pick the transition.
    fn advance(&self, trace: &RunTrace, stage: Stage, state: &mut PipelineState) -> Transition {
        let start = Instant::now();
        let outcome = match stage {
            Stage::Parse => self.parse(state),
            Stage::Validate => self.validate(state),
            Stage::Execute => self.execute(state),
            Stage::Respond => self.respond(state),
        };
        match outcome {
            Ok(()) => {
                let sql_hash = match stage {
                    Stage::Parse | Stage::Validate => {
                        state.sql_query.as_deref().map(hasher::sql_fingerprint)
                    }
                    _ => None,
                };
                trace.record(TraceEvent::StageCompleted {
                    run_id: trace.run_id().to_string(),
                    stage,
                    duration_seconds: start.elapsed().as_secs_f64(),
                    sql_hash,
                });
                successor(stage)
            }
            Err(err) => {
                tracing::info!(%stage, error = %err, "pipeline stage failed");
                trace.record(TraceEvent::StageFailed {
                    run_id: trace.run_id().to_string(),
                    stage,
                    error: err.to_string(),
                });
                state.error = Some(err);
                Transition::Fail
            }
        }
    }

    fn parse(&self, state: &mut PipelineState) -> Result<(), StageError> {
        let sql = sqlgen::generate_sql(self.model, &state.query).map_err(StageError::Parse)?;
        tracing::debug!(%sql, "generated SQL");
        state.sql_query = Some(sql);
        Ok(())
    }

    fn validate(&self, state: &mut PipelineState) -> Result<(), StageError> {
        let raw = state.sql_query.as_deref().unwrap_or_default();
        match validator::validate_sql(raw) {
            Ok(cleaned) => {
                state.sql_query = Some(cleaned);
                state.validation_result = Some(true);
                Ok(())
            }
            Err(reason) => {
                state.validation_result = Some(false);
                Err(StageError::Validation(reason))
            }
        }
    }

    fn execute(&self, state: &mut PipelineState) -> Result<(), StageError> {
        let sql = state.sql_query.as_deref().unwrap_or_default();
        let result = executor::execute_query(&self.database, sql, self.row_cap)
            .map_err(StageError::Execution)?;
        tracing::debug!(rows = result.len(), "query executed");
        state.query_result = Some(result);
        Ok(())
    }

    fn respond(&self, state: &mut PipelineState) -> Result<(), StageError> {
        let empty = QueryResult::default();
        let result = state.query_result.as_ref().unwrap_or(&empty);
        let answer = responder::generate_response(self.model, &state.query, result)
            .map_err(StageError::Response)?;
        state.response = Some(answer);
        Ok(())
    }
}

/// The answer given once any stage has failed.
pub fn error_response(err: &StageError) -> String {
    format!("{} {}", ERROR_PREFIX, err)
}
