//! Core pipeline: config, schema, the four stages and the state machine driving them.

pub mod config;
pub mod executor;
pub mod pipeline;
pub mod responder;
pub mod schema;
pub mod sqlgen;
#[cfg(test)]
pub mod testutil;
pub mod types;
pub mod validator;
