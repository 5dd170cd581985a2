//! GS-010: Language model abstraction, one blocking completion per call.

pub mod openai;

use crate::core::types::ModelConfig;

/// A language model that turns one prompt into one completion.
///
/// The pipeline only ever needs a single user message per call, so the seam
/// is a plain string in, string out.
pub trait LanguageModel {
    /// Complete `prompt`, returning the model's raw text.
    fn complete(&self, prompt: &str) -> Result<String, String>;
}

impl<F> LanguageModel for F
where
    F: Fn(&str) -> Result<String, String>,
{
    fn complete(&self, prompt: &str) -> Result<String, String> {
        self(prompt)
    }
}

/// Build the configured chat model, reading the API key from the environment.
pub fn from_config(model: &ModelConfig) -> Result<openai::OpenAiChat, String> {
    let api_key = std::env::var(&model.api_key_env).map_err(|_| {
        format!(
            "environment variable {} is not set (API key for {})",
            model.api_key_env, model.base_url
        )
    })?;
    openai::OpenAiChat::new(model, api_key)
}
