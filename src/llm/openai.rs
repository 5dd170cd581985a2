//! GS-011: OpenAI-compatible chat completion client (blocking).
//!
//! Request: `POST {base_url}/chat/completions`
//! `{ "model": ..., "temperature": ..., "messages": [{"role": "user", "content": ...}] }`
//!
//! Response: the completion text is `choices[0].message.content`.

use super::LanguageModel;
use crate::core::types::ModelConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Chat completion client for one model.
#[derive(Debug, Clone)]
pub struct OpenAiChat {
    endpoint: String,
    model: String,
    temperature: f32,
    api_key: String,
    client: reqwest::blocking::Client,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    messages: [Message<'a>; 1],
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAiChat {
    pub fn new(cfg: &ModelConfig, api_key: String) -> Result<Self, String> {
        if cfg.timeout_secs == 0 {
            return Err("model timeout must be > 0 seconds".to_string());
        }
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()
            .map_err(|e| format!("http client build failed: {}", e))?;
        Ok(Self {
            endpoint: chat_endpoint(&cfg.base_url),
            model: cfg.name.clone(),
            temperature: cfg.temperature,
            api_key,
            client,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl LanguageModel for OpenAiChat {
    fn complete(&self, prompt: &str) -> Result<String, String> {
        let body = ChatRequest {
            model: &self.model,
            temperature: self.temperature,
            messages: [Message {
                role: "user",
                content: prompt,
            }],
        };
        tracing::debug!(endpoint = %self.endpoint, model = %self.model, "chat completion request");

        let resp = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .map_err(|e| format!("model request failed: {}", e))?;
        let status = resp.status();
        if !status.is_success() {
            let detail = resp.text().unwrap_or_default();
            return Err(format!(
                "model request failed: status {}: {}",
                status,
                detail.trim()
            ));
        }
        let raw: serde_json::Value = resp
            .json()
            .map_err(|e| format!("invalid model response JSON: {}", e))?;
        extract_content(raw)
    }
}

/// Join the base URL and the chat completions path.
fn chat_endpoint(base_url: &str) -> String {
    format!("{}/chat/completions", base_url.trim_end_matches('/'))
}

/// Pull `choices[0].message.content` out of a response body.
fn extract_content(raw: serde_json::Value) -> Result<String, String> {
    let parsed: ChatResponse = serde_json::from_value(raw)
        .map_err(|e| format!("unexpected model response shape: {}", e))?;
    parsed
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| "model returned no content".to_string())
}
