//! Groq LLM client implementation
//!
//! Groq exposes an OpenAI-compatible chat-completions endpoint, so the
//! client speaks that wire format directly over reqwest.

use crate::llm::client::LlmClient;
use crate::types::{AppError, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

const DEFAULT_API_BASE: &str = "https://api.groq.com/openai/v1";

/// Sampling parameters tuned for research prompts.
const TEMPERATURE: f32 = 0.7;
const MAX_TOKENS: u32 = 2048;

/// Groq API client for hosted LLM inference
pub struct GroqClient {
    http: reqwest::Client,
    api_base: String,
    api_key: String,
    model: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

impl GroqClient {
    /// Create a new client against the public Groq endpoint
    pub fn new(api_key: String, model: String) -> Self {
        Self::with_api_base(api_key, model, DEFAULT_API_BASE.to_string())
    }

    /// Create a client against a custom endpoint (used by tests)
    pub fn with_api_base(api_key: String, model: String, api_base: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base: api_base.trim_end_matches('/').to_string(),
            api_key,
            model,
        }
    }
}

#[async_trait]
impl LlmClient for GroqClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let body = json!({
            "model": self.model,
            "messages": [{"role": "user", "content": prompt}],
            "temperature": TEMPERATURE,
            "max_tokens": MAX_TOKENS,
        });

        let response = self
            .http
            .post(format!("{}/chat/completions", self.api_base))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Llm(format!("Groq request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(AppError::Llm(format!(
                "Groq returned {}: {}",
                status, detail
            )));
        }

        let completion: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| AppError::Llm(format!("Invalid Groq response: {}", e)))?;

        completion
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| AppError::Llm("Groq response contained no choices".to_string()))
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
