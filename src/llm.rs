//! Client for the LLM completion service.
//!
//! The pipeline only needs one operation: send a prompt, get text back. The
//! [`CompletionClient`] trait is the seam the classifier adapter is written
//! against; [`GroqClient`] talks to any OpenAI-compatible chat endpoint.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::LlmConfig;
use crate::error::{PipelineError, Result};

/// A single chat completion request
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    /// Fixed system role text
    pub system: String,
    /// User prompt
    pub prompt: String,
    /// Sampling temperature
    pub temperature: f32,
    /// Upper bound on generated tokens
    pub max_tokens: u32,
}

/// Text-in, text-out completion service
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Send the request and return the model's raw reply
    async fn complete(&self, request: &CompletionRequest) -> Result<String>;
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    content: Option<String>,
}

/// OpenAI-compatible chat completion client (Groq by default)
pub struct GroqClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
}

impl GroqClient {
    /// Build a client from the LLM settings
    pub fn new(config: &LlmConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(PipelineError::Config("LLM api_key is not set (GROQ_API_KEY)".to_string()));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", config.api_base.trim_end_matches('/')),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        })
    }
}

#[async_trait]
impl CompletionClient for GroqClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage { role: "system", content: &request.system },
                ChatMessage { role: "user", content: &request.prompt },
            ],
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(PipelineError::Completion(format!("service returned {status}: {detail}")));
        }

        let payload = response.text().await?;
        parse_reply(&payload)
    }
}

fn parse_reply(payload: &str) -> Result<String> {
    let response: ChatResponse = serde_json::from_str(payload)?;
    debug!(choices = response.choices.len(), "Completion received");
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .map(|content| content.trim().to_string())
        .ok_or_else(|| PipelineError::Completion("response contained no message content".to_string()))
}
