use crate::types::{AppError, Result};
use crate::utils::toml_config::LlmConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A chat message in the upstream request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Streaming chat completion request body.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
    pub n: u32,
    pub temperature: f32,
    pub stream: bool,
}

/// Client for an OpenAI-compatible chat completions endpoint.
///
/// Only the streaming form of the call is used. The async variant serves
/// code on the runtime; the blocking variant serves detached worker threads
/// and must never be called from async code.
#[derive(Debug, Clone)]
pub struct GenerativeClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
    max_tokens: u32,
    temperature: f32,
    timeout: Duration,
}

impl GenerativeClient {
    pub fn new(config: &LlmConfig, api_key: Option<String>) -> Result<Self> {
        let timeout = Duration::from_secs(config.request_timeout_secs);
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            timeout,
        })
    }

    /// Build a client from config, reading the key from its environment variable.
    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        Self::new(config, config.api_key())
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    pub fn chat_request(&self, system: &str, user: &str) -> ChatRequest {
        ChatRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage::system(system), ChatMessage::user(user)],
            max_tokens: self.max_tokens,
            n: 1,
            temperature: self.temperature,
            stream: true,
        }
    }

    /// Start a streaming completion.
    ///
    /// Fails with [`AppError::UpstreamCallFailed`] when the service answers
    /// with a non-success status; the body is then read in full for the error.
    pub async fn open_stream(&self, system: &str, user: &str) -> Result<reqwest::Response> {
        let mut request = self
            .http
            .post(self.endpoint())
            .json(&self.chat_request(system, user));
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::UpstreamCallFailed {
                status: status.as_u16(),
                body,
            });
        }

        tracing::debug!(model = %self.model, "upstream stream opened");
        Ok(response)
    }

    /// Blocking counterpart of [`open_stream`](Self::open_stream).
    pub fn open_stream_blocking(
        &self,
        system: &str,
        user: &str,
    ) -> Result<reqwest::blocking::Response> {
        let http = reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .build()?;

        let mut request = http.post(self.endpoint()).json(&self.chat_request(system, user));
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send()?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(AppError::UpstreamCallFailed {
                status: status.as_u16(),
                body,
            });
        }

        tracing::debug!(model = %self.model, "upstream stream opened (blocking)");
        Ok(response)
    }
}
