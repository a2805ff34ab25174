// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP transport to the model provider.

use crate::client::LlmRequest;
use crate::error::LlmError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One round trip to the provider: prompts in, raw text out. The client
/// layers the semaphore, timeout, and self-correction on top.
#[async_trait]
pub trait LlmTransport: Send + Sync {
    async fn complete(&self, request: &LlmRequest) -> Result<String, LlmError>;
}

#[derive(Debug, Clone)]
pub struct HttpTransportConfig {
    /// Full chat-completions endpoint URL.
    pub endpoint: String,
    pub api_key: String,
    pub model: String,
    pub max_tokens: u32,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

/// Chat-completions-shaped provider client.
pub struct HttpTransport {
    http: reqwest::Client,
    config: HttpTransportConfig,
}

impl HttpTransport {
    pub fn new(config: HttpTransportConfig) -> Self {
        Self { http: reqwest::Client::new(), config }
    }
}

#[async_trait]
impl LlmTransport for HttpTransport {
    async fn complete(&self, request: &LlmRequest) -> Result<String, LlmError> {
        let body = ChatRequest {
            model: &self.config.model,
            max_tokens: self.config.max_tokens,
            messages: vec![
                ChatMessage { role: "system", content: &request.system },
                ChatMessage { role: "user", content: &request.user },
            ],
        };

        let response = self
            .http
            .post(&self.config.endpoint)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(LlmError::Transport(format!(
                "provider returned {status}: {}",
                text.chars().take(500).collect::<String>()
            )));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Transport(format!("malformed provider envelope: {e}")))?;
        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| LlmError::Transport("provider returned no choices".to_string()))
    }
}

#[cfg(test)]
#[path = "transport_tests.rs"]
mod tests;
