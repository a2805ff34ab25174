// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The bounded, self-correcting client.

use crate::error::{LlmError, SchemaDiagnostic};
use crate::prompts::correction_prompt;
use crate::sanitize::sanitize_json;
use crate::schema::Validate;
use crate::transport::LlmTransport;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use trellis_core::LlmConfig;

/// System + user prompt pair.
#[derive(Debug, Clone, PartialEq)]
pub struct LlmRequest {
    pub system: String,
    pub user: String,
}

/// Process-wide LLM gateway. One semaphore of `llm.concurrency` permits
/// gates every outbound call; waiters queue FIFO on the semaphore.
pub struct LlmClient {
    transport: Arc<dyn LlmTransport>,
    semaphore: Arc<Semaphore>,
    config: LlmConfig,
}

impl LlmClient {
    pub fn new(transport: Arc<dyn LlmTransport>, config: LlmConfig) -> Self {
        let semaphore = Arc::new(Semaphore::new(config.concurrency.max(1)));
        Self { transport, semaphore, config }
    }

    pub fn config(&self) -> &LlmConfig {
        &self.config
    }

    /// Call the model and parse + validate the response as `T`.
    ///
    /// A bounded loop: schema failures build a correction prompt embedding
    /// the original request, the offending response, and the validator's
    /// findings; transient transport failures retry the original prompt.
    /// Backoff sleeps happen with no permit held.
    pub async fn extract<T>(&self, request: LlmRequest) -> Result<T, LlmError>
    where
        T: DeserializeOwned + Validate,
    {
        let mut prompt = request.clone();
        let mut last_error: Option<LlmError> = None;

        for attempt in 1..=self.config.max_attempts.max(1) {
            if attempt > 1 {
                tokio::time::sleep(self.backoff_delay(attempt - 1)).await;
            }

            match self.call(&prompt).await {
                Ok(raw) => match parse_validated::<T>(&raw) {
                    Ok(value) => return Ok(value),
                    Err(diagnostic) => {
                        tracing::warn!(
                            attempt,
                            issues = diagnostic.issues.len(),
                            "response failed validation, building correction prompt"
                        );
                        prompt = correction_prompt(&request, &raw, &diagnostic.to_string());
                        last_error = Some(LlmError::Schema { diagnostic, response: raw });
                    }
                },
                Err(e) => {
                    tracing::warn!(attempt, error = %e, "llm call failed");
                    last_error = Some(e);
                    // Transport errors retry the original, not a correction.
                    prompt = request.clone();
                }
            }
        }

        Err(LlmError::Exhausted {
            attempts: self.config.max_attempts.max(1),
            last: Box::new(last_error.unwrap_or(LlmError::Transport("no attempts made".into()))),
        })
    }

    /// One gated call: acquire → call (with hard timeout) → release. The
    /// permit is dropped before the caller sleeps out any backoff.
    async fn call(&self, request: &LlmRequest) -> Result<String, LlmError> {
        let permit = Arc::clone(&self.semaphore)
            .acquire_owned()
            .await
            .map_err(|_| LlmError::Shutdown)?;

        let timeout = Duration::from_millis(self.config.timeout_ms.max(1));
        let result = tokio::time::timeout(timeout, self.transport.complete(request)).await;
        drop(permit);

        match result {
            Ok(inner) => inner,
            Err(_) => Err(LlmError::Timeout { elapsed_ms: self.config.timeout_ms }),
        }
    }

    fn backoff_delay(&self, failures: u32) -> Duration {
        let exp = failures.saturating_sub(1).min(32);
        let raw = self.config.backoff_initial_ms as f64 * self.config.backoff_factor.powi(exp as i32);
        let capped = raw.min(self.config.backoff_cap_ms as f64);
        Duration::from_millis(capped as u64)
    }
}

fn parse_validated<T>(raw: &str) -> Result<T, SchemaDiagnostic>
where
    T: DeserializeOwned + Validate,
{
    let cleaned = sanitize_json(raw);
    let value: T = serde_json::from_str(cleaned)
        .map_err(|e| SchemaDiagnostic::new(format!("not valid JSON for the schema: {e}")))?;
    value.validate()?;
    Ok(value)
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
