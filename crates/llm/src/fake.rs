// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scripted transport for tests.

use crate::client::LlmRequest;
use crate::error::LlmError;
use crate::transport::LlmTransport;
use async_trait::async_trait;
use parking_lot::Mutex;

enum Rule {
    /// Respond when the user prompt contains the needle.
    Match { needle: String, response: String },
    /// Respond to the next call regardless of content (consumed in order).
    Next(Result<String, String>),
}

/// A transport that answers from a script.
///
/// Two styles compose: `stub(needle, json)` installs a persistent
/// substring-matched response (for concurrent, order-free workers), and
/// `push_response`/`push_error` queue one-shot replies consumed before any
/// matching (for retry-sequence tests).
#[derive(Default)]
pub struct FakeTransport {
    rules: Mutex<Vec<Rule>>,
    calls: Mutex<Vec<LlmRequest>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Persistent response for any prompt containing `needle`.
    pub fn stub(&self, needle: impl Into<String>, response: impl Into<String>) {
        self.rules
            .lock()
            .push(Rule::Match { needle: needle.into(), response: response.into() });
    }

    /// One-shot response for the next call.
    pub fn push_response(&self, response: impl Into<String>) {
        self.rules.lock().push(Rule::Next(Ok(response.into())));
    }

    /// One-shot transport failure for the next call.
    pub fn push_error(&self, message: impl Into<String>) {
        self.rules.lock().push(Rule::Next(Err(message.into())));
    }

    /// Every request seen, in arrival order.
    pub fn calls(&self) -> Vec<LlmRequest> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

#[async_trait]
impl LlmTransport for FakeTransport {
    async fn complete(&self, request: &LlmRequest) -> Result<String, LlmError> {
        self.calls.lock().push(request.clone());

        let mut rules = self.rules.lock();
        // One-shot replies first, in queue order.
        if let Some(idx) = rules.iter().position(|r| matches!(r, Rule::Next(_))) {
            let Rule::Next(outcome) = rules.remove(idx) else { unreachable!() };
            return outcome.map_err(LlmError::Transport);
        }
        for rule in rules.iter() {
            if let Rule::Match { needle, response } = rule {
                if request.user.contains(needle.as_str()) {
                    return Ok(response.clone());
                }
            }
        }
        Err(LlmError::Transport(format!(
            "fake transport has no scripted response for: {}",
            request.user.chars().take(120).collect::<String>()
        )))
    }
}
