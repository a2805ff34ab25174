// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! LLM client errors and schema diagnostics.

/// What the validator found wrong with a response. Fed verbatim into the
/// correction prompt so the model can fix its own output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaDiagnostic {
    pub issues: Vec<String>,
}

impl SchemaDiagnostic {
    pub fn new(issue: impl Into<String>) -> Self {
        Self { issues: vec![issue.into()] }
    }

    pub fn push(&mut self, issue: impl Into<String>) {
        self.issues.push(issue.into());
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }
}

impl std::fmt::Display for SchemaDiagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, issue) in self.issues.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "- {issue}")?;
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("call timed out after {elapsed_ms}ms")]
    Timeout { elapsed_ms: u64 },

    #[error("response failed schema validation:\n{diagnostic}")]
    Schema { diagnostic: SchemaDiagnostic, response: String },

    #[error("gave up after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: Box<LlmError> },

    #[error("client is shutting down")]
    Shutdown,
}

impl LlmError {
    /// Permanent errors go to the dead-letter queue without queue-level
    /// retries; transient ones are retried by the queue.
    pub fn is_permanent(&self) -> bool {
        match self {
            LlmError::Schema { .. } => true,
            LlmError::Exhausted { last, .. } => last.is_permanent(),
            _ => false,
        }
    }
}
