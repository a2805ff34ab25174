// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Queue and worker error types.

use trellis_core::UnknownQueue;

#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    /// The backend could not be reached within the caller's window.
    #[error("queue backend unavailable after {waited_ms}ms: {message}")]
    Unavailable { waited_ms: u64, message: String },

    #[error(transparent)]
    UnknownQueue(#[from] UnknownQueue),

    #[error("backend error: {0}")]
    Backend(String),

    #[error("job payload is not valid JSON: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("job not found: {0}")]
    JobNotFound(String),

    #[error("queue manager is shut down")]
    Shutdown,
}

impl From<redis::RedisError> for QueueError {
    fn from(e: redis::RedisError) -> Self {
        QueueError::Backend(e.to_string())
    }
}

/// Handler outcome for one job attempt.
///
/// `Retryable` counts against the job's attempts and re-queues with backoff;
/// `Fatal` skips retries entirely (invariant and security violations).
#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error("{message}")]
    Retryable { message: String, context: Option<String> },

    #[error("{message}")]
    Fatal { message: String, context: Option<String> },
}

impl WorkerError {
    pub fn retryable(message: impl Into<String>) -> Self {
        Self::Retryable { message: message.into(), context: None }
    }

    pub fn fatal(message: impl Into<String>) -> Self {
        Self::Fatal { message: message.into(), context: None }
    }

    pub fn with_context(self, context: impl Into<String>) -> Self {
        match self {
            Self::Retryable { message, .. } => {
                Self::Retryable { message, context: Some(context.into()) }
            }
            Self::Fatal { message, .. } => Self::Fatal { message, context: Some(context.into()) },
        }
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Fatal { .. })
    }

    pub fn context(&self) -> Option<&str> {
        match self {
            Self::Retryable { context, .. } | Self::Fatal { context, .. } => context.as_deref(),
        }
    }
}
