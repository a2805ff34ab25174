// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pipeline error type and its mapping onto worker outcomes.

use trellis_llm::LlmError;
use trellis_queue::WorkerError;

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Storage(#[from] trellis_storage::StorageError),

    #[error(transparent)]
    Queue(#[from] trellis_queue::QueueError),

    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error(transparent)]
    Graph(#[from] trellis_graph::GraphError),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),

    #[error("io error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Path escapes the run's target root. Rejected without retry.
    #[error("path traversal rejected: {path} is outside {root}")]
    PathTraversal { path: String, root: String },

    #[error("run failed: {0}")]
    RunFailed(String),

    /// Upstream state is not settled yet; the queue retries with backoff.
    #[error("not ready: {0}")]
    NotReady(String),
}

impl PipelineError {
    /// Convert into the queue-level outcome: security and invariant
    /// violations and permanent LLM failures skip retries; everything else
    /// is transient I/O.
    pub fn into_worker_error(self) -> WorkerError {
        match &self {
            PipelineError::PathTraversal { .. } => {
                tracing::error!(security = true, error = %self, "security violation");
                WorkerError::fatal(self.to_string())
            }
            PipelineError::Storage(trellis_storage::StorageError::QualifiedNameConflict {
                ..
            }) => WorkerError::fatal(self.to_string()),
            PipelineError::Llm(e) if e.is_permanent() => {
                WorkerError::fatal(self.to_string()).with_context("llm schema exhausted")
            }
            _ => WorkerError::retryable(self.to_string()),
        }
    }
}
