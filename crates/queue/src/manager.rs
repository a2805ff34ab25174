// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The queue manager: the single gateway to the queue backend.

use crate::backend::Backend;
use crate::error::QueueError;
use crate::flow::JobTree;
use crate::job::QueuedJob;
use crate::options::JobOptions;
use crate::worker::{self, JobHandler, WorkerConfig, WorkerHandle};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use trellis_core::{JobId, JobPayload, QueueConfig, QueueName};

/// Process-wide queue gateway. Constructed once in `main`, passed down by
/// reference, torn down on shutdown signal.
pub struct QueueManager {
    backend: Arc<dyn Backend>,
    default_opts: JobOptions,
    config: QueueConfig,
    cancel: CancellationToken,
    workers: Mutex<Vec<WorkerHandle>>,
}

impl QueueManager {
    pub fn new(backend: Arc<dyn Backend>, config: QueueConfig) -> Self {
        let default_opts = JobOptions {
            attempts: config.default_attempts,
            ..JobOptions::default()
        };
        Self {
            backend,
            default_opts,
            config,
            cancel: CancellationToken::new(),
            workers: Mutex::new(Vec::new()),
        }
    }

    /// Resolve a queue handle by name. Unknown names are rejected — this is
    /// the allow-list gate for any externally-supplied queue name.
    pub fn queue(&self, name: &str) -> Result<QueueName, QueueError> {
        Ok(name.parse::<QueueName>()?)
    }

    pub fn backend(&self) -> &Arc<dyn Backend> {
        &self.backend
    }

    pub fn default_opts(&self) -> JobOptions {
        self.default_opts
    }

    /// Whether the backend supports native parent/child dependencies.
    pub fn supports_flows(&self) -> bool {
        self.backend.supports_flows()
    }

    /// Enqueue a payload on its own queue with the default options.
    pub async fn enqueue(&self, payload: JobPayload) -> Result<JobId, QueueError> {
        let job = QueuedJob::new(payload, self.default_opts);
        let id = job.id;
        self.backend.enqueue(&job).await?;
        Ok(id)
    }

    /// Enqueue a pre-built job (custom state, options, or parent links).
    pub async fn enqueue_job(&self, job: &QueuedJob) -> Result<(), QueueError> {
        self.backend.enqueue(job).await
    }

    /// Enqueue a whole job tree, parents first. On any failure the jobs
    /// created so far are rolled back and the error is returned.
    pub async fn enqueue_tree(&self, tree: &JobTree) -> Result<(), QueueError> {
        let mut created: Vec<JobId> = Vec::with_capacity(tree.ids().len());
        for job in tree.jobs() {
            match self.backend.enqueue(job).await {
                Ok(()) => created.push(job.id),
                Err(e) => {
                    tracing::error!(error = %e, created = created.len(), "job tree enqueue failed, rolling back");
                    self.backend.remove_waiting(&created).await?;
                    return Err(e);
                }
            }
        }
        Ok(())
    }

    /// Spawn a consumer group on `queue` with the given concurrency.
    pub fn spawn_worker(
        &self,
        queue: QueueName,
        concurrency: usize,
        handler: Arc<dyn JobHandler>,
    ) {
        let handle = worker::spawn(
            Arc::clone(&self.backend),
            handler,
            WorkerConfig {
                queue,
                concurrency,
                lock_ms: self.config.lock_duration_ms,
                stalled_interval_ms: self.config.stalled_interval_ms,
            },
            &self.cancel,
        );
        self.workers.lock().push(handle);
    }

    // --- cache primitives, shared with the validation and aggregation
    // workers ---

    pub async fn set_counter(&self, key: &str, value: i64) -> Result<(), QueueError> {
        self.backend.set_counter(key, value).await
    }

    pub async fn decrement_counter(&self, key: &str) -> Result<i64, QueueError> {
        self.backend.decrement_counter(key).await
    }

    pub async fn set_flag_nx(&self, key: &str) -> Result<bool, QueueError> {
        self.backend.set_flag_nx(key).await
    }

    /// Remove not-yet-started jobs (run cancellation).
    pub async fn remove_waiting(&self, ids: &[JobId]) -> Result<(), QueueError> {
        self.backend.remove_waiting(ids).await
    }

    pub async fn job(&self, id: JobId) -> Result<Option<QueuedJob>, QueueError> {
        self.backend.job(id).await
    }

    pub async fn depth(&self, queue: QueueName) -> Result<u64, QueueError> {
        self.backend.depth(queue).await
    }

    /// Graceful shutdown: stop consumers (draining in-flight jobs within the
    /// grace window), then close the backend connection.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        let workers: Vec<WorkerHandle> = std::mem::take(&mut *self.workers.lock());
        let grace = Duration::from_millis(self.config.shutdown_grace_ms);
        let drain = async {
            for handle in workers {
                handle.drain().await;
            }
        };
        if tokio::time::timeout(grace, drain).await.is_err() {
            tracing::warn!(grace_ms = self.config.shutdown_grace_ms, "shutdown grace expired, forcing close");
        }
        if let Err(e) = self.backend.close().await {
            tracing::warn!(error = %e, "backend close failed");
        }
    }
}

#[cfg(test)]
#[path = "manager_tests.rs"]
mod tests;
