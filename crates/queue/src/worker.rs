// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker loops: reserve, handle, ack/retry/dead-letter.

use crate::backend::Backend;
use crate::error::{QueueError, WorkerError};
use crate::job::QueuedJob;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use trellis_core::{JobPayload, QueueName};

/// How long an idle consumer sleeps before polling again.
const IDLE_POLL: Duration = Duration::from_millis(50);

/// One job-processing callback.
#[async_trait]
pub trait JobHandler: Send + Sync + 'static {
    async fn handle(&self, job: &QueuedJob) -> Result<(), WorkerError>;
}

/// A running consumer group for one queue.
pub struct WorkerHandle {
    queue: QueueName,
    cancel: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl WorkerHandle {
    pub fn queue(&self) -> QueueName {
        self.queue
    }

    /// Signal shutdown and wait for in-flight jobs to finish.
    pub async fn drain(mut self) {
        self.cancel.cancel();
        for task in self.tasks.drain(..) {
            let _ = task.await;
        }
    }
}

pub(crate) struct WorkerConfig {
    pub queue: QueueName,
    pub concurrency: usize,
    pub lock_ms: u64,
    pub stalled_interval_ms: u64,
}

/// Spawn `concurrency` consumer loops plus a stalled-job sweep.
pub(crate) fn spawn(
    backend: Arc<dyn Backend>,
    handler: Arc<dyn JobHandler>,
    config: WorkerConfig,
    parent_cancel: &CancellationToken,
) -> WorkerHandle {
    let cancel = parent_cancel.child_token();
    let mut tasks = Vec::with_capacity(config.concurrency + 1);

    for slot in 0..config.concurrency {
        let backend = Arc::clone(&backend);
        let handler = Arc::clone(&handler);
        let cancel = cancel.clone();
        let queue = config.queue;
        let lock_ms = config.lock_ms;
        tasks.push(tokio::spawn(async move {
            consume_loop(backend, handler, queue, lock_ms, slot, cancel).await;
        }));
    }

    {
        let backend = Arc::clone(&backend);
        let cancel = cancel.clone();
        let queue = config.queue;
        let interval = Duration::from_millis(config.stalled_interval_ms.max(1));
        tasks.push(tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(interval) => {}
                }
                if let Err(e) = backend.reclaim_stalled(queue).await {
                    tracing::warn!(queue = %queue, error = %e, "stalled sweep failed");
                }
            }
        }));
    }

    WorkerHandle { queue: config.queue, cancel, tasks }
}

async fn consume_loop(
    backend: Arc<dyn Backend>,
    handler: Arc<dyn JobHandler>,
    queue: QueueName,
    lock_ms: u64,
    slot: usize,
    cancel: CancellationToken,
) {
    tracing::debug!(queue = %queue, slot, "worker started");
    loop {
        if cancel.is_cancelled() {
            break;
        }
        let job = match backend.reserve(queue, lock_ms).await {
            Ok(Some(job)) => job,
            Ok(None) => {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(IDLE_POLL) => continue,
                }
            }
            Err(QueueError::Shutdown) => break,
            Err(e) => {
                tracing::warn!(queue = %queue, error = %e, "reserve failed");
                tokio::time::sleep(IDLE_POLL).await;
                continue;
            }
        };

        // The job runs to completion even if shutdown fires mid-flight; the
        // grace window in the manager bounds how long we wait for it.
        let outcome = handler.handle(&job).await;
        if let Err(e) = settle(&backend, &job, outcome).await {
            tracing::error!(queue = %queue, job_id = %job.id, error = %e, "failed to settle job");
        }
    }
    tracing::debug!(queue = %queue, slot, "worker stopped");
}

/// Apply the handler outcome: ack, delayed retry, or terminal failure with
/// dead-letter forwarding.
async fn settle(
    backend: &Arc<dyn Backend>,
    job: &QueuedJob,
    outcome: Result<(), WorkerError>,
) -> Result<(), QueueError> {
    match outcome {
        Ok(()) => backend.complete(job.id).await,
        Err(error) => {
            let terminal = error.is_fatal() || job.attempts_exhausted();
            if !terminal {
                let delay = job.opts.backoff.delay_ms(job.attempts_made);
                tracing::warn!(
                    job_id = %job.id,
                    attempt = job.attempts_made,
                    of = job.opts.attempts,
                    delay_ms = delay,
                    error = %error,
                    "job attempt failed, retrying"
                );
                return backend.retry(job.id, &error.to_string(), delay).await;
            }

            tracing::error!(job_id = %job.id, error = %error, "job failed terminally");
            backend.fail(job.id, &error.to_string()).await?;

            // Dead-letter everything except the dead-letter queue itself.
            if !job.queue.is_dead_letter() {
                let letter = QueuedJob::new(
                    JobPayload::JobFailed {
                        orig_job_id: job.id,
                        error: error.to_string(),
                        error_ctx: error.context().map(String::from),
                        payload: Box::new(job.payload.clone()),
                    },
                    job.opts,
                );
                backend.enqueue(&letter).await?;
            }
            Ok(())
        }
    }
}

#[cfg(test)]
#[path = "worker_tests.rs"]
mod tests;
