// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Graph ingestion: drain commit events in atomic batches.
//!
//! Unlike the per-job workers, this stage reserves up to `graph.batch-size`
//! items at once and applies them as one sink transaction. On failure every
//! reserved job is retried (attempts counted); MERGE semantics make the
//! replays harmless.

use crate::context::PipelineContext;
use crate::error::PipelineError;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use trellis_core::{Clock, JobPayload, QueueName};
use trellis_graph::{EdgeSpec, GraphBatch, NodeSpec};
use trellis_queue::{Backend as _, QueuedJob};

const IDLE_POLL: Duration = Duration::from_millis(50);

pub struct GraphIngestionWorker<C: Clock> {
    ctx: Arc<PipelineContext<C>>,
}

impl<C: Clock + 'static> GraphIngestionWorker<C> {
    pub fn new(ctx: Arc<PipelineContext<C>>) -> Self {
        Self { ctx }
    }

    /// Spawn the drain loop.
    pub fn spawn(self, cancel: &CancellationToken) -> JoinHandle<()> {
        let cancel = cancel.child_token();
        tokio::spawn(async move {
            loop {
                if cancel.is_cancelled() {
                    break;
                }
                match self.drain_once().await {
                    Ok(0) => {
                        tokio::select! {
                            _ = cancel.cancelled() => break,
                            _ = tokio::time::sleep(IDLE_POLL) => {}
                        }
                    }
                    Ok(_) => {}
                    Err(e) => {
                        tracing::warn!(error = %e, "graph ingestion pass failed");
                        tokio::time::sleep(IDLE_POLL).await;
                    }
                }
            }
        })
    }

    /// Reserve up to one batch of commit jobs and apply them atomically.
    /// Returns the number of jobs handled.
    pub async fn drain_once(&self) -> Result<usize, PipelineError> {
        let backend = self.ctx.queues.backend();
        let lock_ms = 60_000;
        let mut jobs: Vec<QueuedJob> = Vec::new();
        let mut batch = GraphBatch::default();

        while batch.len() < self.ctx.config.graph.batch_size {
            let Some(job) = backend.reserve(QueueName::GraphIngestion, lock_ms).await? else {
                break;
            };
            if let JobPayload::GraphCommit { nodes, edges } = &job.payload {
                batch.nodes.extend(nodes.iter().map(NodeSpec::from));
                batch.edges.extend(edges.iter().map(EdgeSpec::from));
            }
            jobs.push(job);
        }

        if jobs.is_empty() {
            return Ok(0);
        }

        match self.ctx.graph.apply(&batch).await {
            Ok(()) => {
                for job in &jobs {
                    if let JobPayload::GraphCommit { edges, .. } = &job.payload {
                        for edge in edges {
                            self.ctx.store.mark_committed(&edge.rel_hash).await?;
                        }
                    }
                    backend.complete(job.id).await?;
                }
                tracing::debug!(
                    jobs = jobs.len(),
                    nodes = batch.nodes.len(),
                    edges = batch.edges.len(),
                    "graph batch committed"
                );
                Ok(jobs.len())
            }
            Err(e) => {
                // All-or-nothing: the whole batch goes back to the queue.
                tracing::warn!(error = %e, jobs = jobs.len(), "graph batch failed, re-queueing");
                for job in &jobs {
                    if job.attempts_exhausted() {
                        backend.fail(job.id, &e.to_string()).await?;
                    } else {
                        let delay = job.opts.backoff.delay_ms(job.attempts_made);
                        backend.retry(job.id, &e.to_string(), delay).await?;
                    }
                }
                Ok(jobs.len())
            }
        }
    }
}

#[cfg(test)]
#[path = "graph_ingestion_tests.rs"]
mod tests;
