// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pipeline wiring: spawn every stage, run the producer, wait for
//! quiescence, report.

use crate::context::PipelineContext;
use crate::error::PipelineError;
use crate::outbox::{OutboxPublisher, PublishFn};
use crate::producer::Producer;
use crate::summary::build_summary;
use crate::workers::{
    AggregationWorker, DeadLetterWorker, DeterministicWorker, DirectoryResolutionWorker,
    FileAnalysisWorker, GlobalResolutionWorker, GraphIngestionWorker, ReconciliationWorker,
    ValidationWorker,
};
use futures_util::FutureExt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use trellis_core::{Clock, QueueName, RunId, RunStatus, RunSummary};

/// How a run ended.
#[derive(Debug, Clone, PartialEq)]
pub struct RunOutcome {
    pub run_id: RunId,
    pub status: RunStatus,
    pub summary: RunSummary,
}

impl RunOutcome {
    /// Non-zero exit when the run failed outright.
    pub fn exit_code(&self) -> i32 {
        match self.status {
            RunStatus::Failed => 1,
            _ => 0,
        }
    }
}

pub struct PipelineRunner<C: Clock> {
    ctx: Arc<PipelineContext<C>>,
    cancel: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl<C: Clock + 'static> PipelineRunner<C> {
    pub fn new(ctx: Arc<PipelineContext<C>>) -> Self {
        Self { ctx, cancel: CancellationToken::new(), tasks: Vec::new() }
    }

    pub fn context(&self) -> &Arc<PipelineContext<C>> {
        &self.ctx
    }

    /// Spawn every consumer, the outbox publisher, the graph drain, and the
    /// grace sweep. Queue consumers register with the manager (which owns
    /// their shutdown); the loop tasks register here.
    pub fn start(&mut self) {
        let ctx = &self.ctx;
        let queues = &ctx.queues;

        queues.spawn_worker(
            QueueName::FileAnalysis,
            2,
            Arc::new(FileAnalysisWorker::new(Arc::clone(ctx))),
        );
        queues.spawn_worker(
            QueueName::DirectoryResolution,
            2,
            Arc::new(DirectoryResolutionWorker::new(Arc::clone(ctx))),
        );
        queues.spawn_worker(
            QueueName::GlobalResolution,
            1,
            Arc::new(GlobalResolutionWorker::new(Arc::clone(ctx))),
        );
        queues.spawn_worker(
            QueueName::RelationshipResolution,
            2,
            Arc::new(DeterministicWorker::new(Arc::clone(ctx))),
        );
        queues.spawn_worker(
            QueueName::Validation,
            2,
            Arc::new(ValidationWorker::new(Arc::clone(ctx))),
        );
        queues.spawn_worker(
            QueueName::Reconciliation,
            2,
            Arc::new(ReconciliationWorker::new(Arc::clone(ctx))),
        );
        queues.spawn_worker(
            QueueName::FailedJobs,
            1,
            Arc::new(DeadLetterWorker::new(Arc::clone(ctx))),
        );
        if !queues.supports_flows() {
            queues.spawn_worker(
                QueueName::DirectoryAggregation,
                1,
                Arc::new(AggregationWorker::new(Arc::clone(ctx))),
            );
        }

        self.tasks
            .push(GraphIngestionWorker::new(Arc::clone(ctx)).spawn(&self.cancel));

        let publish: PublishFn = {
            let queues = Arc::clone(queues);
            Arc::new(move |payload| {
                let queues = Arc::clone(&queues);
                async move { queues.enqueue(payload).await.map(|_| ()) }.boxed()
            })
        };
        self.tasks.push(
            OutboxPublisher::new(ctx.store.clone(), publish, ctx.config.outbox.clone())
                .spawn(&self.cancel),
        );

        self.tasks.push(self.spawn_grace_sweep());
    }

    fn spawn_grace_sweep(&self) -> JoinHandle<()> {
        let worker = ValidationWorker::new(Arc::clone(&self.ctx));
        let cancel = self.cancel.child_token();
        let interval =
            Duration::from_millis(self.ctx.config.triangulation.grace_ms.clamp(50, 5_000));
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(interval) => {}
                }
                match worker.sweep_grace().await {
                    Ok(0) => {}
                    Ok(sealed) => tracing::debug!(sealed, "grace sweep sealed stragglers"),
                    Err(e) => tracing::warn!(error = %e, "grace sweep failed"),
                }
            }
        })
    }

    /// Execute one run to completion: produce the job tree, then wait until
    /// the run settles and every stage drains.
    pub async fn run(&self, root: &Path) -> Result<RunOutcome, PipelineError> {
        let run_id = RunId::new();
        let producer = Producer::new(Arc::clone(&self.ctx));
        producer.produce(run_id, root).await?;

        self.wait_quiescent(run_id).await?;

        let status = self
            .ctx
            .store
            .run_status(run_id)
            .await?
            .unwrap_or(RunStatus::Failed);
        let summary = build_summary(&self.ctx.store, run_id).await?;
        Ok(RunOutcome { run_id, status, summary })
    }

    /// A run is settled when its status is terminal, the outbox backlog is
    /// empty, every queue is idle, and no evidence bundle is pending.
    async fn wait_quiescent(&self, run_id: RunId) -> Result<(), PipelineError> {
        const POLL: Duration = Duration::from_millis(50);
        let stages = [
            QueueName::FileAnalysis,
            QueueName::DirectoryResolution,
            QueueName::GlobalResolution,
            QueueName::DirectoryAggregation,
            QueueName::RelationshipResolution,
            QueueName::Validation,
            QueueName::Reconciliation,
            QueueName::GraphIngestion,
        ];

        let mut stalled_polls = 0u32;
        loop {
            if self.cancel.is_cancelled() {
                return Err(PipelineError::RunFailed("shutdown during run".to_string()));
            }
            tokio::time::sleep(POLL).await;

            let mut idle = self.ctx.store.count_unpublished().await? == 0
                && self.ctx.store.count_bundles().await? == 0;
            if idle {
                let backend = self.ctx.queues.backend();
                for queue in stages {
                    if backend.depth(queue).await? > 0 || backend.in_flight(queue).await? > 0 {
                        idle = false;
                        break;
                    }
                }
            }
            if !idle {
                stalled_polls = 0;
                continue;
            }

            match self.ctx.store.run_status(run_id).await? {
                Some(status) if status.is_terminal() => return Ok(()),
                _ => {
                    // Everything drained but the root never settled: a
                    // terminally-failed stage took the run down with it.
                    stalled_polls += 1;
                    if stalled_polls >= 40 {
                        self.ctx.store.set_run_status(run_id, RunStatus::Failed).await?;
                        return Ok(());
                    }
                }
            }
        }
    }

    /// Stop the loop tasks and drain the queue consumers within the grace
    /// window.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        for task in self.tasks.drain(..) {
            let _ = task.await;
        }
        self.ctx.queues.shutdown().await;
    }
}
