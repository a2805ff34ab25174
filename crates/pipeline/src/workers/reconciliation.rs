// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Reconciliation: fold a sealed bundle into a final scored relationship.

use crate::context::PipelineContext;
use crate::error::PipelineError;
use async_trait::async_trait;
use std::sync::Arc;
use trellis_core::{reconcile, Clock, JobPayload, RelState};
use trellis_queue::{JobHandler, QueuedJob, WorkerError};

pub struct ReconciliationWorker<C: Clock> {
    ctx: Arc<PipelineContext<C>>,
}

impl<C: Clock + 'static> ReconciliationWorker<C> {
    pub fn new(ctx: Arc<PipelineContext<C>>) -> Self {
        Self { ctx }
    }

    async fn reconcile_bundle(&self, job: &QueuedJob) -> Result<(), PipelineError> {
        let JobPayload::Reconcile { rel_hash } = &job.payload else {
            return Ok(());
        };

        // A missing bundle means a previous attempt already reconciled and
        // deleted it; the retry has nothing left to do.
        let Some(bundle) = self.ctx.store.bundle(rel_hash).await? else {
            tracing::debug!(rel_hash = %rel_hash, "bundle already reconciled");
            return Ok(());
        };

        let rel = reconcile(&bundle, &self.ctx.config.triangulation);
        self.ctx.store.upsert_final(&rel).await?;

        if rel.state == RelState::Validated {
            self.ctx
                .store
                .append_event(&JobPayload::GraphCommit {
                    nodes: Vec::new(),
                    edges: vec![rel.clone()],
                })
                .await?;
        }

        self.ctx.store.delete_bundle(rel_hash).await?;
        tracing::info!(
            rel_hash = %rel_hash,
            score = %rel.confidence,
            state = %rel.state,
            "relationship reconciled"
        );
        Ok(())
    }
}

#[async_trait]
impl<C: Clock + 'static> JobHandler for ReconciliationWorker<C> {
    async fn handle(&self, job: &QueuedJob) -> Result<(), WorkerError> {
        self.reconcile_bundle(job).await.map_err(PipelineError::into_worker_error)
    }
}

#[cfg(test)]
#[path = "reconciliation_tests.rs"]
mod tests;
