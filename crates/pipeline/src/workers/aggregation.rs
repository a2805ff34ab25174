// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Directory aggregation: counter-based completion tracking, for backends
//! without native job dependencies.

use crate::context::PipelineContext;
use crate::error::PipelineError;
use crate::producer::dir_counter;
use async_trait::async_trait;
use std::sync::Arc;
use trellis_core::{Clock, JobPayload};
use trellis_queue::{JobHandler, QueuedJob, WorkerError};

pub struct AggregationWorker<C: Clock> {
    ctx: Arc<PipelineContext<C>>,
}

impl<C: Clock + 'static> AggregationWorker<C> {
    pub fn new(ctx: Arc<PipelineContext<C>>) -> Self {
        Self { ctx }
    }

    async fn aggregate(&self, job: &QueuedJob) -> Result<(), PipelineError> {
        let JobPayload::DirectoryAggregate { run_id, dir_path, completed_file_id } = &job.payload
        else {
            return Ok(());
        };

        // The outbox delivers at least once; only the first delivery for a
        // file may decrement, or a replay could release the directory early.
        let first_delivery = self
            .ctx
            .queues
            .set_flag_nx(&format!("agg:{run_id}:{dir_path}:{completed_file_id}"))
            .await?;
        if !first_delivery {
            return Ok(());
        }

        let remaining =
            self.ctx.queues.decrement_counter(&dir_counter(*run_id, dir_path)).await?;
        tracing::debug!(
            dir = %dir_path,
            file = %completed_file_id,
            remaining,
            "file completion counted"
        );
        if remaining <= 0 {
            self.ctx
                .queues
                .enqueue(JobPayload::DirectoryResolve { run_id: *run_id, dir_path: dir_path.clone() })
                .await?;
        }
        Ok(())
    }
}

#[async_trait]
impl<C: Clock + 'static> JobHandler for AggregationWorker<C> {
    async fn handle(&self, job: &QueuedJob) -> Result<(), WorkerError> {
        self.aggregate(job).await.map_err(PipelineError::into_worker_error)
    }
}
