// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The single failed-jobs consumer: terminal failures become dead-letter
//! rows.

use crate::context::PipelineContext;
use crate::error::PipelineError;
use async_trait::async_trait;
use std::sync::Arc;
use trellis_core::{Clock, JobPayload};
use trellis_queue::{JobHandler, QueuedJob, WorkerError};
use trellis_storage::DeadLetter;

pub struct DeadLetterWorker<C: Clock> {
    ctx: Arc<PipelineContext<C>>,
}

impl<C: Clock + 'static> DeadLetterWorker<C> {
    pub fn new(ctx: Arc<PipelineContext<C>>) -> Self {
        Self { ctx }
    }

    async fn record(&self, job: &QueuedJob) -> Result<(), PipelineError> {
        let JobPayload::JobFailed { orig_job_id, error, error_ctx, payload } = &job.payload
        else {
            return Ok(());
        };

        self.ctx
            .store
            .insert_dead_letter(&DeadLetter {
                orig_job_id: *orig_job_id,
                error_msg: error.clone(),
                error_ctx: error_ctx.clone(),
                payload_json: serde_json::to_string(payload.as_ref())
                    .unwrap_or_else(|_| "{}".to_string()),
            })
            .await?;
        tracing::warn!(orig_job_id = %orig_job_id, error = %error, "job dead-lettered");
        Ok(())
    }
}

#[async_trait]
impl<C: Clock + 'static> JobHandler for DeadLetterWorker<C> {
    async fn handle(&self, job: &QueuedJob) -> Result<(), WorkerError> {
        self.record(job).await.map_err(PipelineError::into_worker_error)
    }
}
