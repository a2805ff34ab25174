// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Global resolution: cross-directory relationships from summaries.

use crate::context::PipelineContext;
use crate::error::PipelineError;
use async_trait::async_trait;
use std::sync::Arc;
use trellis_core::{Clock, Confidence, Evidence, JobPayload, Pass, QualifiedName, RunStatus};
use trellis_llm::{global_prompt, GlobalAnalysis, SummaryInput};
use trellis_queue::{JobHandler, QueuedJob, WorkerError};
use trellis_storage::Store;

pub struct GlobalResolutionWorker<C: Clock> {
    ctx: Arc<PipelineContext<C>>,
}

impl<C: Clock + 'static> GlobalResolutionWorker<C> {
    pub fn new(ctx: Arc<PipelineContext<C>>) -> Self {
        Self { ctx }
    }

    async fn resolve(&self, job: &QueuedJob) -> Result<(), PipelineError> {
        let JobPayload::GlobalResolve { run_id } = &job.payload else {
            return Ok(());
        };
        let run_id = *run_id;

        // Summaries only — raw POIs never cross the directory boundary.
        let summaries: Vec<SummaryInput> = self
            .ctx
            .store
            .summaries_for_run(run_id)
            .await?
            .into_iter()
            .filter(|s| !s.summary_text.trim().is_empty())
            .map(|s| SummaryInput {
                dir_path: s.dir_path,
                poi_count: s.poi_count,
                summary_text: s.summary_text,
            })
            .collect();

        let mut relationships = Vec::new();
        if summaries.len() >= 2 {
            for group in self.partition(&summaries) {
                let analysis: GlobalAnalysis =
                    self.ctx.llm.extract(global_prompt(group)).await?;
                for raw in analysis.relationships {
                    let Ok(kind) = raw.kind.parse() else { continue };
                    let source = QualifiedName::new(raw.source);
                    let target = QualifiedName::new(raw.target);
                    relationships.push((source, target, kind, Confidence::clamped(raw.confidence)));
                }
            }
        }

        if !relationships.is_empty()
            && self.ctx.config.triangulation.pass_enabled(Pass::Global)
        {
            let mut tx = self.ctx.store.begin().await?;
            for (source, target, kind, confidence) in &relationships {
                Store::append_event_tx(
                    &mut tx,
                    &JobPayload::Validate {
                        rel_hash: trellis_core::rel_hash(source, target, *kind),
                        source: source.clone(),
                        target: target.clone(),
                        kind: *kind,
                        evidence: Evidence::agreeing(Pass::Global, *confidence),
                    },
                )
                .await?;
            }
            tx.commit().await?;
        }

        // The root settling ends the evidence-producing phase of the run.
        self.ctx.store.set_run_status(run_id, RunStatus::Completed).await?;
        tracing::info!(
            run_id = %run_id,
            directories = summaries.len(),
            relationships = relationships.len(),
            "global resolution finished"
        );
        Ok(())
    }

    fn partition<'a>(&self, summaries: &'a [SummaryInput]) -> Vec<&'a [SummaryInput]> {
        let budget = self.ctx.config.llm.context_budget_tokens;
        if self.ctx.tokens.count(&global_prompt(summaries).user) <= budget {
            return vec![summaries];
        }
        let mut groups = Vec::new();
        let mut start = 0;
        while start < summaries.len() {
            let mut end = summaries.len();
            while end > start + 1
                && self.ctx.tokens.count(&global_prompt(&summaries[start..end]).user) > budget
            {
                end = start + (end - start) / 2;
            }
            groups.push(&summaries[start..end]);
            start = end;
        }
        groups
    }
}

#[async_trait]
impl<C: Clock + 'static> JobHandler for GlobalResolutionWorker<C> {
    async fn handle(&self, job: &QueuedJob) -> Result<(), WorkerError> {
        self.resolve(job).await.map_err(PipelineError::into_worker_error)
    }
}
