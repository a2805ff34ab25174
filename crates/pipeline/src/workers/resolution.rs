// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Directory resolution (intra-dir LLM pass) and the deterministic pass.

use crate::context::PipelineContext;
use crate::deterministic::scan_relationships;
use crate::error::PipelineError;
use crate::producer::run_dirs_counter;
use async_trait::async_trait;
use std::sync::Arc;
use trellis_core::{Clock, Confidence, Evidence, JobPayload, Pass, Poi, QualifiedName, RelKind};
use trellis_llm::{directory_prompt, DirectoryAnalysis};
use trellis_queue::{JobHandler, QueuedJob, WorkerError};
use trellis_storage::{DirectorySummary, FailedPoi, Store};

pub struct DirectoryResolutionWorker<C: Clock> {
    ctx: Arc<PipelineContext<C>>,
}

impl<C: Clock + 'static> DirectoryResolutionWorker<C> {
    pub fn new(ctx: Arc<PipelineContext<C>>) -> Self {
        Self { ctx }
    }

    async fn resolve(&self, job: &QueuedJob) -> Result<(), PipelineError> {
        let JobPayload::DirectoryResolve { run_id, dir_path } = &job.payload else {
            return Ok(());
        };
        let run_id = *run_id;

        let pois = self.ctx.store.pois_for_directory(run_id, dir_path).await?;
        let distinct_files: std::collections::BTreeSet<&str> =
            pois.iter().map(|p| p.qualified_name.scope()).collect();

        let mut relationships: Vec<(QualifiedName, QualifiedName, RelKind, Confidence)> =
            Vec::new();
        let mut summary_parts: Vec<String> = Vec::new();

        if distinct_files.len() >= 2 {
            for group in self.partition(dir_path, &pois) {
                let analysis: DirectoryAnalysis =
                    self.ctx.llm.extract(directory_prompt(dir_path, group)).await?;
                summary_parts.push(analysis.summary);
                for raw in analysis.relationships {
                    let Ok(kind) = raw.kind.parse() else { continue };
                    let source = QualifiedName::new(raw.source);
                    let target = QualifiedName::new(raw.target);
                    if !cross_file_within(dir_path, &source, &target) {
                        continue;
                    }
                    relationships.push((
                        source,
                        target,
                        kind,
                        Confidence::clamped(raw.confidence),
                    ));
                }
            }
        }

        let summary = DirectorySummary {
            run_id,
            dir_path: dir_path.clone(),
            summary_text: summary_parts.join("\n"),
            poi_count: pois.len() as u64,
        };

        let mut tx = self.ctx.store.begin().await?;
        if self.ctx.config.triangulation.pass_enabled(Pass::IntraDir) {
            for (source, target, kind, confidence) in &relationships {
                Store::append_event_tx(
                    &mut tx,
                    &JobPayload::Validate {
                        rel_hash: trellis_core::rel_hash(source, target, *kind),
                        source: source.clone(),
                        target: target.clone(),
                        kind: *kind,
                        evidence: Evidence::agreeing(Pass::IntraDir, *confidence),
                    },
                )
                .await?;
            }
        }
        Store::upsert_summary_tx(&mut tx, &summary).await?;
        tx.commit().await?;

        tracing::info!(
            dir = %dir_path,
            pois = pois.len(),
            relationships = relationships.len(),
            "directory resolved"
        );

        // Counter-based release of the root when the backend has no native
        // dependencies.
        if !self.ctx.queues.supports_flows() {
            let remaining = self.ctx.queues.decrement_counter(&run_dirs_counter(run_id)).await?;
            if remaining <= 0 {
                self.ctx.queues.enqueue(JobPayload::GlobalResolve { run_id }).await?;
            }
        }
        Ok(())
    }

    /// Split the POI listing into groups whose prompts fit the context
    /// budget.
    fn partition<'a>(&self, dir_path: &str, pois: &'a [Poi]) -> Vec<&'a [Poi]> {
        let budget = self.ctx.config.llm.context_budget_tokens;
        if self.ctx.tokens.count(&directory_prompt(dir_path, pois).user) <= budget {
            return vec![pois];
        }
        let mut groups = Vec::new();
        let mut start = 0;
        while start < pois.len() {
            let mut end = pois.len();
            while end > start + 1
                && self.ctx.tokens.count(&directory_prompt(dir_path, &pois[start..end]).user)
                    > budget
            {
                end = start + (end - start) / 2;
            }
            groups.push(&pois[start..end]);
            start = end;
        }
        groups
    }
}

fn cross_file_within(dir_path: &str, source: &QualifiedName, target: &QualifiedName) -> bool {
    let prefix = format!("{}/", dir_path.trim_end_matches('/'));
    source.scope() != target.scope()
        && source.scope().starts_with(&prefix)
        && target.scope().starts_with(&prefix)
}

#[async_trait]
impl<C: Clock + 'static> JobHandler for DirectoryResolutionWorker<C> {
    async fn handle(&self, job: &QueuedJob) -> Result<(), WorkerError> {
        self.resolve(job).await.map_err(PipelineError::into_worker_error)
    }
}

/// The deterministic syntactic pass, fed by the batched POI payloads the
/// file-analysis stage emits.
pub struct DeterministicWorker<C: Clock> {
    ctx: Arc<PipelineContext<C>>,
}

impl<C: Clock + 'static> DeterministicWorker<C> {
    pub fn new(ctx: Arc<PipelineContext<C>>) -> Self {
        Self { ctx }
    }

    async fn resolve(&self, job: &QueuedJob) -> Result<(), PipelineError> {
        let JobPayload::ResolvePois { run_id, file_id, pois } = &job.payload else {
            return Ok(());
        };
        if !self.ctx.config.triangulation.pass_enabled(Pass::Deterministic) {
            return Ok(());
        }

        // The scan matches against the run's full POI set; until every file
        // has settled, a name defined in a not-yet-analysed file would be
        // silently missed and later penalised as a disagreement.
        let unsettled = self
            .ctx
            .store
            .count_files_with_status(*run_id, trellis_core::FileStatus::Pending)
            .await?
            + self
                .ctx
                .store
                .count_files_with_status(*run_id, trellis_core::FileStatus::Analysing)
                .await?;
        if unsettled > 0 {
            return Err(PipelineError::NotReady(format!(
                "{unsettled} files still analysing in {run_id}"
            )));
        }

        let Some(record) = self.ctx.store.file(*file_id).await? else {
            return Ok(());
        };

        let content = match tokio::fs::read_to_string(&record.path).await {
            Ok(content) => content,
            Err(e) => {
                // Per-POI failure records; the batch itself succeeds and the
                // pipeline continues without this file's deterministic pass.
                for poi in pois {
                    self.ctx
                        .store
                        .insert_failed_poi(&FailedPoi {
                            orig_job_id: job.id,
                            error_msg: format!("source unreadable: {e}"),
                            poi: poi.clone(),
                        })
                        .await?;
                }
                return Ok(());
            }
        };

        let run_pois = self.ctx.store.pois_for_run(*run_id).await?;
        let candidates = scan_relationships(&record.path, &content, pois, &run_pois);
        if candidates.is_empty() {
            return Ok(());
        }

        let mut tx = self.ctx.store.begin().await?;
        for candidate in &candidates {
            Store::append_event_tx(
                &mut tx,
                &JobPayload::Validate {
                    rel_hash: candidate.hash(),
                    source: candidate.source.clone(),
                    target: candidate.target.clone(),
                    kind: candidate.kind,
                    evidence: Evidence::agreeing(Pass::Deterministic, candidate.confidence),
                },
            )
            .await?;
        }
        tx.commit().await?;

        tracing::debug!(
            file = %record.path,
            candidates = candidates.len(),
            "deterministic pass emitted evidence"
        );
        Ok(())
    }
}

#[async_trait]
impl<C: Clock + 'static> JobHandler for DeterministicWorker<C> {
    async fn handle(&self, job: &QueuedJob) -> Result<(), WorkerError> {
        self.resolve(job).await.map_err(PipelineError::into_worker_error)
    }
}

#[cfg(test)]
#[path = "resolution_tests.rs"]
mod tests;
