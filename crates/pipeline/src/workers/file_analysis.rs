// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! File-analysis worker: extract POIs and intra-file relationships.

use crate::context::PipelineContext;
use crate::error::PipelineError;
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::path::Path;
use std::sync::Arc;
use trellis_core::{
    Clock, Confidence, Evidence, FileId, FileStatus, JobPayload, Pass, Poi, QualifiedName, RunId,
};
use trellis_llm::{file_analysis_prompt, split_chunks, FileAnalysis};
use trellis_queue::{JobHandler, QueuedJob, WorkerError};
use trellis_storage::{DeadLetter, Store};

pub struct FileAnalysisWorker<C: Clock> {
    ctx: Arc<PipelineContext<C>>,
}

impl<C: Clock + 'static> FileAnalysisWorker<C> {
    pub fn new(ctx: Arc<PipelineContext<C>>) -> Self {
        Self { ctx }
    }

    async fn analyse(&self, job: &QueuedJob) -> Result<(), PipelineError> {
        let JobPayload::FileAnalyse { run_id, file_id, file_path } = &job.payload else {
            return Ok(());
        };
        let run_id = *run_id;
        let file_id = *file_id;

        self.guard_path(file_path)?;

        let metadata =
            tokio::fs::metadata(file_path).await.map_err(|source| PipelineError::Io {
                path: file_path.clone(),
                source,
            })?;
        if metadata.len() > self.ctx.config.file.max_size_bytes {
            return self.skip_oversized(job, file_id, file_path, metadata.len()).await;
        }

        let content =
            tokio::fs::read_to_string(file_path).await.map_err(|source| PipelineError::Io {
                path: file_path.clone(),
                source,
            })?;
        let content_hash = hex_digest(&content);

        // Re-running a completed job against unchanged content is a no-op:
        // the outbox events already exist and the upserts would not change
        // a row.
        if let Some(record) = self.ctx.store.file(file_id).await? {
            if record.status == FileStatus::Completed && record.content_hash == content_hash {
                tracing::debug!(file = %file_path, "content unchanged, skipping re-analysis");
                return Ok(());
            }
        }

        self.ctx.store.set_file_status(file_id, FileStatus::Analysing).await?;
        self.ctx.store.set_file_hash(file_id, &content_hash).await?;

        // All LLM work happens before any transaction opens: an LLM call can
        // outlive any reasonable idle-in-transaction limit.
        let budget = self.ctx.config.llm.context_budget_tokens;
        let chunks = split_chunks(&content, budget, &self.ctx.tokens);
        let mut analyses = Vec::with_capacity(chunks.len());
        for chunk in &chunks {
            let request = file_analysis_prompt(file_path, &chunk.text, chunk.start_line);
            let analysis: FileAnalysis = self.ctx.llm.extract(request).await?;
            analyses.push(analysis);
        }

        let (pois, candidates) = collect(run_id, file_id, analyses);

        // One short transaction: POIs, evidence events, the resolution
        // batch, and the status flip land together or not at all.
        let mut tx = self.ctx.store.begin().await?;
        Store::upsert_pois_tx(&mut tx, &pois).await?;
        if self.ctx.config.triangulation.pass_enabled(Pass::IntraFile) {
            for candidate in &candidates {
                Store::append_event_tx(
                    &mut tx,
                    &JobPayload::Validate {
                        rel_hash: candidate.0.clone(),
                        source: candidate.1.clone(),
                        target: candidate.2.clone(),
                        kind: candidate.3,
                        evidence: Evidence::agreeing(Pass::IntraFile, candidate.4),
                    },
                )
                .await?;
            }
        }
        if !pois.is_empty() {
            Store::append_event_tx(
                &mut tx,
                &JobPayload::ResolvePois { run_id, file_id, pois: pois.clone() },
            )
            .await?;
            Store::append_event_tx(
                &mut tx,
                &JobPayload::GraphCommit { nodes: pois.clone(), edges: Vec::new() },
            )
            .await?;
        }
        if !self.ctx.queues.supports_flows() {
            if let Some(dir) = Path::new(file_path).parent() {
                Store::append_event_tx(
                    &mut tx,
                    &JobPayload::DirectoryAggregate {
                        run_id,
                        dir_path: dir.display().to_string(),
                        completed_file_id: file_id,
                    },
                )
                .await?;
            }
        }
        Store::set_file_status_tx(&mut tx, file_id, FileStatus::Completed).await?;
        tx.commit().await?;

        tracing::info!(
            file = %file_path,
            pois = pois.len(),
            relationships = candidates.len(),
            chunks = chunks.len(),
            "file analysed"
        );
        Ok(())
    }

    fn guard_path(&self, file_path: &str) -> Result<(), PipelineError> {
        let root = &self.ctx.config.run.target_root;
        let canonical_root = root.canonicalize().map_err(|source| PipelineError::Io {
            path: root.display().to_string(),
            source,
        })?;
        let canonical = Path::new(file_path)
            .canonicalize()
            .map_err(|source| PipelineError::Io { path: file_path.to_string(), source })?;
        if !canonical.starts_with(&canonical_root) {
            return Err(PipelineError::PathTraversal {
                path: file_path.to_string(),
                root: canonical_root.display().to_string(),
            });
        }
        Ok(())
    }

    /// Oversized files are skipped, recorded, and the job still completes so
    /// the directory can settle (the pipeline continues without this file).
    async fn skip_oversized(
        &self,
        job: &QueuedJob,
        file_id: FileId,
        file_path: &str,
        size: u64,
    ) -> Result<(), PipelineError> {
        tracing::warn!(
            file = %file_path,
            size,
            limit = self.ctx.config.file.max_size_bytes,
            "file exceeds the size limit, skipping"
        );
        self.ctx.store.set_file_status(file_id, FileStatus::Failed).await?;
        self.ctx
            .store
            .insert_dead_letter(&DeadLetter {
                orig_job_id: job.id,
                error_msg: format!(
                    "file exceeds max-size-bytes ({size} > {})",
                    self.ctx.config.file.max_size_bytes
                ),
                error_ctx: Some(file_path.to_string()),
                payload_json: serde_json::to_string(&job.payload)
                    .unwrap_or_else(|_| "{}".to_string()),
            })
            .await?;
        Ok(())
    }
}

fn hex_digest(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hasher.finalize().iter().map(|b| format!("{b:02x}")).collect()
}

type CandidateTuple =
    (trellis_core::RelHash, QualifiedName, QualifiedName, trellis_core::RelKind, Confidence);

/// Merge chunk outputs: POIs deduplicated by qualified name, relationships
/// by hash.
fn collect(
    run_id: RunId,
    file_id: FileId,
    analyses: Vec<FileAnalysis>,
) -> (Vec<Poi>, Vec<CandidateTuple>) {
    let mut pois: Vec<Poi> = Vec::new();
    let mut seen_qns = std::collections::BTreeSet::new();
    let mut candidates: Vec<CandidateTuple> = Vec::new();
    let mut seen_hashes = std::collections::BTreeSet::new();

    for analysis in analyses {
        for raw in analysis.pois {
            let Ok(kind) = raw.kind.parse() else { continue };
            let qualified_name = QualifiedName::new(raw.qualified_name);
            if !seen_qns.insert(qualified_name.clone()) {
                continue;
            }
            let mut poi = Poi::new(
                run_id,
                file_id,
                kind,
                raw.name,
                qualified_name,
                raw.start_line,
                raw.end_line,
            );
            if let Some(signature) = raw.signature {
                poi = poi.with_signature(signature);
            }
            pois.push(poi);
        }
        for raw in analysis.relationships {
            let Ok(kind) = raw.kind.parse() else { continue };
            let source = QualifiedName::new(raw.source);
            let target = QualifiedName::new(raw.target);
            let hash = trellis_core::rel_hash(&source, &target, kind);
            if !seen_hashes.insert(hash.clone()) {
                continue;
            }
            candidates.push((hash, source, target, kind, Confidence::clamped(raw.confidence)));
        }
    }
    (pois, candidates)
}

#[async_trait]
impl<C: Clock + 'static> JobHandler for FileAnalysisWorker<C> {
    async fn handle(&self, job: &QueuedJob) -> Result<(), WorkerError> {
        self.analyse(job).await.map_err(PipelineError::into_worker_error)
    }
}

#[cfg(test)]
#[path = "file_analysis_tests.rs"]
mod tests;
