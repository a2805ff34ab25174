// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Validation: accumulate evidence per relationship hash and seal bundles.

use crate::context::PipelineContext;
use crate::error::PipelineError;
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use trellis_core::{
    Clock, EvidenceBundle, JobPayload, Pass, QualifiedName, RelHash, TriangulationConfig,
};
use trellis_queue::{JobHandler, QueuedJob, WorkerError};

/// Which passes are expected to report a candidate, given where its
/// endpoints live.
///
/// - same file (or a module reference): the file pass sees it, and the
///   deterministic scan confirms it;
/// - different files in one directory: the source file's pass, the
///   directory pass, and the deterministic scan;
/// - different directories: only the global pass reads that far.
///
/// Disabled passes are never expected.
pub fn expected_passes(
    source: &QualifiedName,
    target: &QualifiedName,
    config: &TriangulationConfig,
) -> Vec<Pass> {
    let module_ref = |qn: &QualifiedName| !qn.scope().contains('/');
    let scoped = if module_ref(source) || module_ref(target) {
        vec![Pass::IntraFile, Pass::Deterministic]
    } else if source.scope() == target.scope() {
        vec![Pass::IntraFile, Pass::Deterministic]
    } else {
        let parent = |qn: &QualifiedName| {
            Path::new(qn.scope()).parent().map(|p| p.display().to_string()).unwrap_or_default()
        };
        if parent(source) == parent(target) {
            vec![Pass::IntraFile, Pass::IntraDir, Pass::Deterministic]
        } else {
            vec![Pass::Global]
        }
    };
    scoped.into_iter().filter(|pass| config.pass_enabled(*pass)).collect()
}

pub struct ValidationWorker<C: Clock> {
    ctx: Arc<PipelineContext<C>>,
}

impl<C: Clock + 'static> ValidationWorker<C> {
    pub fn new(ctx: Arc<PipelineContext<C>>) -> Self {
        Self { ctx }
    }

    async fn validate(&self, job: &QueuedJob) -> Result<(), PipelineError> {
        let JobPayload::Validate { rel_hash, source, target, kind, evidence } = &job.payload
        else {
            return Ok(());
        };

        let expected = expected_passes(source, target, &self.ctx.config.triangulation);
        let bundle = self
            .ctx
            .store
            .record_evidence(source, target, *kind, &expected, *evidence, self.ctx.now_ms())
            .await?;

        if bundle.is_complete() {
            self.try_seal(rel_hash, &bundle).await?;
        }
        Ok(())
    }

    /// Compare-and-swap on the seal flag: exactly one caller wins and
    /// enqueues reconciliation. Losers are replays or racing workers,
    /// and do nothing.
    async fn try_seal(&self, rel_hash: &RelHash, bundle: &EvidenceBundle) -> Result<(), PipelineError> {
        let won = self.ctx.queues.set_flag_nx(&seal_flag(rel_hash)).await?;
        if !won {
            return Ok(());
        }
        self.ctx.store.seal_bundle(rel_hash).await?;
        self.ctx.queues.enqueue(JobPayload::Reconcile { rel_hash: rel_hash.clone() }).await?;
        tracing::debug!(
            rel_hash = %rel_hash,
            collected = bundle.collected_count(),
            expected = bundle.expected_count(),
            "bundle sealed"
        );
        Ok(())
    }

    /// Seal bundles whose grace window has expired without reaching their
    /// expected count. Their silent passes become disagreers at
    /// reconciliation. Returns how many were sealed.
    pub async fn sweep_grace(&self) -> Result<u64, PipelineError> {
        let grace = self.ctx.config.triangulation.grace_ms;
        let cutoff = self.ctx.now_ms().saturating_sub(grace);
        let stale = self.ctx.store.unsealed_bundles_before(cutoff).await?;

        let mut sealed = 0u64;
        for bundle in stale {
            if self.ctx.queues.set_flag_nx(&seal_flag(&bundle.rel_hash)).await? {
                self.ctx.store.seal_bundle(&bundle.rel_hash).await?;
                self.ctx
                    .queues
                    .enqueue(JobPayload::Reconcile { rel_hash: bundle.rel_hash.clone() })
                    .await?;
                sealed += 1;
                tracing::debug!(
                    rel_hash = %bundle.rel_hash,
                    collected = bundle.collected_count(),
                    expected = bundle.expected_count(),
                    "bundle sealed by grace timeout"
                );
            }
        }
        Ok(sealed)
    }
}

fn seal_flag(rel_hash: &RelHash) -> String {
    format!("seal:{rel_hash}")
}

#[async_trait]
impl<C: Clock + 'static> JobHandler for ValidationWorker<C> {
    async fn handle(&self, job: &QueuedJob) -> Result<(), WorkerError> {
        self.validate(job).await.map_err(PipelineError::into_worker_error)
    }
}

#[cfg(test)]
#[path = "validation_tests.rs"]
mod tests;
