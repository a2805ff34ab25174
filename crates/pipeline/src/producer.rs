// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The producer: scan the target tree and commit the hierarchical job tree.

use crate::context::PipelineContext;
use crate::error::PipelineError;
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use trellis_core::{Clock, FileId, FileRecord, JobPayload, RunId, RunStatus};
use trellis_queue::JobTree;
use walkdir::WalkDir;

/// What the scan found (and refused).
#[derive(Debug, Default)]
pub struct ScanReport {
    /// Directory → files directly in it, sorted by path.
    pub groups: Vec<(String, Vec<PathBuf>)>,
    /// Paths rejected by the traversal guard.
    pub rejected: u64,
}

impl ScanReport {
    pub fn file_count(&self) -> usize {
        self.groups.iter().map(|(_, files)| files.len()).sum()
    }
}

pub struct Producer<C: Clock> {
    ctx: Arc<PipelineContext<C>>,
}

impl<C: Clock> Producer<C> {
    pub fn new(ctx: Arc<PipelineContext<C>>) -> Self {
        Self { ctx }
    }

    /// Walk the target tree, grouping files by their parent directory.
    ///
    /// Include/exclude globs apply to paths relative to the root. Every
    /// surviving path is canonicalised and verified to sit under the root —
    /// symlinks pointing elsewhere are a security rejection, logged and
    /// skipped before any further I/O.
    pub fn scan(&self, root: &Path) -> Result<ScanReport, PipelineError> {
        let canonical_root = root.canonicalize().map_err(|source| PipelineError::Io {
            path: root.display().to_string(),
            source,
        })?;
        let include = build_globs(&self.ctx.config.run.include_patterns)?;
        let exclude = build_globs(&self.ctx.config.run.exclude_patterns)?;

        let mut groups: BTreeMap<String, Vec<PathBuf>> = BTreeMap::new();
        let mut rejected = 0u64;

        for entry in WalkDir::new(&canonical_root).follow_links(true) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!(error = %e, "walk error, skipping entry");
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let relative = entry.path().strip_prefix(&canonical_root).unwrap_or(entry.path());
            if let Some(include) = &include {
                if !include.is_match(relative) {
                    continue;
                }
            }
            if let Some(exclude) = &exclude {
                if exclude.is_match(relative) {
                    continue;
                }
            }

            let canonical = match entry.path().canonicalize() {
                Ok(p) => p,
                Err(e) => {
                    tracing::warn!(path = %entry.path().display(), error = %e, "cannot resolve path");
                    continue;
                }
            };
            if !canonical.starts_with(&canonical_root) {
                tracing::error!(
                    security = true,
                    path = %entry.path().display(),
                    resolved = %canonical.display(),
                    "path escapes the target root, rejected"
                );
                rejected += 1;
                continue;
            }

            let dir = canonical
                .parent()
                .unwrap_or(&canonical_root)
                .display()
                .to_string();
            groups.entry(dir).or_default().push(canonical);
        }

        for files in groups.values_mut() {
            files.sort();
        }
        Ok(ScanReport { groups: groups.into_iter().collect(), rejected })
    }

    /// Create the run, persist its file records, and commit the job tree.
    ///
    /// On a backend with native dependencies this is one linked tree (root
    /// gated on directories, directories on files). Otherwise files are
    /// enqueued flat and completion counters drive the release chain.
    pub async fn produce(&self, run_id: RunId, root: &Path) -> Result<ScanReport, PipelineError> {
        let report = self.scan(root)?;
        self.ctx.store.create_run(run_id, &root.display().to_string()).await?;

        let mut records: Vec<FileRecord> = Vec::with_capacity(report.file_count());
        let mut groups: Vec<(String, Vec<(FileId, String)>)> = Vec::with_capacity(report.groups.len());
        for (dir, files) in &report.groups {
            let mut dir_files = Vec::with_capacity(files.len());
            for path in files {
                let record = FileRecord::new(run_id, path.display().to_string(), "");
                dir_files.push((record.id, record.path.clone()));
                records.push(record);
            }
            groups.push((dir.clone(), dir_files));
        }
        self.ctx.store.insert_files(&records).await?;

        let enqueued = if self.ctx.queues.supports_flows() {
            let tree = JobTree::build(run_id, &groups, self.ctx.queues.default_opts());
            self.ctx.queues.enqueue_tree(&tree).await
        } else {
            self.produce_with_counters(run_id, &groups).await
        };

        if let Err(e) = enqueued {
            self.ctx.store.set_run_status(run_id, RunStatus::Failed).await?;
            return Err(e.into());
        }

        tracing::info!(
            run_id = %run_id,
            files = report.file_count(),
            directories = report.groups.len(),
            rejected = report.rejected,
            "job tree committed"
        );
        Ok(report)
    }

    /// Counter-based fallback: per-directory completion counters plus one
    /// run-level directory counter, decremented by the aggregation and
    /// resolution workers.
    async fn produce_with_counters(
        &self,
        run_id: RunId,
        groups: &[(String, Vec<(FileId, String)>)],
    ) -> Result<(), trellis_queue::QueueError> {
        self.ctx
            .queues
            .set_counter(&run_dirs_counter(run_id), groups.len() as i64)
            .await?;
        let mut enqueued = Vec::new();
        for (dir, files) in groups {
            self.ctx
                .queues
                .set_counter(&dir_counter(run_id, dir), files.len() as i64)
                .await?;
            for (file_id, file_path) in files {
                match self
                    .ctx
                    .queues
                    .enqueue(JobPayload::FileAnalyse {
                        run_id,
                        file_id: *file_id,
                        file_path: file_path.clone(),
                    })
                    .await
                {
                    Ok(id) => enqueued.push(id),
                    Err(e) => {
                        self.ctx.queues.remove_waiting(&enqueued).await?;
                        return Err(e);
                    }
                }
            }
        }
        Ok(())
    }
}

pub(crate) fn dir_counter(run_id: RunId, dir: &str) -> String {
    format!("dir:{run_id}:{dir}")
}

pub(crate) fn run_dirs_counter(run_id: RunId) -> String {
    format!("run:{run_id}:dirs")
}

fn build_globs(patterns: &[String]) -> Result<Option<GlobSet>, PipelineError> {
    if patterns.is_empty() {
        return Ok(None);
    }
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|e| PipelineError::RunFailed(format!(
            "invalid glob pattern {pattern:?}: {e}"
        )))?;
        builder.add(glob);
    }
    builder
        .build()
        .map(Some)
        .map_err(|e| PipelineError::RunFailed(format!("glob set build failed: {e}")))
}

#[cfg(test)]
#[path = "producer_tests.rs"]
mod tests;
