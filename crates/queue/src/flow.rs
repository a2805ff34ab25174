// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Hierarchical job trees: one global-resolve root gated on N
//! directory-resolve parents, each gated on its file-analyse children.

use crate::job::QueuedJob;
use crate::options::JobOptions;
use trellis_core::{FileId, JobId, JobPayload, RunId};

/// Jobs for one directory: the parent resolve job and its file children.
#[derive(Debug, Clone)]
pub struct DirectoryJobs {
    pub resolve: QueuedJob,
    pub files: Vec<QueuedJob>,
}

/// A fully-linked job tree, ready to enqueue parents-first.
#[derive(Debug, Clone)]
pub struct JobTree {
    pub root: QueuedJob,
    pub directories: Vec<DirectoryJobs>,
}

impl JobTree {
    /// Build the tree for `groups`: `(directory, files-in-directory)`.
    ///
    /// Parents are created in `waiting-children` with their full child
    /// counts preset, so a child completing early can never release a parent
    /// prematurely.
    pub fn build(
        run_id: RunId,
        groups: &[(String, Vec<(FileId, String)>)],
        opts: JobOptions,
    ) -> Self {
        let root = QueuedJob::new_parent(
            JobPayload::GlobalResolve { run_id },
            opts,
            groups.len() as u32,
        );

        let directories = groups
            .iter()
            .map(|(dir_path, files)| {
                let resolve = QueuedJob::new_parent(
                    JobPayload::DirectoryResolve { run_id, dir_path: dir_path.clone() },
                    opts,
                    files.len() as u32,
                )
                .with_parent(root.id);

                let files = files
                    .iter()
                    .map(|(file_id, file_path)| {
                        QueuedJob::new(
                            JobPayload::FileAnalyse {
                                run_id,
                                file_id: *file_id,
                                file_path: file_path.clone(),
                            },
                            opts,
                        )
                        .with_parent(resolve.id)
                    })
                    .collect();

                DirectoryJobs { resolve, files }
            })
            .collect();

        Self { root, directories }
    }

    /// Every job in the tree, parents before children.
    pub fn jobs(&self) -> Vec<&QueuedJob> {
        let mut all = vec![&self.root];
        for dir in &self.directories {
            all.push(&dir.resolve);
        }
        for dir in &self.directories {
            all.extend(dir.files.iter());
        }
        all
    }

    pub fn ids(&self) -> Vec<JobId> {
        self.jobs().iter().map(|j| j.id).collect()
    }

    pub fn file_job_count(&self) -> usize {
        self.directories.iter().map(|d| d.files.len()).sum()
    }
}

#[cfg(test)]
#[path = "flow_tests.rs"]
mod tests;
