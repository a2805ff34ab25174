// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Run and file-record lifecycles.

use crate::id::{FileId, RunId};
use serde::{Deserialize, Serialize};

/// Lifecycle of one end-to-end pipeline execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Active,
    Completed,
    Failed,
}

impl RunStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, RunStatus::Active)
    }
}

crate::simple_display! {
    RunStatus {
        Active => "active",
        Completed => "completed",
        Failed => "failed",
    }
}

/// Lifecycle of one discovered source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    Pending,
    Analysing,
    Completed,
    Failed,
}

crate::simple_display! {
    FileStatus {
        Pending => "pending",
        Analysing => "analysing",
        Completed => "completed",
        Failed => "failed",
    }
}

/// A source file discovered by the producer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    pub id: FileId,
    pub run_id: RunId,
    /// Absolute path, already verified to sit under the run's target root.
    pub path: String,
    pub content_hash: String,
    pub status: FileStatus,
}

impl FileRecord {
    pub fn new(run_id: RunId, path: impl Into<String>, content_hash: impl Into<String>) -> Self {
        Self {
            id: FileId::new(),
            run_id,
            path: path.into(),
            content_hash: content_hash.into(),
            status: FileStatus::Pending,
        }
    }
}

/// What the run produced, reported when it terminates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: Option<RunId>,
    pub committed_relationships: u64,
    pub rejected_relationships: u64,
    pub dead_letters: u64,
    pub skipped_files: u64,
    pub pois: u64,
}

impl RunSummary {
    /// A run is clean when nothing was dead-lettered.
    pub fn is_clean(&self) -> bool {
        self.dead_letters == 0
    }
}

impl std::fmt::Display for RunSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "pois:       {}", self.pois)?;
        writeln!(f, "committed:  {}", self.committed_relationships)?;
        writeln!(f, "rejected:   {}", self.rejected_relationships)?;
        writeln!(f, "dead:       {}", self.dead_letters)?;
        write!(f, "skipped:    {}", self.skipped_files)
    }
}

#[cfg(test)]
#[path = "run_tests.rs"]
mod tests;
