// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Queue topology: allow-listed queue names, job payloads, and job states.

use crate::evidence::Evidence;
use crate::id::{FileId, JobId, RunId};
use crate::poi::{Poi, QualifiedName};
use crate::relationship::{FinalRelationship, RelHash, RelKind};
use serde::{Deserialize, Serialize};

/// Queue-name allow-list violation. Unknown names are rejected outright so a
/// typo can never create an orphan queue.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown queue name: {0:?}")]
pub struct UnknownQueue(pub String);

/// The fixed set of queues the pipeline touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QueueName {
    FileAnalysis,
    DirectoryResolution,
    GlobalResolution,
    DirectoryAggregation,
    RelationshipResolution,
    Validation,
    Reconciliation,
    GraphIngestion,
    FailedJobs,
}

impl QueueName {
    pub const ALL: [QueueName; 9] = [
        QueueName::FileAnalysis,
        QueueName::DirectoryResolution,
        QueueName::GlobalResolution,
        QueueName::DirectoryAggregation,
        QueueName::RelationshipResolution,
        QueueName::Validation,
        QueueName::Reconciliation,
        QueueName::GraphIngestion,
        QueueName::FailedJobs,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            QueueName::FileAnalysis => "file-analysis-queue",
            QueueName::DirectoryResolution => "directory-resolution-queue",
            QueueName::GlobalResolution => "global-resolution-queue",
            QueueName::DirectoryAggregation => "directory-aggregation-queue",
            QueueName::RelationshipResolution => "relationship-resolution-queue",
            QueueName::Validation => "validation-queue",
            QueueName::Reconciliation => "reconciliation-queue",
            QueueName::GraphIngestion => "graph-ingestion-queue",
            QueueName::FailedJobs => "failed-jobs",
        }
    }

    /// The dead-letter queue never gets a failed-listener of its own.
    pub fn is_dead_letter(&self) -> bool {
        matches!(self, QueueName::FailedJobs)
    }
}

impl std::str::FromStr for QueueName {
    type Err = UnknownQueue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        QueueName::ALL
            .iter()
            .find(|q| q.as_str() == s)
            .copied()
            .ok_or_else(|| UnknownQueue(s.to_string()))
    }
}

impl std::fmt::Display for QueueName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payloads carried by queued jobs and outbox events.
///
/// Serializes with `{"type": "kind:verb", ...fields}` format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum JobPayload {
    #[serde(rename = "file:analyse")]
    FileAnalyse { run_id: RunId, file_id: FileId, file_path: String },

    #[serde(rename = "dir:resolve")]
    DirectoryResolve { run_id: RunId, dir_path: String },

    #[serde(rename = "global:resolve")]
    GlobalResolve { run_id: RunId },

    /// Directory-level completion counting, used when the queue backend has
    /// no native job dependencies.
    #[serde(rename = "dir:aggregate")]
    DirectoryAggregate { run_id: RunId, dir_path: String, completed_file_id: FileId },

    /// Batched material for cross-file inference: all POIs from one file.
    #[serde(rename = "rel:resolve")]
    ResolvePois { run_id: RunId, file_id: FileId, pois: Vec<Poi> },

    #[serde(rename = "evidence:validate")]
    Validate {
        rel_hash: RelHash,
        source: QualifiedName,
        target: QualifiedName,
        kind: RelKind,
        evidence: Evidence,
    },

    #[serde(rename = "rel:reconcile")]
    Reconcile { rel_hash: RelHash },

    #[serde(rename = "graph:commit")]
    GraphCommit {
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        nodes: Vec<Poi>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        edges: Vec<FinalRelationship>,
    },

    /// A job that exhausted its attempts, bound for the dead-letter queue.
    #[serde(rename = "job:failed")]
    JobFailed {
        orig_job_id: JobId,
        error: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error_ctx: Option<String>,
        payload: Box<JobPayload>,
    },
}

impl JobPayload {
    /// The queue this payload belongs on.
    pub fn queue(&self) -> QueueName {
        match self {
            JobPayload::FileAnalyse { .. } => QueueName::FileAnalysis,
            JobPayload::DirectoryResolve { .. } => QueueName::DirectoryResolution,
            JobPayload::GlobalResolve { .. } => QueueName::GlobalResolution,
            JobPayload::DirectoryAggregate { .. } => QueueName::DirectoryAggregation,
            JobPayload::ResolvePois { .. } => QueueName::RelationshipResolution,
            JobPayload::Validate { .. } => QueueName::Validation,
            JobPayload::Reconcile { .. } => QueueName::Reconciliation,
            JobPayload::GraphCommit { .. } => QueueName::GraphIngestion,
            JobPayload::JobFailed { .. } => QueueName::FailedJobs,
        }
    }

    /// The run this payload belongs to, when it carries one.
    pub fn run_id(&self) -> Option<RunId> {
        match self {
            JobPayload::FileAnalyse { run_id, .. }
            | JobPayload::DirectoryResolve { run_id, .. }
            | JobPayload::GlobalResolve { run_id }
            | JobPayload::DirectoryAggregate { run_id, .. }
            | JobPayload::ResolvePois { run_id, .. } => Some(*run_id),
            JobPayload::JobFailed { payload, .. } => payload.run_id(),
            JobPayload::Validate { .. } | JobPayload::Reconcile { .. } | JobPayload::GraphCommit { .. } => None,
        }
    }
}

/// Lifecycle of a queued job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum JobState {
    /// Runnable, waiting for a worker.
    Waiting,
    /// Parent job; becomes runnable only when every child settles.
    WaitingChildren,
    /// Leased by a worker.
    Active,
    /// Failed attempt, waiting out its backoff.
    Delayed,
    Completed,
    Failed,
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Completed | JobState::Failed)
    }
}

crate::simple_display! {
    JobState {
        Waiting => "waiting",
        WaitingChildren => "waiting-children",
        Active => "active",
        Delayed => "delayed",
        Completed => "completed",
        Failed => "failed",
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
