// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The queued-job envelope.

use crate::options::JobOptions;
use serde::{Deserialize, Serialize};
use trellis_core::{JobId, JobPayload, JobState, QueueName};

/// A job as stored in the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueuedJob {
    pub id: JobId,
    pub queue: QueueName,
    pub payload: JobPayload,
    pub state: JobState,
    /// Attempts consumed so far (reservations, including stalled reclaims).
    pub attempts_made: u32,
    pub opts: JobOptions,
    /// Parent released when this job (and its siblings) complete.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<JobId>,
    /// For parents: children still outstanding.
    #[serde(default)]
    pub pending_children: u32,
    /// Most recent failure, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

impl QueuedJob {
    /// A runnable job for the payload's own queue.
    pub fn new(payload: JobPayload, opts: JobOptions) -> Self {
        Self {
            id: JobId::new(),
            queue: payload.queue(),
            payload,
            state: JobState::Waiting,
            attempts_made: 0,
            opts,
            parent: None,
            pending_children: 0,
            last_error: None,
        }
    }

    /// A parent that waits for `children` completions before it runs.
    pub fn new_parent(payload: JobPayload, opts: JobOptions, children: u32) -> Self {
        let mut job = Self::new(payload, opts);
        job.pending_children = children;
        job.state =
            if children == 0 { JobState::Waiting } else { JobState::WaitingChildren };
        job
    }

    pub fn with_parent(mut self, parent: JobId) -> Self {
        self.parent = Some(parent);
        self
    }

    /// True once every attempt has been consumed.
    pub fn attempts_exhausted(&self) -> bool {
        self.attempts_made >= self.opts.attempts
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
