// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-process backend for tests and single-process runs.
//!
//! Mirrors the Redis backend's semantics over a mutex-guarded state table:
//! the same lease, retry, parent-release, counter, and flag behaviour,
//! minus the network.

use crate::backend::Backend;
use crate::error::QueueError;
use crate::job::QueuedJob;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use trellis_core::{Clock, JobId, JobState, QueueName};

#[derive(Default)]
struct State {
    jobs: HashMap<JobId, QueuedJob>,
    waiting: HashMap<QueueName, VecDeque<JobId>>,
    /// `(due_ms, job)` pairs, promoted on reserve.
    delayed: Vec<(u64, JobId)>,
    /// Leased jobs: `job -> (queue, lease deadline)`.
    active: HashMap<JobId, (QueueName, u64)>,
    /// Completed jobs in completion order, pruned to the keep limit.
    completed: VecDeque<JobId>,
    counters: HashMap<String, i64>,
    flags: HashSet<String>,
    closed: bool,
}

/// See module docs.
#[derive(Clone)]
pub struct MemoryBackend<C: Clock> {
    state: Arc<Mutex<State>>,
    clock: C,
    flows: bool,
}

impl<C: Clock> MemoryBackend<C> {
    pub fn new(clock: C) -> Self {
        Self { state: Arc::new(Mutex::new(State::default())), clock, flows: true }
    }

    /// A backend without native parent/child dependencies, forcing the
    /// directory-aggregation counter path.
    pub fn without_flows(clock: C) -> Self {
        Self { flows: false, ..Self::new(clock) }
    }

    /// Snapshot of a job's current state.
    #[cfg(any(test, feature = "test-support"))]
    pub fn job_state(&self, job_id: JobId) -> Option<JobState> {
        self.state.lock().jobs.get(&job_id).map(|j| j.state)
    }

    /// All jobs currently known, in no particular order.
    #[cfg(any(test, feature = "test-support"))]
    pub fn jobs_snapshot(&self) -> Vec<QueuedJob> {
        self.state.lock().jobs.values().cloned().collect()
    }

    #[cfg(any(test, feature = "test-support"))]
    pub fn counter(&self, key: &str) -> Option<i64> {
        self.state.lock().counters.get(key).copied()
    }

    fn promote_due(state: &mut State, now_ms: u64) {
        let mut still_delayed = Vec::new();
        for (due, id) in state.delayed.drain(..) {
            let delayed = state
                .jobs
                .get(&id)
                .map(|j| j.state == JobState::Delayed)
                .unwrap_or(false);
            if !delayed {
                continue;
            }
            if due <= now_ms {
                if let Some(job) = state.jobs.get_mut(&id) {
                    job.state = JobState::Waiting;
                    state.waiting.entry(job.queue).or_default().push_back(id);
                }
            } else {
                still_delayed.push((due, id));
            }
        }
        state.delayed = still_delayed;
    }

    fn release_parent(state: &mut State, parent_id: JobId) {
        if let Some(parent) = state.jobs.get_mut(&parent_id) {
            parent.pending_children = parent.pending_children.saturating_sub(1);
            if parent.pending_children == 0 && parent.state == JobState::WaitingChildren {
                parent.state = JobState::Waiting;
                state.waiting.entry(parent.queue).or_default().push_back(parent_id);
            }
        }
    }
}

#[async_trait]
impl<C: Clock + 'static> Backend for MemoryBackend<C> {
    async fn enqueue(&self, job: &QueuedJob) -> Result<(), QueueError> {
        let mut state = self.state.lock();
        if state.closed {
            return Err(QueueError::Shutdown);
        }
        state.jobs.insert(job.id, job.clone());
        if job.state == JobState::Waiting {
            state.waiting.entry(job.queue).or_default().push_back(job.id);
        }
        Ok(())
    }

    async fn reserve(
        &self,
        queue: QueueName,
        lock_ms: u64,
    ) -> Result<Option<QueuedJob>, QueueError> {
        let now = self.clock.epoch_ms();
        let mut state = self.state.lock();
        if state.closed {
            return Err(QueueError::Shutdown);
        }
        Self::promote_due(&mut state, now);

        let Some(id) = state.waiting.entry(queue).or_default().pop_front() else {
            return Ok(None);
        };
        state.active.insert(id, (queue, now + lock_ms));
        let job = state
            .jobs
            .get_mut(&id)
            .ok_or_else(|| QueueError::JobNotFound(id.to_string()))?;
        job.state = JobState::Active;
        job.attempts_made += 1;
        Ok(Some(job.clone()))
    }

    async fn complete(&self, job_id: JobId) -> Result<(), QueueError> {
        let mut state = self.state.lock();
        state.active.remove(&job_id);

        let (parent, keep) = {
            let job = state
                .jobs
                .get_mut(&job_id)
                .ok_or_else(|| QueueError::JobNotFound(job_id.to_string()))?;
            job.state = JobState::Completed;
            (job.parent, job.opts.keep_completed)
        };

        if self.flows {
            if let Some(parent_id) = parent {
                Self::release_parent(&mut state, parent_id);
            }
        }

        // remove-on-complete: keep the most recent `keep` jobs.
        state.completed.push_back(job_id);
        while state.completed.len() > keep {
            if let Some(old) = state.completed.pop_front() {
                state.jobs.remove(&old);
            }
        }
        Ok(())
    }

    async fn retry(&self, job_id: JobId, error: &str, delay_ms: u64) -> Result<(), QueueError> {
        let now = self.clock.epoch_ms();
        let mut state = self.state.lock();
        state.active.remove(&job_id);
        let job = state
            .jobs
            .get_mut(&job_id)
            .ok_or_else(|| QueueError::JobNotFound(job_id.to_string()))?;
        job.state = JobState::Delayed;
        job.last_error = Some(error.to_string());
        state.delayed.push((now + delay_ms, job_id));
        Ok(())
    }

    async fn fail(&self, job_id: JobId, error: &str) -> Result<(), QueueError> {
        let mut state = self.state.lock();
        state.active.remove(&job_id);
        state.delayed.retain(|(_, candidate)| *candidate != job_id);
        let parent = {
            let job = state
                .jobs
                .get_mut(&job_id)
                .ok_or_else(|| QueueError::JobNotFound(job_id.to_string()))?;
            job.state = JobState::Failed;
            job.last_error = Some(error.to_string());
            job.parent
        };
        // Terminal failure still settles the child: parents gate on every
        // child reaching a terminal state, not on every child succeeding.
        if self.flows {
            if let Some(parent_id) = parent {
                Self::release_parent(&mut state, parent_id);
            }
        }
        Ok(())
    }

    async fn reclaim_stalled(&self, queue: QueueName) -> Result<u64, QueueError> {
        let now = self.clock.epoch_ms();
        let mut state = self.state.lock();
        let expired: Vec<JobId> = state
            .active
            .iter()
            .filter(|(_, (q, deadline))| *q == queue && *deadline <= now)
            .map(|(id, _)| *id)
            .collect();
        for id in &expired {
            state.active.remove(id);
            if let Some(job) = state.jobs.get_mut(id) {
                job.state = JobState::Waiting;
                state.waiting.entry(queue).or_default().push_back(*id);
            }
        }
        Ok(expired.len() as u64)
    }

    async fn remove_waiting(&self, job_ids: &[JobId]) -> Result<(), QueueError> {
        let mut state = self.state.lock();
        for id in job_ids {
            let removable = state
                .jobs
                .get(id)
                .map(|j| matches!(j.state, JobState::Waiting | JobState::WaitingChildren))
                .unwrap_or(false);
            if !removable {
                continue;
            }
            state.jobs.remove(id);
            for queue in state.waiting.values_mut() {
                queue.retain(|candidate| candidate != id);
            }
            state.delayed.retain(|(_, candidate)| candidate != id);
        }
        Ok(())
    }

    async fn job(&self, job_id: JobId) -> Result<Option<QueuedJob>, QueueError> {
        Ok(self.state.lock().jobs.get(&job_id).cloned())
    }

    async fn depth(&self, queue: QueueName) -> Result<u64, QueueError> {
        let state = self.state.lock();
        let waiting = state.waiting.get(&queue).map(|q| q.len() as u64).unwrap_or(0);
        let delayed = state
            .delayed
            .iter()
            .filter(|(_, id)| state.jobs.get(id).map(|j| j.queue == queue).unwrap_or(false))
            .count() as u64;
        Ok(waiting + delayed)
    }

    async fn in_flight(&self, queue: QueueName) -> Result<u64, QueueError> {
        Ok(self
            .state
            .lock()
            .active
            .values()
            .filter(|(q, _)| *q == queue)
            .count() as u64)
    }

    async fn set_counter(&self, key: &str, value: i64) -> Result<(), QueueError> {
        self.state.lock().counters.insert(key.to_string(), value);
        Ok(())
    }

    async fn decrement_counter(&self, key: &str) -> Result<i64, QueueError> {
        let mut state = self.state.lock();
        let value = state.counters.entry(key.to_string()).or_insert(0);
        *value -= 1;
        Ok(*value)
    }

    async fn set_flag_nx(&self, key: &str) -> Result<bool, QueueError> {
        Ok(self.state.lock().flags.insert(key.to_string()))
    }

    fn supports_flows(&self) -> bool {
        self.flows
    }

    async fn close(&self) -> Result<(), QueueError> {
        self.state.lock().closed = true;
        Ok(())
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
