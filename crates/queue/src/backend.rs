// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The queue-backend contract.
//!
//! The operations here are exactly what the manager and workers consume: list
//! push/reserve/ack, delayed retry, lease reclaim, atomic counters, and a
//! set-if-absent flag (the evidence-seal compare-and-swap). Implementations:
//! [`crate::RedisBackend`] and [`crate::MemoryBackend`].

use crate::error::QueueError;
use crate::job::QueuedJob;
use async_trait::async_trait;
use trellis_core::{JobId, QueueName};

#[async_trait]
pub trait Backend: Send + Sync {
    /// Store and enqueue a job. Jobs in `WaitingChildren` are stored but not
    /// made runnable.
    async fn enqueue(&self, job: &QueuedJob) -> Result<(), QueueError>;

    /// Reserve the next runnable job, leasing it for `lock_ms`. Also
    /// promotes delayed jobs whose backoff has expired.
    async fn reserve(
        &self,
        queue: QueueName,
        lock_ms: u64,
    ) -> Result<Option<QueuedJob>, QueueError>;

    /// Acknowledge success. Decrements the parent's outstanding-children
    /// count; a parent reaching zero becomes runnable.
    async fn complete(&self, job_id: JobId) -> Result<(), QueueError>;

    /// Record a failed attempt and re-queue after `delay_ms`.
    async fn retry(&self, job_id: JobId, error: &str, delay_ms: u64) -> Result<(), QueueError>;

    /// Record a terminal failure. The job is kept (remove-on-fail: never).
    async fn fail(&self, job_id: JobId, error: &str) -> Result<(), QueueError>;

    /// Return expired leases to the waiting list. Each reclaim consumes an
    /// attempt. Returns the number of jobs reclaimed.
    async fn reclaim_stalled(&self, queue: QueueName) -> Result<u64, QueueError>;

    /// Remove jobs that have not started (producer rollback, run cancel).
    /// Active jobs are left to finish.
    async fn remove_waiting(&self, job_ids: &[JobId]) -> Result<(), QueueError>;

    /// Fetch a job in any state.
    async fn job(&self, job_id: JobId) -> Result<Option<QueuedJob>, QueueError>;

    async fn depth(&self, queue: QueueName) -> Result<u64, QueueError>;

    /// Jobs currently leased by workers on this queue.
    async fn in_flight(&self, queue: QueueName) -> Result<u64, QueueError>;

    // --- cache-style primitives ---

    /// Initialise an atomic counter.
    async fn set_counter(&self, key: &str, value: i64) -> Result<(), QueueError>;

    /// Atomically decrement, returning the new value.
    async fn decrement_counter(&self, key: &str) -> Result<i64, QueueError>;

    /// Set-if-absent. Returns true when this caller won the flag — the
    /// compare-and-swap behind exactly-once sealing.
    async fn set_flag_nx(&self, key: &str) -> Result<bool, QueueError>;

    /// Whether parent/child dependencies are handled natively. When false,
    /// the pipeline falls back to directory-aggregation counters.
    fn supports_flows(&self) -> bool {
        true
    }

    /// Drop the connection. Called once, after workers have drained.
    async fn close(&self) -> Result<(), QueueError>;
}
