// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::options::JobOptions;
use std::time::Duration;
use trellis_core::{FakeClock, JobPayload, RunId};

fn backend() -> (MemoryBackend<FakeClock>, FakeClock) {
    let clock = FakeClock::new();
    (MemoryBackend::new(clock.clone()), clock)
}

fn job(run: &str) -> QueuedJob {
    QueuedJob::new(
        JobPayload::GlobalResolve { run_id: RunId::from_string(run) },
        JobOptions::default(),
    )
}

#[tokio::test]
async fn reserve_returns_jobs_in_fifo_order() {
    let (backend, _) = backend();
    let a = job("run-a");
    let b = job("run-b");
    backend.enqueue(&a).await.unwrap();
    backend.enqueue(&b).await.unwrap();

    let first = backend.reserve(QueueName::GlobalResolution, 1_000).await.unwrap().unwrap();
    let second = backend.reserve(QueueName::GlobalResolution, 1_000).await.unwrap().unwrap();
    assert_eq!(first.id, a.id);
    assert_eq!(second.id, b.id);
    assert_eq!(first.state, JobState::Active);
    assert_eq!(first.attempts_made, 1);

    assert!(backend.reserve(QueueName::GlobalResolution, 1_000).await.unwrap().is_none());
}

#[tokio::test]
async fn complete_releases_the_parent_only_after_all_children() {
    let (backend, _) = backend();
    let parent = QueuedJob::new_parent(
        JobPayload::GlobalResolve { run_id: RunId::from_string("run-1") },
        JobOptions::default(),
        2,
    );
    let child_a = job("run-1").with_parent(parent.id);
    let child_b = job("run-1").with_parent(parent.id);

    backend.enqueue(&parent).await.unwrap();
    backend.enqueue(&child_a).await.unwrap();
    backend.enqueue(&child_b).await.unwrap();

    // Parent is not runnable while children are outstanding.
    let r1 = backend.reserve(QueueName::GlobalResolution, 1_000).await.unwrap().unwrap();
    backend.complete(r1.id).await.unwrap();
    assert_eq!(backend.job_state(parent.id), Some(JobState::WaitingChildren));

    let r2 = backend.reserve(QueueName::GlobalResolution, 1_000).await.unwrap().unwrap();
    backend.complete(r2.id).await.unwrap();
    assert_eq!(backend.job_state(parent.id), Some(JobState::Waiting));

    let released = backend.reserve(QueueName::GlobalResolution, 1_000).await.unwrap().unwrap();
    assert_eq!(released.id, parent.id);
}

#[tokio::test]
async fn retry_delays_until_backoff_expires() {
    let (backend, clock) = backend();
    let j = job("run-1");
    backend.enqueue(&j).await.unwrap();

    let reserved = backend.reserve(QueueName::GlobalResolution, 1_000).await.unwrap().unwrap();
    backend.retry(reserved.id, "boom", 5_000).await.unwrap();

    assert!(backend.reserve(QueueName::GlobalResolution, 1_000).await.unwrap().is_none());
    assert_eq!(backend.job_state(j.id), Some(JobState::Delayed));

    clock.advance(Duration::from_millis(5_001));
    let again = backend.reserve(QueueName::GlobalResolution, 1_000).await.unwrap().unwrap();
    assert_eq!(again.id, j.id);
    assert_eq!(again.attempts_made, 2);
    assert_eq!(again.last_error.as_deref(), Some("boom"));
}

#[tokio::test]
async fn failed_jobs_are_kept_forever() {
    let (backend, _) = backend();
    let j = job("run-1");
    backend.enqueue(&j).await.unwrap();
    let reserved = backend.reserve(QueueName::GlobalResolution, 1_000).await.unwrap().unwrap();
    backend.fail(reserved.id, "fatal").await.unwrap();

    let stored = backend.job(j.id).await.unwrap().unwrap();
    assert_eq!(stored.state, JobState::Failed);
    assert_eq!(stored.last_error.as_deref(), Some("fatal"));
}

#[tokio::test]
async fn stalled_jobs_return_to_the_waiting_list() {
    let (backend, clock) = backend();
    let j = job("run-1");
    backend.enqueue(&j).await.unwrap();
    backend.reserve(QueueName::GlobalResolution, 1_000).await.unwrap().unwrap();

    // Lease still valid: nothing reclaimed.
    assert_eq!(backend.reclaim_stalled(QueueName::GlobalResolution).await.unwrap(), 0);

    clock.advance(Duration::from_millis(1_001));
    assert_eq!(backend.reclaim_stalled(QueueName::GlobalResolution).await.unwrap(), 1);
    assert_eq!(backend.job_state(j.id), Some(JobState::Waiting));
}

#[tokio::test]
async fn remove_waiting_skips_active_jobs() {
    let (backend, _) = backend();
    let waiting = job("run-1");
    let active = job("run-1");
    backend.enqueue(&active).await.unwrap();
    backend.enqueue(&waiting).await.unwrap();
    backend.reserve(QueueName::GlobalResolution, 1_000).await.unwrap().unwrap();

    backend.remove_waiting(&[waiting.id, active.id]).await.unwrap();

    assert!(backend.job(waiting.id).await.unwrap().is_none());
    assert!(backend.job(active.id).await.unwrap().is_some());
}

#[tokio::test]
async fn completed_jobs_prune_to_the_keep_limit() {
    let (backend, _) = backend();
    let opts = JobOptions { keep_completed: 2, ..JobOptions::default() };
    let mut ids = Vec::new();
    for run in ["run-1", "run-2", "run-3"] {
        let j = QueuedJob::new(
            JobPayload::GlobalResolve { run_id: RunId::from_string(run) },
            opts,
        );
        ids.push(j.id);
        backend.enqueue(&j).await.unwrap();
        let r = backend.reserve(QueueName::GlobalResolution, 1_000).await.unwrap().unwrap();
        backend.complete(r.id).await.unwrap();
    }

    assert!(backend.job(ids[0]).await.unwrap().is_none());
    assert!(backend.job(ids[2]).await.unwrap().is_some());
}

#[tokio::test]
async fn counters_decrement_atomically() {
    let (backend, _) = backend();
    backend.set_counter("dir:/src", 3).await.unwrap();
    assert_eq!(backend.decrement_counter("dir:/src").await.unwrap(), 2);
    assert_eq!(backend.decrement_counter("dir:/src").await.unwrap(), 1);
    assert_eq!(backend.decrement_counter("dir:/src").await.unwrap(), 0);
}

#[tokio::test]
async fn flag_is_won_exactly_once() {
    let (backend, _) = backend();
    assert!(backend.set_flag_nx("seal:abc").await.unwrap());
    assert!(!backend.set_flag_nx("seal:abc").await.unwrap());
    assert!(backend.set_flag_nx("seal:other").await.unwrap());
}

#[tokio::test]
async fn closed_backend_rejects_work() {
    let (backend, _) = backend();
    backend.close().await.unwrap();
    let err = backend.enqueue(&job("run-1")).await.unwrap_err();
    assert!(matches!(err, QueueError::Shutdown));
}

#[tokio::test]
async fn without_flows_does_not_release_parents() {
    let clock = FakeClock::new();
    let backend = MemoryBackend::without_flows(clock);
    assert!(!backend.supports_flows());

    let parent = QueuedJob::new_parent(
        JobPayload::GlobalResolve { run_id: RunId::from_string("run-1") },
        JobOptions::default(),
        1,
    );
    let child = job("run-1").with_parent(parent.id);
    backend.enqueue(&parent).await.unwrap();
    backend.enqueue(&child).await.unwrap();

    let r = backend.reserve(QueueName::GlobalResolution, 1_000).await.unwrap().unwrap();
    backend.complete(r.id).await.unwrap();
    assert_eq!(backend.job_state(parent.id), Some(JobState::WaitingChildren));
}
