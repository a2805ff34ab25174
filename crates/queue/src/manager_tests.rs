// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::memory::MemoryBackend;
use trellis_core::{FakeClock, FileId, JobPayload, JobState, RunId};

fn manager() -> (QueueManager, Arc<MemoryBackend<FakeClock>>) {
    let backend = Arc::new(MemoryBackend::new(FakeClock::new()));
    let manager = QueueManager::new(backend.clone(), QueueConfig::default());
    (manager, backend)
}

#[test]
fn known_queue_names_resolve() {
    let (manager, _) = manager();
    assert_eq!(manager.queue("validation-queue").unwrap(), QueueName::Validation);
}

#[test]
fn unknown_queue_names_are_rejected() {
    let (manager, _) = manager();
    let err = manager.queue("valdation-queue").unwrap_err();
    assert!(matches!(err, QueueError::UnknownQueue(_)));
}

#[tokio::test]
async fn enqueue_applies_default_options() {
    let (manager, backend) = manager();
    let id = manager
        .enqueue(JobPayload::GlobalResolve { run_id: RunId::from_string("run-1") })
        .await
        .unwrap();

    let job = backend.job(id).await.unwrap().unwrap();
    assert_eq!(job.opts.attempts, 3);
    assert_eq!(job.opts.keep_completed, 1_000);
}

#[tokio::test]
async fn enqueue_tree_creates_every_job() {
    let (manager, backend) = manager();
    let groups =
        vec![("/src".to_string(), vec![(FileId::new(), "/src/a.js".to_string())])];
    let tree = crate::flow::JobTree::build("run-1".into(), &groups, manager.default_opts());

    manager.enqueue_tree(&tree).await.unwrap();

    assert_eq!(backend.job_state(tree.root.id), Some(JobState::WaitingChildren));
    assert_eq!(backend.depth(QueueName::FileAnalysis).await.unwrap(), 1);
}

#[tokio::test]
async fn enqueue_tree_rolls_back_on_failure() {
    let backend = Arc::new(MemoryBackend::new(FakeClock::new()));
    let manager = QueueManager::new(backend.clone(), QueueConfig::default());
    let groups =
        vec![("/src".to_string(), vec![(FileId::new(), "/src/a.js".to_string())])];
    let tree = crate::flow::JobTree::build("run-1".into(), &groups, manager.default_opts());

    // Closing the backend makes the first enqueue fail; nothing survives.
    backend.close().await.unwrap();
    assert!(manager.enqueue_tree(&tree).await.is_err());
    assert!(backend.jobs_snapshot().is_empty());
}

#[tokio::test]
async fn cache_primitives_pass_through() {
    let (manager, _) = manager();
    manager.set_counter("dir:x", 2).await.unwrap();
    assert_eq!(manager.decrement_counter("dir:x").await.unwrap(), 1);
    assert!(manager.set_flag_nx("seal:x").await.unwrap());
    assert!(!manager.set_flag_nx("seal:x").await.unwrap());
}

#[tokio::test]
async fn shutdown_closes_the_backend() {
    let (manager, backend) = manager();
    manager.shutdown().await;
    assert!(matches!(
        backend.enqueue(&QueuedJob::new(
            JobPayload::GlobalResolve { run_id: RunId::from_string("run-1") },
            JobOptions::default(),
        )).await,
        Err(QueueError::Shutdown)
    ));
}
