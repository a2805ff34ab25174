// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_helpers::Harness;
use trellis_queue::Backend as _;
use futures_util::FutureExt;
use std::sync::atomic::{AtomicBool, Ordering};
use trellis_core::{JobPayload, OutboxConfig, QueueName, RunId};

fn queue_publish(h: &Harness) -> PublishFn {
    let queues = Arc::clone(&h.ctx.queues);
    Arc::new(move |payload| {
        let queues = Arc::clone(&queues);
        async move { queues.enqueue(payload).await.map(|_| ()) }.boxed()
    })
}

fn payload(run: &str) -> JobPayload {
    JobPayload::GlobalResolve { run_id: RunId::from_string(run) }
}

#[tokio::test]
async fn drain_publishes_in_insertion_order_and_marks_published() {
    let h = Harness::new().await;
    for run in ["run-1", "run-2", "run-3"] {
        h.ctx.store.append_event(&payload(run)).await.unwrap();
    }

    let publisher =
        OutboxPublisher::new(h.ctx.store.clone(), queue_publish(&h), OutboxConfig::default());
    assert_eq!(publisher.drain_once().await.unwrap(), 3);

    assert_eq!(h.ctx.store.count_unpublished().await.unwrap(), 0);
    assert_eq!(h.backend.depth(QueueName::GlobalResolution).await.unwrap(), 3);

    // A later poll republishes nothing.
    assert_eq!(publisher.drain_once().await.unwrap(), 0);
    assert_eq!(h.backend.depth(QueueName::GlobalResolution).await.unwrap(), 3);
}

#[tokio::test]
async fn failed_publish_keeps_the_event_for_the_next_poll() {
    let h = Harness::new().await;
    h.ctx.store.append_event(&payload("run-1")).await.unwrap();
    h.ctx.store.append_event(&payload("run-2")).await.unwrap();

    let fail = Arc::new(AtomicBool::new(true));
    let queues = Arc::clone(&h.ctx.queues);
    let publish: PublishFn = {
        let fail = fail.clone();
        Arc::new(move |payload| {
            let queues = Arc::clone(&queues);
            let fail = fail.clone();
            async move {
                if fail.load(Ordering::SeqCst) {
                    return Err(trellis_queue::QueueError::Backend("down".into()));
                }
                queues.enqueue(payload).await.map(|_| ())
            }
            .boxed()
        })
    };

    let publisher =
        OutboxPublisher::new(h.ctx.store.clone(), publish, OutboxConfig::default());
    assert_eq!(publisher.drain_once().await.unwrap(), 0);
    assert_eq!(h.ctx.store.count_unpublished().await.unwrap(), 2);

    fail.store(false, Ordering::SeqCst);
    assert_eq!(publisher.drain_once().await.unwrap(), 2);
    assert_eq!(h.ctx.store.count_unpublished().await.unwrap(), 0);
}

#[tokio::test]
async fn batch_size_caps_one_poll() {
    let h = Harness::new().await;
    for i in 0..5 {
        h.ctx.store.append_event(&payload(&format!("run-{i}"))).await.unwrap();
    }

    let config = OutboxConfig { batch_size: 2, ..OutboxConfig::default() };
    let publisher = OutboxPublisher::new(h.ctx.store.clone(), queue_publish(&h), config);
    assert_eq!(publisher.drain_once().await.unwrap(), 2);
    assert_eq!(h.ctx.store.count_unpublished().await.unwrap(), 3);
}

#[tokio::test]
async fn events_survive_until_published_after_a_restart() {
    let h = Harness::new().await;
    h.ctx.store.append_event(&payload("run-1")).await.unwrap();

    // First publisher instance is dropped before draining (crash between
    // commit and publish).
    let first =
        OutboxPublisher::new(h.ctx.store.clone(), queue_publish(&h), OutboxConfig::default());
    drop(first);

    // A fresh instance picks the event up: at-least-once delivery.
    let second =
        OutboxPublisher::new(h.ctx.store.clone(), queue_publish(&h), OutboxConfig::default());
    assert_eq!(second.drain_once().await.unwrap(), 1);
    assert_eq!(h.backend.depth(QueueName::GlobalResolution).await.unwrap(), 1);
}
