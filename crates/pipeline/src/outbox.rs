// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The outbox publisher: the bridge from the store to the queue.

use futures_util::future::BoxFuture;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use trellis_core::{JobPayload, OutboxConfig};
use trellis_queue::QueueError;
use trellis_storage::Store;

/// How the publisher hands payloads to the queue. Injected at construction
/// so this module never holds a queue-manager reference — the manager, the
/// workers, and the publisher stay acyclic.
pub type PublishFn =
    Arc<dyn Fn(JobPayload) -> BoxFuture<'static, Result<(), QueueError>> + Send + Sync>;

/// Single long-running drain loop. Publishes each unpublished event, then
/// marks it published in a separate transaction; a crash in between means a
/// duplicate publication, which downstream idempotency absorbs.
pub struct OutboxPublisher {
    store: Store,
    publish: PublishFn,
    config: OutboxConfig,
}

impl OutboxPublisher {
    pub fn new(store: Store, publish: PublishFn, config: OutboxConfig) -> Self {
        Self { store, publish, config }
    }

    pub fn spawn(self, cancel: &CancellationToken) -> JoinHandle<()> {
        let cancel = cancel.child_token();
        let interval = Duration::from_millis(self.config.poll_interval_ms.max(1));
        tokio::spawn(async move {
            loop {
                match self.drain_once().await {
                    // Keep draining while the backlog is full.
                    Ok(published) if published >= self.config.batch_size as u64 => continue,
                    Ok(_) => {}
                    Err(e) => tracing::warn!(error = %e, "outbox poll failed"),
                }
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(interval) => {}
                }
            }
        })
    }

    /// One poll: publish pending events in insertion order. Returns how many
    /// were published. A failed publication stops the pass — the event stays
    /// unpublished and per-topic ordering is preserved for the next poll.
    pub async fn drain_once(&self) -> Result<u64, trellis_storage::StorageError> {
        let events = self.store.unpublished_events(self.config.batch_size).await?;
        let mut published = 0u64;
        for event in events {
            match (self.publish)(event.payload.clone()).await {
                Ok(()) => {
                    self.store.mark_published(event.event_id).await?;
                    published += 1;
                }
                Err(e) => {
                    tracing::warn!(
                        event_id = %event.event_id,
                        topic = %event.topic,
                        error = %e,
                        "publish failed, will retry next poll"
                    );
                    break;
                }
            }
        }
        Ok(published)
    }
}

#[cfg(test)]
#[path = "outbox_tests.rs"]
mod tests;
