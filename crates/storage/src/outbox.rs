// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The transactional outbox.
//!
//! Events are appended in the same transaction as the rows they announce
//! and later published by the outbox publisher, which marks them published
//! in a separate transaction. Publication is at-least-once; downstream
//! writes are idempotent.

use crate::error::StorageError;
use crate::store::Store;
use chrono::Utc;
use sqlx::{Row, Sqlite, Transaction};
use trellis_core::{EventId, JobPayload, QueueName};

/// A pending-publish event row.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboxEvent {
    /// Insertion-ordered row ID.
    pub seq: i64,
    pub event_id: EventId,
    pub topic: QueueName,
    pub payload: JobPayload,
}

fn event_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<OutboxEvent, StorageError> {
    let topic: String = row.try_get("topic")?;
    let topic = topic
        .parse()
        .map_err(|_| StorageError::Corrupt { column: "outbox.topic", value: topic.clone() })?;
    let payload: JobPayload =
        serde_json::from_str(row.try_get::<String, _>("payload_json")?.as_str())?;
    Ok(OutboxEvent {
        seq: row.try_get("id")?,
        event_id: EventId::from_string(row.try_get::<String, _>("event_id")?),
        topic,
        payload,
    })
}

impl Store {
    /// Append an event inside an open transaction.
    pub async fn append_event_tx(
        tx: &mut Transaction<'static, Sqlite>,
        payload: &JobPayload,
    ) -> Result<EventId, StorageError> {
        let event_id = EventId::new();
        sqlx::query(
            "INSERT INTO outbox (event_id, topic, payload_json, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(event_id.as_str())
        .bind(payload.queue().as_str())
        .bind(serde_json::to_string(payload)?)
        .bind(Utc::now().to_rfc3339())
        .execute(&mut **tx)
        .await?;
        Ok(event_id)
    }

    /// Append an event in its own transaction (for workers whose only write
    /// is the event itself).
    pub async fn append_event(&self, payload: &JobPayload) -> Result<EventId, StorageError> {
        let mut tx = self.begin().await?;
        let id = Self::append_event_tx(&mut tx, payload).await?;
        tx.commit().await?;
        Ok(id)
    }

    /// Unpublished events in insertion order.
    pub async fn unpublished_events(&self, limit: usize) -> Result<Vec<OutboxEvent>, StorageError> {
        let rows = sqlx::query(
            "SELECT * FROM outbox WHERE published_at IS NULL ORDER BY id LIMIT ?",
        )
        .bind(limit as i64)
        .fetch_all(self.pool())
        .await?;
        rows.iter().map(event_from_row).collect()
    }

    /// Mark one event published. Separate transaction from the publish
    /// itself, so a crash in between re-publishes (tolerated duplicates).
    pub async fn mark_published(&self, event_id: EventId) -> Result<(), StorageError> {
        sqlx::query("UPDATE outbox SET published_at = ? WHERE event_id = ?")
            .bind(Utc::now().to_rfc3339())
            .bind(event_id.as_str())
            .execute(self.pool())
            .await?;
        Ok(())
    }

    pub async fn count_unpublished(&self) -> Result<u64, StorageError> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM outbox WHERE published_at IS NULL")
            .fetch_one(self.pool())
            .await?;
        Ok(row.try_get::<i64, _>("n")? as u64)
    }

    pub async fn count_outbox_events(&self) -> Result<u64, StorageError> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM outbox").fetch_one(self.pool()).await?;
        Ok(row.try_get::<i64, _>("n")? as u64)
    }
}

#[cfg(test)]
#[path = "outbox_tests.rs"]
mod tests;
