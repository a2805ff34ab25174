// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The graph-store contract the builder consumes.

use crate::batch::GraphBatch;
use crate::error::GraphError;
use async_trait::async_trait;

/// Applies one batch atomically. Re-applying the same batch must be a no-op
/// (MERGE semantics) — the outbox publisher delivers at least once.
#[async_trait]
pub trait GraphSink: Send + Sync {
    async fn apply(&self, batch: &GraphBatch) -> Result<(), GraphError>;
}
