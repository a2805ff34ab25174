// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A sink that records nothing: for runs without a graph store attached,
//! where the operational store's final_relationships table is the output.

use crate::batch::GraphBatch;
use crate::error::GraphError;
use crate::sink::GraphSink;
use async_trait::async_trait;

#[derive(Debug, Default)]
pub struct LoggingSink;

#[async_trait]
impl GraphSink for LoggingSink {
    async fn apply(&self, batch: &GraphBatch) -> Result<(), GraphError> {
        tracing::info!(
            nodes = batch.nodes.len(),
            edges = batch.edges.len(),
            refactorings = batch.refactorings.len(),
            "graph batch discarded (no graph store configured)"
        );
        Ok(())
    }
}
