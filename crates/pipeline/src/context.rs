// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared worker dependencies.

use std::sync::Arc;
use trellis_core::{Clock, TrellisConfig};
use trellis_graph::GraphSink;
use trellis_llm::{LlmClient, TokenCounter};
use trellis_queue::QueueManager;
use trellis_storage::Store;

/// Everything a worker needs, injected by construction. Clones share the
/// underlying handles.
pub struct PipelineContext<C: Clock> {
    pub store: Store,
    pub queues: Arc<QueueManager>,
    pub llm: Arc<LlmClient>,
    pub graph: Arc<dyn GraphSink>,
    pub tokens: TokenCounter,
    pub config: TrellisConfig,
    pub clock: C,
}

impl<C: Clock> PipelineContext<C> {
    pub fn now_ms(&self) -> u64 {
        self.clock.epoch_ms()
    }
}
