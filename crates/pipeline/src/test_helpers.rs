// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixtures for worker tests: in-memory everything.

use crate::context::PipelineContext;
use std::path::Path;
use std::sync::Arc;
use trellis_core::{FakeClock, LlmConfig, TrellisConfig, TriangulationConfig};
use trellis_graph::MemoryGraph;
use trellis_llm::{FakeTransport, LlmClient, TokenCounter};
use trellis_queue::{MemoryBackend, QueueManager};
use trellis_storage::Store;

pub(crate) struct Harness {
    pub ctx: Arc<PipelineContext<FakeClock>>,
    pub clock: FakeClock,
    pub backend: Arc<MemoryBackend<FakeClock>>,
    pub transport: Arc<FakeTransport>,
    pub graph: Arc<MemoryGraph>,
    pub dir: tempfile::TempDir,
}

impl Harness {
    pub(crate) async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    pub(crate) async fn with_config(tweak: impl FnOnce(&mut TrellisConfig)) -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let clock = FakeClock::new();
        let backend = Arc::new(MemoryBackend::new(clock.clone()));
        let transport = Arc::new(FakeTransport::new());
        let graph = Arc::new(MemoryGraph::new());

        let mut config = TrellisConfig {
            llm: LlmConfig {
                max_attempts: 2,
                backoff_initial_ms: 1,
                backoff_cap_ms: 1,
                timeout_ms: 5_000,
                ..LlmConfig::default()
            },
            triangulation: TriangulationConfig { grace_ms: 200, ..TriangulationConfig::default() },
            ..TrellisConfig::default()
        };
        config.run.target_root = dir.path().to_path_buf();
        tweak(&mut config);

        let queues = Arc::new(QueueManager::new(
            backend.clone() as Arc<dyn trellis_queue::Backend>,
            config.queue.clone(),
        ));
        let llm = Arc::new(LlmClient::new(transport.clone(), config.llm.clone()));
        let store = Store::in_memory().await.expect("in-memory store");
        let tokens = TokenCounter::new().expect("tokenizer");

        let ctx = Arc::new(PipelineContext {
            store,
            queues,
            llm,
            graph: graph.clone(),
            tokens,
            config,
            clock: clock.clone(),
        });

        Self { ctx, clock, backend, transport, graph, dir }
    }

    /// Write a file under the harness root, returning its absolute path.
    pub(crate) fn write_file(&self, relative: &str, content: &str) -> String {
        let path = self.dir.path().join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("mkdir");
        }
        std::fs::write(&path, content).expect("write");
        path.canonicalize().expect("canonicalize").display().to_string()
    }
}
