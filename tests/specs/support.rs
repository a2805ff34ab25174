// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Spec harness: every collaborator in-process.

use std::sync::Arc;
use trellis_core::{LlmConfig, SystemClock, TrellisConfig, TriangulationConfig};
use trellis_graph::MemoryGraph;
use trellis_llm::{FakeTransport, LlmClient, TokenCounter};
use trellis_pipeline::{PipelineContext, PipelineRunner};
use trellis_queue::{Backend, MemoryBackend, QueueManager};
use trellis_storage::Store;

pub struct Spec {
    pub ctx: Arc<PipelineContext<SystemClock>>,
    pub backend: Arc<MemoryBackend<SystemClock>>,
    pub transport: Arc<FakeTransport>,
    pub graph: Arc<MemoryGraph>,
    pub dir: tempfile::TempDir,
}

impl Spec {
    pub async fn new(tweak: impl FnOnce(&mut TrellisConfig)) -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let backend = Arc::new(MemoryBackend::new(SystemClock));
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
            triangulation: TriangulationConfig {
                grace_ms: 200,
                ..TriangulationConfig::default()
            },
            ..TrellisConfig::default()
        };
        config.run.target_root = dir.path().to_path_buf();
        tweak(&mut config);

        let queues = Arc::new(QueueManager::new(
            backend.clone() as Arc<dyn Backend>,
            config.queue.clone(),
        ));
        let llm = Arc::new(LlmClient::new(transport.clone(), config.llm.clone()));
        let store = Store::in_memory().await.expect("store");
        let tokens = TokenCounter::new().expect("tokenizer");

        let ctx = Arc::new(PipelineContext {
            store,
            queues,
            llm,
            graph: graph.clone(),
            tokens,
            config,
            clock: SystemClock,
        });

        Self { ctx, backend, transport, graph, dir }
    }

    pub fn write_file(&self, relative: &str, content: &str) -> String {
        let path = self.dir.path().join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("mkdir");
        }
        std::fs::write(&path, content).expect("write");
        path.canonicalize().expect("canonicalize").display().to_string()
    }

    /// Start the pipeline, execute one run to quiescence, and shut down.
    pub async fn run(&self) -> trellis_pipeline::RunOutcome {
        let mut runner = PipelineRunner::new(self.ctx.clone());
        runner.start();
        let outcome = tokio::time::timeout(
            std::time::Duration::from_secs(30),
            runner.run(self.dir.path()),
        )
        .await
        .expect("run timed out")
        .expect("run failed");
        runner.shutdown().await;
        outcome
    }
}

/// A minimal file-analysis response: the given POIs and relationships.
pub fn analysis_json(pois: &[(&str, &str, &str)], rels: &[(&str, &str, &str, f64)]) -> String {
    let pois: Vec<String> = pois
        .iter()
        .map(|(kind, name, qn)| {
            format!(
                r#"{{"kind": "{kind}", "name": "{name}", "qualified_name": "{qn}",
                     "start_line": 1, "end_line": 5}}"#
            )
        })
        .collect();
    let rels: Vec<String> = rels
        .iter()
        .map(|(src, tgt, kind, confidence)| {
            format!(
                r#"{{"source": "{src}", "target": "{tgt}", "kind": "{kind}",
                     "confidence": {confidence}}}"#
            )
        })
        .collect();
    format!(r#"{{"pois": [{}], "relationships": [{}]}}"#, pois.join(","), rels.join(","))
}

/// A directory-resolution response.
pub fn directory_json(rels: &[(&str, &str, &str, f64)], summary: &str) -> String {
    let rels: Vec<String> = rels
        .iter()
        .map(|(src, tgt, kind, confidence)| {
            format!(
                r#"{{"source": "{src}", "target": "{tgt}", "kind": "{kind}",
                     "confidence": {confidence}}}"#
            )
        })
        .collect();
    format!(r#"{{"relationships": [{}], "summary": "{summary}"}}"#, rels.join(","))
}
