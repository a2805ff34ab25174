// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory sink with MERGE semantics, for tests.

use crate::batch::{GraphBatch, RefactoringEvent};
use crate::error::GraphError;
use crate::sink::GraphSink;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use trellis_core::{PoiKind, RelKind};

#[derive(Debug, Clone, PartialEq)]
pub struct StoredNode {
    pub kind: PoiKind,
    pub name: String,
    pub signature: Option<String>,
    pub start_line: u32,
    pub end_line: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoredEdge {
    pub confidence: f64,
    pub rel_hash: String,
}

#[derive(Default)]
struct State {
    /// qualified-name -> node (MERGE key).
    nodes: BTreeMap<String, StoredNode>,
    /// (source, kind, target) -> edge (MERGE key).
    edges: BTreeMap<(String, RelKind, String), StoredEdge>,
    batches_applied: u64,
    fail_next: bool,
}

/// See module docs.
#[derive(Default)]
pub struct MemoryGraph {
    state: Mutex<State>,
}

impl MemoryGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node_count(&self) -> usize {
        self.state.lock().nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.state.lock().edges.len()
    }

    pub fn batches_applied(&self) -> u64 {
        self.state.lock().batches_applied
    }

    pub fn node(&self, qualified_name: &str) -> Option<StoredNode> {
        self.state.lock().nodes.get(qualified_name).cloned()
    }

    pub fn edge(&self, source: &str, kind: RelKind, target: &str) -> Option<StoredEdge> {
        self.state
            .lock()
            .edges
            .get(&(source.to_string(), kind, target.to_string()))
            .cloned()
    }

    /// Make the next apply fail, to exercise batch retry paths.
    pub fn fail_next_batch(&self) {
        self.state.lock().fail_next = true;
    }
}

#[async_trait]
impl GraphSink for MemoryGraph {
    async fn apply(&self, batch: &GraphBatch) -> Result<(), GraphError> {
        let mut state = self.state.lock();
        if state.fail_next {
            state.fail_next = false;
            return Err(GraphError::Store("injected batch failure".to_string()));
        }

        for event in &batch.refactorings {
            match event {
                RefactoringEvent::FileDeleted { path } => {
                    let prefix = format!("{path}--");
                    state.nodes.retain(|qn, _| !qn.starts_with(&prefix));
                    state
                        .edges
                        .retain(|(s, _, t), _| !s.starts_with(&prefix) && !t.starts_with(&prefix));
                }
                RefactoringEvent::FileRenamed { old_path, new_path } => {
                    let old_prefix = format!("{old_path}--");
                    let new_prefix = format!("{new_path}--");
                    let rename = |qn: &str| {
                        qn.strip_prefix(old_prefix.as_str())
                            .map(|rest| format!("{new_prefix}{rest}"))
                            .unwrap_or_else(|| qn.to_string())
                    };
                    state.nodes = state
                        .nodes
                        .iter()
                        .map(|(qn, node)| (rename(qn), node.clone()))
                        .collect();
                    state.edges = state
                        .edges
                        .iter()
                        .map(|((s, k, t), edge)| ((rename(s), *k, rename(t)), edge.clone()))
                        .collect();
                }
            }
        }

        for node in &batch.nodes {
            state.nodes.insert(
                node.qualified_name.as_str().to_string(),
                StoredNode {
                    kind: node.kind,
                    name: node.name.clone(),
                    signature: node.signature.clone(),
                    start_line: node.start_line,
                    end_line: node.end_line,
                },
            );
        }

        for edge in &batch.edges {
            state.edges.insert(
                (edge.source.as_str().to_string(), edge.kind, edge.target.as_str().to_string()),
                StoredEdge { confidence: edge.confidence, rel_hash: edge.rel_hash.clone() },
            );
        }

        state.batches_applied += 1;
        Ok(())
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
