// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Batch types for graph ingestion.

use trellis_core::{FinalRelationship, Poi, PoiKind, QualifiedName, RelKind};

/// Source-tree changes applied before node creation, so the graph stays
/// consistent with the tree the run analysed.
#[derive(Debug, Clone, PartialEq)]
pub enum RefactoringEvent {
    FileDeleted { path: String },
    FileRenamed { old_path: String, new_path: String },
}

/// One node to MERGE.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeSpec {
    pub kind: PoiKind,
    pub qualified_name: QualifiedName,
    pub name: String,
    pub signature: Option<String>,
    pub start_line: u32,
    pub end_line: u32,
}

impl From<&Poi> for NodeSpec {
    fn from(poi: &Poi) -> Self {
        Self {
            kind: poi.kind,
            qualified_name: poi.qualified_name.clone(),
            name: poi.name.clone(),
            signature: poi.signature.clone(),
            start_line: poi.start_line,
            end_line: poi.end_line,
        }
    }
}

/// One edge to MERGE.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeSpec {
    pub kind: RelKind,
    pub source: QualifiedName,
    pub target: QualifiedName,
    pub confidence: f64,
    pub rel_hash: String,
}

impl From<&FinalRelationship> for EdgeSpec {
    fn from(rel: &FinalRelationship) -> Self {
        Self {
            kind: rel.kind,
            source: rel.source.clone(),
            target: rel.target.clone(),
            confidence: rel.confidence.value(),
            rel_hash: rel.rel_hash.as_str().to_string(),
        }
    }
}

/// One atomic unit of graph work: refactorings first, then nodes, then
/// edges, all in a single transaction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GraphBatch {
    pub refactorings: Vec<RefactoringEvent>,
    pub nodes: Vec<NodeSpec>,
    pub edges: Vec<EdgeSpec>,
}

impl GraphBatch {
    pub fn is_empty(&self) -> bool {
        self.refactorings.is_empty() && self.nodes.is_empty() && self.edges.is_empty()
    }

    pub fn len(&self) -> usize {
        self.refactorings.len() + self.nodes.len() + self.edges.len()
    }

    /// Nodes grouped by label, since MERGE labels are static query text.
    pub fn nodes_by_kind(&self) -> Vec<(PoiKind, Vec<&NodeSpec>)> {
        PoiKind::ALL
            .iter()
            .filter_map(|kind| {
                let group: Vec<&NodeSpec> =
                    self.nodes.iter().filter(|n| n.kind == *kind).collect();
                (!group.is_empty()).then_some((*kind, group))
            })
            .collect()
    }

    /// Edges grouped by relationship type, for the same reason.
    pub fn edges_by_kind(&self) -> Vec<(RelKind, Vec<&EdgeSpec>)> {
        RelKind::ALL
            .iter()
            .filter_map(|kind| {
                let group: Vec<&EdgeSpec> =
                    self.edges.iter().filter(|e| e.kind == *kind).collect();
                (!group.is_empty()).then_some((*kind, group))
            })
            .collect()
    }
}

#[cfg(test)]
#[path = "batch_tests.rs"]
mod tests;
