// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Neo4j sink: parameterised UNWIND/MERGE batches.

use crate::batch::{EdgeSpec, GraphBatch, NodeSpec, RefactoringEvent};
use crate::error::GraphError;
use crate::sink::GraphSink;
use async_trait::async_trait;
use neo4rs::{BoltList, BoltMap, BoltString, BoltType, Graph, Query};

#[derive(Debug, Clone)]
pub struct Neo4jConfig {
    pub uri: String,
    pub user: String,
    pub password: String,
}

pub struct Neo4jSink {
    graph: Graph,
}

impl Neo4jSink {
    pub async fn connect(config: Neo4jConfig) -> Result<Self, GraphError> {
        let graph = Graph::new(&config.uri, &config.user, &config.password)
            .await
            .map_err(|e| GraphError::Connect(e.to_string()))?;
        Ok(Self { graph })
    }
}

fn string(value: &str) -> BoltType {
    BoltType::String(BoltString::from(value))
}

fn optional_string(value: Option<&str>) -> BoltType {
    string(value.unwrap_or_default())
}

fn node_entry(node: &NodeSpec) -> BoltType {
    let mut map = BoltMap::default();
    map.put(BoltString::from("qn"), string(node.qualified_name.as_str()));
    map.put(BoltString::from("name"), string(&node.name));
    map.put(BoltString::from("signature"), optional_string(node.signature.as_deref()));
    map.put(BoltString::from("start_line"), BoltType::from(node.start_line as i64));
    map.put(BoltString::from("end_line"), BoltType::from(node.end_line as i64));
    BoltType::Map(map)
}

fn edge_entry(edge: &EdgeSpec) -> BoltType {
    let mut map = BoltMap::default();
    map.put(BoltString::from("src"), string(edge.source.as_str()));
    map.put(BoltString::from("tgt"), string(edge.target.as_str()));
    map.put(BoltString::from("confidence"), BoltType::from(edge.confidence));
    map.put(BoltString::from("rel_hash"), string(&edge.rel_hash));
    BoltType::Map(map)
}

fn list(entries: Vec<BoltType>) -> BoltType {
    let mut bolt = BoltList::default();
    for entry in entries {
        bolt.push(entry);
    }
    BoltType::List(bolt)
}

#[async_trait]
impl GraphSink for Neo4jSink {
    async fn apply(&self, batch: &GraphBatch) -> Result<(), GraphError> {
        let mut txn = self.graph.start_txn().await?;

        // Refactorings first, so renames land before MERGE re-creates nodes
        // under stale paths.
        for event in &batch.refactorings {
            let query = match event {
                RefactoringEvent::FileDeleted { path } => Query::new(
                    "MATCH (n) WHERE n.qualified_name STARTS WITH $prefix DETACH DELETE n"
                        .to_string(),
                )
                .param("prefix", format!("{path}--")),
                RefactoringEvent::FileRenamed { old_path, new_path } => Query::new(
                    "MATCH (n) WHERE n.qualified_name STARTS WITH $old_prefix \
                     SET n.qualified_name = replace(n.qualified_name, $old_prefix, $new_prefix)"
                        .to_string(),
                )
                .param("old_prefix", format!("{old_path}--"))
                .param("new_prefix", format!("{new_path}--")),
            };
            txn.run(query).await?;
        }

        // Labels come from the PoiKind enum only: static query text.
        for (kind, nodes) in batch.nodes_by_kind() {
            let cypher = format!(
                "UNWIND $batch AS p \
                 MERGE (n:{label} {{qualified_name: p.qn}}) \
                 SET n.name = p.name, n.signature = p.signature, \
                     n.start_line = p.start_line, n.end_line = p.end_line",
                label = kind.as_label()
            );
            let entries = list(nodes.iter().map(|n| node_entry(n)).collect());
            txn.run(Query::new(cypher).param("batch", entries)).await?;
        }

        // Relationship types likewise come from the RelKind enum only.
        for (kind, edges) in batch.edges_by_kind() {
            let cypher = format!(
                "UNWIND $batch AS r \
                 MATCH (s {{qualified_name: r.src}}) \
                 MATCH (t {{qualified_name: r.tgt}}) \
                 MERGE (s)-[e:{rel_type}]->(t) \
                 ON CREATE SET e.confidence = r.confidence, e.rel_hash = r.rel_hash \
                 ON MATCH SET e.confidence = r.confidence, e.rel_hash = r.rel_hash",
                rel_type = kind.as_type()
            );
            let entries = list(edges.iter().map(|e| edge_entry(e)).collect());
            txn.run(Query::new(cypher).param("batch", entries)).await?;
        }

        txn.commit().await?;
        Ok(())
    }
}
