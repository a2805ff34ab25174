// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! trellis-graph: idempotent commits to the labelled property graph.
//!
//! Node labels and relationship types come exclusively from the core enums,
//! so no input string ever reaches query text — the allow-list is the
//! injection guard. All writes use MERGE, making replays harmless.

mod batch;
mod error;
mod logging;
mod neo4j;
mod sink;

#[cfg(any(test, feature = "test-support"))]
mod memory;

pub use batch::{EdgeSpec, GraphBatch, NodeSpec, RefactoringEvent};
pub use error::GraphError;
pub use logging::LoggingSink;
pub use neo4j::{Neo4jConfig, Neo4jSink};
pub use sink::GraphSink;

#[cfg(any(test, feature = "test-support"))]
pub use memory::MemoryGraph;
