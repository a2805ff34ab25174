// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Graph sink errors.

#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error("graph store error: {0}")]
    Store(String),

    #[error("graph connection failed: {0}")]
    Connect(String),
}

impl From<neo4rs::Error> for GraphError {
    fn from(e: neo4rs::Error) -> Self {
        GraphError::Store(e.to_string())
    }
}
