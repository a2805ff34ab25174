// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Storage error type.

use trellis_core::QualifiedName;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration failed at version {version}: {message}")]
    Migration { version: i64, message: String },

    #[error("stored payload is not valid JSON: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("stored value for {column} is invalid: {value:?}")]
    Corrupt { column: &'static str, value: String },

    /// A second POI with the same qualified name inside one
    /// run. Fatal; the run is marked failed rather than retried.
    #[error("duplicate qualified name in run {run_id}: {qualified_name}")]
    QualifiedNameConflict { run_id: String, qualified_name: QualifiedName },
}
