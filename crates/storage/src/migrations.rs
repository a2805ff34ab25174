// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Schema migrations, tracked via `PRAGMA user_version`.

use crate::error::StorageError;
use sqlx::{Row, SqlitePool};

/// Ordered migration steps. Index + 1 is the schema version.
const MIGRATIONS: &[&str] = &[
    // v1: the full initial schema.
    r#"
    CREATE TABLE runs (
        id TEXT PRIMARY KEY,
        target_root TEXT NOT NULL,
        status TEXT NOT NULL,
        created_at TEXT NOT NULL
    );

    CREATE TABLE files (
        id TEXT PRIMARY KEY,
        run_id TEXT NOT NULL REFERENCES runs(id),
        path TEXT NOT NULL,
        content_hash TEXT NOT NULL,
        status TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        UNIQUE (run_id, path)
    );

    CREATE TABLE pois (
        id TEXT PRIMARY KEY,
        file_id TEXT NOT NULL,
        run_id TEXT NOT NULL,
        kind TEXT NOT NULL,
        name TEXT NOT NULL,
        qualified_name TEXT NOT NULL,
        signature TEXT,
        start_line INTEGER NOT NULL,
        end_line INTEGER NOT NULL,
        UNIQUE (run_id, qualified_name)
    );

    CREATE TABLE evidence (
        rel_hash TEXT PRIMARY KEY,
        source_qn TEXT NOT NULL,
        target_qn TEXT NOT NULL,
        kind TEXT NOT NULL,
        expected_json TEXT NOT NULL,
        collected_json TEXT NOT NULL,
        expected_count INTEGER NOT NULL,
        collected_count INTEGER NOT NULL,
        sealed INTEGER NOT NULL DEFAULT 0,
        created_at_ms INTEGER NOT NULL,
        updated_at_ms INTEGER NOT NULL
    );

    CREATE TABLE final_relationships (
        rel_hash TEXT PRIMARY KEY,
        src_qn TEXT NOT NULL,
        tgt_qn TEXT NOT NULL,
        kind TEXT NOT NULL,
        final_confidence REAL NOT NULL,
        state TEXT NOT NULL,
        committed INTEGER NOT NULL DEFAULT 0
    );

    CREATE TABLE outbox (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        event_id TEXT NOT NULL UNIQUE,
        topic TEXT NOT NULL,
        payload_json TEXT NOT NULL,
        created_at TEXT NOT NULL,
        published_at TEXT
    );

    CREATE TABLE dead_letters (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        orig_job_id TEXT NOT NULL,
        failed_at TEXT NOT NULL,
        error_msg TEXT NOT NULL,
        error_ctx TEXT,
        payload_json TEXT NOT NULL,
        status TEXT NOT NULL DEFAULT 'open'
    );

    CREATE TABLE failed_pois (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        orig_job_id TEXT NOT NULL,
        failed_at TEXT NOT NULL,
        error_msg TEXT NOT NULL,
        error_ctx TEXT,
        poi_json TEXT NOT NULL,
        status TEXT NOT NULL DEFAULT 'open'
    );

    CREATE TABLE directory_summaries (
        run_id TEXT NOT NULL,
        dir_path TEXT NOT NULL,
        summary_text TEXT NOT NULL,
        poi_count INTEGER NOT NULL,
        PRIMARY KEY (run_id, dir_path)
    );

    CREATE INDEX idx_files_run ON files(run_id);
    CREATE INDEX idx_pois_file ON pois(file_id);
    CREATE INDEX idx_pois_run ON pois(run_id);
    CREATE INDEX idx_outbox_unpublished ON outbox(id) WHERE published_at IS NULL;
    CREATE INDEX idx_evidence_unsealed ON evidence(created_at_ms) WHERE sealed = 0;
    "#,
];

/// Enable WAL mode for crash recovery, then apply pending migrations.
pub(crate) async fn apply(pool: &SqlitePool) -> Result<(), StorageError> {
    sqlx::query("PRAGMA journal_mode=WAL;").execute(pool).await?;
    sqlx::query("PRAGMA foreign_keys=ON;").execute(pool).await?;

    let row = sqlx::query("PRAGMA user_version;").fetch_one(pool).await?;
    let current: i64 = row.try_get(0)?;

    for (idx, step) in MIGRATIONS.iter().enumerate() {
        let version = idx as i64 + 1;
        if version <= current {
            continue;
        }
        let mut tx = pool.begin().await?;
        sqlx::raw_sql(step).execute(&mut *tx).await.map_err(|e| StorageError::Migration {
            version,
            message: e.to_string(),
        })?;
        // PRAGMA does not support bind parameters.
        sqlx::raw_sql(&format!("PRAGMA user_version = {version};"))
            .execute(&mut *tx)
            .await
            .map_err(|e| StorageError::Migration { version, message: e.to_string() })?;
        tx.commit().await?;
        tracing::debug!(version, "applied schema migration");
    }

    Ok(())
}

#[cfg(test)]
#[path = "migrations_tests.rs"]
mod tests;
