// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Directory summaries produced by the directory-resolution pass.

use crate::error::StorageError;
use crate::store::Store;
use sqlx::{Row, Sqlite, Transaction};
use trellis_core::RunId;

/// One per `(run, directory)`; global resolution reads these instead of raw
/// POIs.
#[derive(Debug, Clone, PartialEq)]
pub struct DirectorySummary {
    pub run_id: RunId,
    pub dir_path: String,
    pub summary_text: String,
    pub poi_count: u64,
}

impl Store {
    /// Transaction-scoped upsert, committed together with the evidence
    /// events the resolution pass produced.
    pub async fn upsert_summary_tx(
        tx: &mut Transaction<'static, Sqlite>,
        summary: &DirectorySummary,
    ) -> Result<(), StorageError> {
        sqlx::query(
            "INSERT INTO directory_summaries (run_id, dir_path, summary_text, poi_count) \
             VALUES (?, ?, ?, ?) \
             ON CONFLICT (run_id, dir_path) DO UPDATE SET \
             summary_text = excluded.summary_text, \
             poi_count = excluded.poi_count",
        )
        .bind(summary.run_id.as_str())
        .bind(&summary.dir_path)
        .bind(&summary.summary_text)
        .bind(summary.poi_count as i64)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    pub async fn upsert_summary(&self, summary: &DirectorySummary) -> Result<(), StorageError> {
        sqlx::query(
            "INSERT INTO directory_summaries (run_id, dir_path, summary_text, poi_count) \
             VALUES (?, ?, ?, ?) \
             ON CONFLICT (run_id, dir_path) DO UPDATE SET \
             summary_text = excluded.summary_text, \
             poi_count = excluded.poi_count",
        )
        .bind(summary.run_id.as_str())
        .bind(&summary.dir_path)
        .bind(&summary.summary_text)
        .bind(summary.poi_count as i64)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    pub async fn summaries_for_run(
        &self,
        run_id: RunId,
    ) -> Result<Vec<DirectorySummary>, StorageError> {
        let rows = sqlx::query(
            "SELECT * FROM directory_summaries WHERE run_id = ? ORDER BY dir_path",
        )
        .bind(run_id.as_str())
        .fetch_all(self.pool())
        .await?;
        rows.iter()
            .map(|row| {
                Ok(DirectorySummary {
                    run_id: RunId::from_string(row.try_get::<String, _>("run_id")?),
                    dir_path: row.try_get("dir_path")?,
                    summary_text: row.try_get("summary_text")?,
                    poi_count: row.try_get::<i64, _>("poi_count")? as u64,
                })
            })
            .collect()
    }
}

#[cfg(test)]
#[path = "summaries_tests.rs"]
mod tests;
