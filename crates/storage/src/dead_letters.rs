// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dead letters and per-POI failure records.

use crate::error::StorageError;
use crate::store::Store;
use chrono::Utc;
use sqlx::Row;
use trellis_core::{JobId, Poi};

/// A job that exhausted its retries.
#[derive(Debug, Clone, PartialEq)]
pub struct DeadLetter {
    pub orig_job_id: JobId,
    pub error_msg: String,
    pub error_ctx: Option<String>,
    pub payload_json: String,
}

/// A single POI that failed inside a batched resolution job.
#[derive(Debug, Clone, PartialEq)]
pub struct FailedPoi {
    pub orig_job_id: JobId,
    pub error_msg: String,
    pub poi: Poi,
}

impl Store {
    pub async fn insert_dead_letter(&self, letter: &DeadLetter) -> Result<(), StorageError> {
        sqlx::query(
            "INSERT INTO dead_letters (orig_job_id, failed_at, error_msg, error_ctx, payload_json) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(letter.orig_job_id.as_str())
        .bind(Utc::now().to_rfc3339())
        .bind(&letter.error_msg)
        .bind(&letter.error_ctx)
        .bind(&letter.payload_json)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    pub async fn insert_failed_poi(&self, failed: &FailedPoi) -> Result<(), StorageError> {
        sqlx::query(
            "INSERT INTO failed_pois (orig_job_id, failed_at, error_msg, poi_json) \
             VALUES (?, ?, ?, ?)",
        )
        .bind(failed.orig_job_id.as_str())
        .bind(Utc::now().to_rfc3339())
        .bind(&failed.error_msg)
        .bind(serde_json::to_string(&failed.poi)?)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    pub async fn count_failed_pois(&self) -> Result<u64, StorageError> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM failed_pois")
            .fetch_one(self.pool())
            .await?;
        Ok(row.try_get::<i64, _>("n")? as u64)
    }

    pub async fn count_dead_letters(&self) -> Result<u64, StorageError> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM dead_letters")
            .fetch_one(self.pool())
            .await?;
        Ok(row.try_get::<i64, _>("n")? as u64)
    }

    pub async fn dead_letter_messages(&self) -> Result<Vec<String>, StorageError> {
        let rows = sqlx::query("SELECT error_msg FROM dead_letters ORDER BY id")
            .fetch_all(self.pool())
            .await?;
        rows.iter().map(|r| Ok(r.try_get::<String, _>("error_msg")?)).collect()
    }
}

#[cfg(test)]
#[path = "dead_letters_tests.rs"]
mod tests;
