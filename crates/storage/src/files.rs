// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runs and file records.

use crate::error::StorageError;
use crate::store::Store;
use chrono::Utc;
use sqlx::{Row, Sqlite, Transaction};
use trellis_core::{FileId, FileRecord, FileStatus, RunId, RunStatus};

fn parse_file_status(raw: &str) -> Result<FileStatus, StorageError> {
    match raw {
        "pending" => Ok(FileStatus::Pending),
        "analysing" => Ok(FileStatus::Analysing),
        "completed" => Ok(FileStatus::Completed),
        "failed" => Ok(FileStatus::Failed),
        other => Err(StorageError::Corrupt { column: "files.status", value: other.to_string() }),
    }
}

fn parse_run_status(raw: &str) -> Result<RunStatus, StorageError> {
    match raw {
        "active" => Ok(RunStatus::Active),
        "completed" => Ok(RunStatus::Completed),
        "failed" => Ok(RunStatus::Failed),
        other => Err(StorageError::Corrupt { column: "runs.status", value: other.to_string() }),
    }
}

fn file_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<FileRecord, StorageError> {
    let status: String = row.try_get("status")?;
    Ok(FileRecord {
        id: FileId::from_string(row.try_get::<String, _>("id")?),
        run_id: RunId::from_string(row.try_get::<String, _>("run_id")?),
        path: row.try_get("path")?,
        content_hash: row.try_get("content_hash")?,
        status: parse_file_status(&status)?,
    })
}

impl Store {
    /// Register a new run. Re-using an existing run ID is rejected.
    pub async fn create_run(&self, run_id: RunId, target_root: &str) -> Result<(), StorageError> {
        let result = sqlx::query(
            "INSERT INTO runs (id, target_root, status, created_at) VALUES (?, ?, 'active', ?) \
             ON CONFLICT (id) DO NOTHING",
        )
        .bind(run_id.as_str())
        .bind(target_root)
        .bind(Utc::now().to_rfc3339())
        .execute(self.pool())
        .await?;
        if result.rows_affected() == 0 {
            return Err(StorageError::Corrupt {
                column: "runs.id",
                value: format!("run already exists: {run_id}"),
            });
        }
        Ok(())
    }

    pub async fn set_run_status(&self, run_id: RunId, status: RunStatus) -> Result<(), StorageError> {
        sqlx::query("UPDATE runs SET status = ? WHERE id = ?")
            .bind(status.to_string())
            .bind(run_id.as_str())
            .execute(self.pool())
            .await?;
        Ok(())
    }

    pub async fn run_status(&self, run_id: RunId) -> Result<Option<RunStatus>, StorageError> {
        let row = sqlx::query("SELECT status FROM runs WHERE id = ?")
            .bind(run_id.as_str())
            .fetch_optional(self.pool())
            .await?;
        row.map(|r| {
            let raw: String = r.try_get("status")?;
            parse_run_status(&raw)
        })
        .transpose()
    }

    /// Bulk-insert the file records discovered by the producer.
    pub async fn insert_files(&self, files: &[FileRecord]) -> Result<(), StorageError> {
        let mut tx = self.begin().await?;
        for file in files {
            sqlx::query(
                "INSERT INTO files (id, run_id, path, content_hash, status, updated_at) \
                 VALUES (?, ?, ?, ?, ?, ?)",
            )
            .bind(file.id.as_str())
            .bind(file.run_id.as_str())
            .bind(&file.path)
            .bind(&file.content_hash)
            .bind(file.status.to_string())
            .bind(Utc::now().to_rfc3339())
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    pub async fn file(&self, file_id: FileId) -> Result<Option<FileRecord>, StorageError> {
        let row = sqlx::query("SELECT * FROM files WHERE id = ?")
            .bind(file_id.as_str())
            .fetch_optional(self.pool())
            .await?;
        row.map(|r| file_from_row(&r)).transpose()
    }

    pub async fn set_file_status(
        &self,
        file_id: FileId,
        status: FileStatus,
    ) -> Result<(), StorageError> {
        sqlx::query("UPDATE files SET status = ?, updated_at = ? WHERE id = ?")
            .bind(status.to_string())
            .bind(Utc::now().to_rfc3339())
            .bind(file_id.as_str())
            .execute(self.pool())
            .await?;
        Ok(())
    }

    /// Record the content hash observed at analysis time.
    pub async fn set_file_hash(&self, file_id: FileId, hash: &str) -> Result<(), StorageError> {
        sqlx::query("UPDATE files SET content_hash = ?, updated_at = ? WHERE id = ?")
            .bind(hash)
            .bind(Utc::now().to_rfc3339())
            .bind(file_id.as_str())
            .execute(self.pool())
            .await?;
        Ok(())
    }

    /// Transaction-scoped status update, for the file-analysis commit.
    pub async fn set_file_status_tx(
        tx: &mut Transaction<'static, Sqlite>,
        file_id: FileId,
        status: FileStatus,
    ) -> Result<(), StorageError> {
        sqlx::query("UPDATE files SET status = ?, updated_at = ? WHERE id = ?")
            .bind(status.to_string())
            .bind(Utc::now().to_rfc3339())
            .bind(file_id.as_str())
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    pub async fn files_for_run(&self, run_id: RunId) -> Result<Vec<FileRecord>, StorageError> {
        let rows = sqlx::query("SELECT * FROM files WHERE run_id = ? ORDER BY path")
            .bind(run_id.as_str())
            .fetch_all(self.pool())
            .await?;
        rows.iter().map(file_from_row).collect()
    }

    pub async fn count_files_with_status(
        &self,
        run_id: RunId,
        status: FileStatus,
    ) -> Result<u64, StorageError> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM files WHERE run_id = ? AND status = ?")
            .bind(run_id.as_str())
            .bind(status.to_string())
            .fetch_one(self.pool())
            .await?;
        Ok(row.try_get::<i64, _>("n")? as u64)
    }
}

#[cfg(test)]
#[path = "files_tests.rs"]
mod tests;
