// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Final (reconciled) relationships.

use crate::error::StorageError;
use crate::store::Store;
use sqlx::Row;
use trellis_core::{Confidence, FinalRelationship, QualifiedName, RelHash, RelState};

fn final_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<FinalRelationship, StorageError> {
    let kind: String = row.try_get("kind")?;
    let kind = kind.parse().map_err(|_| StorageError::Corrupt {
        column: "final_relationships.kind",
        value: kind.clone(),
    })?;
    let state: String = row.try_get("state")?;
    let state = match state.as_str() {
        "validated" => RelState::Validated,
        "rejected" => RelState::Rejected,
        other => {
            return Err(StorageError::Corrupt {
                column: "final_relationships.state",
                value: other.to_string(),
            })
        }
    };
    Ok(FinalRelationship {
        rel_hash: RelHash::from_string(row.try_get::<String, _>("rel_hash")?),
        source: QualifiedName::new(row.try_get::<String, _>("src_qn")?),
        target: QualifiedName::new(row.try_get::<String, _>("tgt_qn")?),
        kind,
        confidence: Confidence::clamped(row.try_get::<f64, _>("final_confidence")?),
        state,
        committed: row.try_get::<i64, _>("committed")? != 0,
    })
}

impl Store {
    /// Record the reconciliation verdict. Replays overwrite with the same
    /// values, so the write is idempotent.
    pub async fn upsert_final(&self, rel: &FinalRelationship) -> Result<(), StorageError> {
        sqlx::query(
            "INSERT INTO final_relationships \
             (rel_hash, src_qn, tgt_qn, kind, final_confidence, state, committed) \
             VALUES (?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT (rel_hash) DO UPDATE SET \
             final_confidence = excluded.final_confidence, \
             state = excluded.state",
        )
        .bind(rel.rel_hash.as_str())
        .bind(rel.source.as_str())
        .bind(rel.target.as_str())
        .bind(rel.kind.as_type())
        .bind(rel.confidence.value())
        .bind(rel.state.to_string())
        .bind(rel.committed as i64)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    pub async fn mark_committed(&self, rel_hash: &RelHash) -> Result<(), StorageError> {
        sqlx::query("UPDATE final_relationships SET committed = 1 WHERE rel_hash = ?")
            .bind(rel_hash.as_str())
            .execute(self.pool())
            .await?;
        Ok(())
    }

    pub async fn final_relationship(
        &self,
        rel_hash: &RelHash,
    ) -> Result<Option<FinalRelationship>, StorageError> {
        let row = sqlx::query("SELECT * FROM final_relationships WHERE rel_hash = ?")
            .bind(rel_hash.as_str())
            .fetch_optional(self.pool())
            .await?;
        row.map(|r| final_from_row(&r)).transpose()
    }

    pub async fn finals_with_state(
        &self,
        state: RelState,
    ) -> Result<Vec<FinalRelationship>, StorageError> {
        let rows = sqlx::query("SELECT * FROM final_relationships WHERE state = ? ORDER BY rel_hash")
            .bind(state.to_string())
            .fetch_all(self.pool())
            .await?;
        rows.iter().map(final_from_row).collect()
    }

    pub async fn count_finals(&self, state: RelState) -> Result<u64, StorageError> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM final_relationships WHERE state = ?")
            .bind(state.to_string())
            .fetch_one(self.pool())
            .await?;
        Ok(row.try_get::<i64, _>("n")? as u64)
    }
}

#[cfg(test)]
#[path = "relationships_tests.rs"]
mod tests;
