// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Evidence bundle persistence.

use crate::error::StorageError;
use crate::store::Store;
use sqlx::Row;
use trellis_core::{Evidence, EvidenceBundle, Pass, QualifiedName, RelHash, RelKind};

fn bundle_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<EvidenceBundle, StorageError> {
    let kind: String = row.try_get("kind")?;
    let kind: RelKind = kind
        .parse()
        .map_err(|_| StorageError::Corrupt { column: "evidence.kind", value: kind.clone() })?;
    let expected: Vec<Pass> = serde_json::from_str(row.try_get::<String, _>("expected_json")?.as_str())?;
    let collected: Vec<Evidence> =
        serde_json::from_str(row.try_get::<String, _>("collected_json")?.as_str())?;
    Ok(EvidenceBundle {
        rel_hash: RelHash::from_string(row.try_get::<String, _>("rel_hash")?),
        source: QualifiedName::new(row.try_get::<String, _>("source_qn")?),
        target: QualifiedName::new(row.try_get::<String, _>("target_qn")?),
        kind,
        expected,
        collected,
        sealed: row.try_get::<i64, _>("sealed")? != 0,
    })
}

impl Store {
    /// Record one pass's evidence, creating the bundle on first sight.
    ///
    /// Runs in a transaction so concurrent validation workers serialize on
    /// the row; a pass that already reported is a no-op. Returns the
    /// bundle after the write.
    pub async fn record_evidence(
        &self,
        source: &QualifiedName,
        target: &QualifiedName,
        kind: RelKind,
        expected: &[Pass],
        evidence: Evidence,
        now_ms: u64,
    ) -> Result<EvidenceBundle, StorageError> {
        let rel_hash = trellis_core::rel_hash(source, target, kind);
        let mut tx = self.begin().await?;

        let existing = sqlx::query("SELECT * FROM evidence WHERE rel_hash = ?")
            .bind(rel_hash.as_str())
            .fetch_optional(&mut *tx)
            .await?;

        let mut bundle = match existing {
            Some(row) => bundle_from_row(&row)?,
            None => EvidenceBundle::new(
                rel_hash.clone(),
                source.clone(),
                target.clone(),
                kind,
                expected.to_vec(),
            ),
        };
        bundle.record(evidence);

        sqlx::query(
            "INSERT INTO evidence \
             (rel_hash, source_qn, target_qn, kind, expected_json, collected_json, \
              expected_count, collected_count, sealed, created_at_ms, updated_at_ms) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, 0, ?, ?) \
             ON CONFLICT (rel_hash) DO UPDATE SET \
             collected_json = excluded.collected_json, \
             collected_count = excluded.collected_count, \
             updated_at_ms = excluded.updated_at_ms",
        )
        .bind(bundle.rel_hash.as_str())
        .bind(bundle.source.as_str())
        .bind(bundle.target.as_str())
        .bind(bundle.kind.as_type())
        .bind(serde_json::to_string(&bundle.expected)?)
        .bind(serde_json::to_string(&bundle.collected)?)
        .bind(bundle.expected_count() as i64)
        .bind(bundle.collected_count() as i64)
        .bind(now_ms as i64)
        .bind(now_ms as i64)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(bundle)
    }

    pub async fn bundle(&self, rel_hash: &RelHash) -> Result<Option<EvidenceBundle>, StorageError> {
        let row = sqlx::query("SELECT * FROM evidence WHERE rel_hash = ?")
            .bind(rel_hash.as_str())
            .fetch_optional(self.pool())
            .await?;
        row.map(|r| bundle_from_row(&r)).transpose()
    }

    /// Mark a bundle sealed. Returns false if it was already sealed.
    pub async fn seal_bundle(&self, rel_hash: &RelHash) -> Result<bool, StorageError> {
        let result = sqlx::query("UPDATE evidence SET sealed = 1 WHERE rel_hash = ? AND sealed = 0")
            .bind(rel_hash.as_str())
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Bundles past the grace window that never reached their expected
    /// count. The sweep seals these with their silent passes as disagreers.
    pub async fn unsealed_bundles_before(
        &self,
        cutoff_ms: u64,
    ) -> Result<Vec<EvidenceBundle>, StorageError> {
        let rows = sqlx::query(
            "SELECT * FROM evidence WHERE sealed = 0 AND created_at_ms <= ? ORDER BY created_at_ms",
        )
        .bind(cutoff_ms as i64)
        .fetch_all(self.pool())
        .await?;
        rows.iter().map(bundle_from_row).collect()
    }

    pub async fn count_bundles(&self) -> Result<u64, StorageError> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM evidence").fetch_one(self.pool()).await?;
        Ok(sqlx::Row::try_get::<i64, _>(&row, "n")? as u64)
    }

    /// Delete after reconciliation; a bundle is reconciled exactly once.
    pub async fn delete_bundle(&self, rel_hash: &RelHash) -> Result<(), StorageError> {
        sqlx::query("DELETE FROM evidence WHERE rel_hash = ?")
            .bind(rel_hash.as_str())
            .execute(self.pool())
            .await?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "evidence_tests.rs"]
mod tests;
