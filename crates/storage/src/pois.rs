// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! POI persistence. All writes are idempotent by `(run_id, qualified_name)`.

use crate::error::StorageError;
use crate::store::Store;
use sqlx::{Row, Sqlite, Transaction};
use trellis_core::{FileId, Poi, PoiId, QualifiedName, RunId};

fn poi_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Poi, StorageError> {
    let kind: String = row.try_get("kind")?;
    let kind = kind
        .parse()
        .map_err(|_| StorageError::Corrupt { column: "pois.kind", value: kind.clone() })?;
    Ok(Poi {
        id: PoiId::from_string(row.try_get::<String, _>("id")?),
        file_id: FileId::from_string(row.try_get::<String, _>("file_id")?),
        run_id: RunId::from_string(row.try_get::<String, _>("run_id")?),
        kind,
        name: row.try_get("name")?,
        qualified_name: QualifiedName::new(row.try_get::<String, _>("qualified_name")?),
        signature: row.try_get("signature")?,
        start_line: row.try_get::<i64, _>("start_line")? as u32,
        end_line: row.try_get::<i64, _>("end_line")? as u32,
    })
}

impl Store {
    /// Upsert a batch of POIs inside an open transaction.
    ///
    /// Conflicts on `(run_id, qualified_name)` update in place, so replaying
    /// a completed file-analysis job writes zero new rows.
    pub async fn upsert_pois_tx(
        tx: &mut Transaction<'static, Sqlite>,
        pois: &[Poi],
    ) -> Result<(), StorageError> {
        for poi in pois {
            sqlx::query(
                "INSERT INTO pois \
                 (id, file_id, run_id, kind, name, qualified_name, signature, start_line, end_line) \
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?) \
                 ON CONFLICT (run_id, qualified_name) DO UPDATE SET \
                 kind = excluded.kind, \
                 name = excluded.name, \
                 signature = excluded.signature, \
                 start_line = excluded.start_line, \
                 end_line = excluded.end_line",
            )
            .bind(poi.id.as_str())
            .bind(poi.file_id.as_str())
            .bind(poi.run_id.as_str())
            .bind(poi.kind.as_label())
            .bind(&poi.name)
            .bind(poi.qualified_name.as_str())
            .bind(&poi.signature)
            .bind(poi.start_line as i64)
            .bind(poi.end_line as i64)
            .execute(&mut **tx)
            .await?;
        }
        Ok(())
    }

    pub async fn pois_for_file(&self, file_id: FileId) -> Result<Vec<Poi>, StorageError> {
        let rows = sqlx::query("SELECT * FROM pois WHERE file_id = ? ORDER BY qualified_name")
            .bind(file_id.as_str())
            .fetch_all(self.pool())
            .await?;
        rows.iter().map(poi_from_row).collect()
    }

    /// POIs whose file lives directly in `dir_path`.
    pub async fn pois_for_directory(
        &self,
        run_id: RunId,
        dir_path: &str,
    ) -> Result<Vec<Poi>, StorageError> {
        let rows = sqlx::query(
            "SELECT p.* FROM pois p \
             JOIN files f ON f.id = p.file_id \
             WHERE p.run_id = ? AND f.path GLOB ? AND f.path NOT GLOB ? \
             ORDER BY p.qualified_name",
        )
        .bind(run_id.as_str())
        .bind(format!("{}/*", dir_path.trim_end_matches('/')))
        .bind(format!("{}/*/*", dir_path.trim_end_matches('/')))
        .fetch_all(self.pool())
        .await?;
        rows.iter().map(poi_from_row).collect()
    }

    pub async fn pois_for_run(&self, run_id: RunId) -> Result<Vec<Poi>, StorageError> {
        let rows = sqlx::query("SELECT * FROM pois WHERE run_id = ? ORDER BY qualified_name")
            .bind(run_id.as_str())
            .fetch_all(self.pool())
            .await?;
        rows.iter().map(poi_from_row).collect()
    }

    pub async fn count_pois(&self, run_id: RunId) -> Result<u64, StorageError> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM pois WHERE run_id = ?")
            .bind(run_id.as_str())
            .fetch_one(self.pool())
            .await?;
        Ok(row.try_get::<i64, _>("n")? as u64)
    }
}

#[cfg(test)]
#[path = "pois_tests.rs"]
mod tests;
