// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The store handle: pool setup and transaction plumbing.

use crate::error::StorageError;
use crate::migrations;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Sqlite, SqlitePool, Transaction};
use std::path::Path;
use std::str::FromStr;

/// Handle to the operational store. Cheap to clone; all clones share the
/// underlying pool.
#[derive(Clone)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    /// Open (or create) the store at `path` and bring the schema current.
    pub async fn open(path: &Path) -> Result<Self, StorageError> {
        let options = SqliteConnectOptions::from_str(&format!("sqlite://{}", path.display()))
            .map_err(StorageError::Database)?
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new().max_connections(8).connect_with(options).await?;
        migrations::apply(&pool).await?;
        Ok(Self { pool })
    }

    /// An in-memory store for tests and single-shot runs.
    ///
    /// Pinned to one connection: each SQLite `:memory:` connection is its
    /// own database.
    pub async fn in_memory() -> Result<Self, StorageError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        migrations::apply(&pool).await?;
        Ok(Self { pool })
    }

    pub(crate) fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Begin a short-lived write transaction.
    pub async fn begin(&self) -> Result<Transaction<'static, Sqlite>, StorageError> {
        Ok(self.pool.begin().await?)
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}
