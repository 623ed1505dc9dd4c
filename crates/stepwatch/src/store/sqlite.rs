// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! SQLite-backed tracking store.
//!
//! Useful for single-node deployments and tests; semantics match the
//! PostgreSQL backend.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use uuid::Uuid;

use super::{SHARD_COUNT, ShardCycle, StoreError, TrackedExecution, TrackingStore, WATERMARK_ID};

/// SQLite-backed store.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
    shards: Arc<ShardCycle>,
}

impl SqliteStore {
    /// Create a store from an existing pool. The schema must already be in
    /// place.
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            shards: Arc::new(ShardCycle::default()),
        }
    }

    /// Create and initialize a store from a database file path.
    ///
    /// Creates parent directories and the database file if missing, then
    /// applies the schema.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .map_err(|e| StoreError::Database(sqlx::Error::Io(e)))?;
        }

        let url = format!("sqlite:{}?mode=rwc", path.to_string_lossy());

        let pool = SqlitePoolOptions::new().max_connections(5).connect(&url).await?;

        sqlx::raw_sql(include_str!("../../schema/sqlite.sql"))
            .execute(&pool)
            .await?;

        Ok(Self::new(pool))
    }
}

#[async_trait]
impl TrackingStore for SqliteStore {
    async fn watermark(&self) -> Result<Option<DateTime<Utc>>, StoreError> {
        let row: Option<(DateTime<Utc>,)> =
            sqlx::query_as("SELECT last_searched_at FROM watermark WHERE id = ?")
                .bind(WATERMARK_ID)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.map(|(at,)| at))
    }

    async fn set_watermark(&self, at: DateTime<Utc>) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO watermark (id, last_searched_at)
            VALUES (?, ?)
            ON CONFLICT (id) DO UPDATE SET last_searched_at = excluded.last_searched_at
            "#,
        )
        .bind(WATERMARK_ID)
        .bind(at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn insert_execution(
        &self,
        execution_ref: &str,
    ) -> Result<TrackedExecution, StoreError> {
        let record = TrackedExecution {
            tracking_id: Uuid::new_v4().to_string(),
            shard: self.shards.next(),
            execution_ref: execution_ref.to_string(),
        };

        sqlx::query(
            r#"
            INSERT INTO tracked_executions (tracking_id, shard, execution_ref)
            VALUES (?, ?, ?)
            "#,
        )
        .bind(&record.tracking_id)
        .bind(record.shard)
        .bind(&record.execution_ref)
        .execute(&self.pool)
        .await?;

        Ok(record)
    }

    async fn delete_execution(&self, tracking_id: &str, shard: i32) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM tracked_executions WHERE tracking_id = ? AND shard = ?")
            .bind(tracking_id)
            .bind(shard)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn find_all_executions(&self) -> Result<Vec<TrackedExecution>, StoreError> {
        let all = Arc::new(Mutex::new(Vec::new()));
        let mut reads = JoinSet::new();

        for shard in 1..=SHARD_COUNT as i32 {
            let pool = self.pool.clone();
            let all = all.clone();
            reads.spawn(async move {
                let rows: Vec<TrackedExecution> = sqlx::query_as(
                    r#"
                    SELECT tracking_id, shard, execution_ref
                    FROM tracked_executions
                    WHERE shard = ?
                    "#,
                )
                .bind(shard)
                .fetch_all(&pool)
                .await?;

                all.lock().await.extend(rows);
                Ok::<(), StoreError>(())
            });
        }

        // Fail-fast: the first shard error aborts the remaining reads and
        // the whole operation.
        while let Some(joined) = reads.join_next().await {
            joined??;
        }

        let executions = std::mem::take(&mut *all.lock().await);
        Ok(executions)
    }
}
