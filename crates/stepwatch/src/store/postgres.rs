// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! PostgreSQL-backed tracking store.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use uuid::Uuid;

use super::{SHARD_COUNT, ShardCycle, StoreError, TrackedExecution, TrackingStore, WATERMARK_ID};

/// PostgreSQL-backed store.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
    shards: Arc<ShardCycle>,
}

impl PostgresStore {
    /// Create a store from an existing pool. The schema must already be in
    /// place.
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            shards: Arc::new(ShardCycle::default()),
        }
    }

    /// Connect to `url` and apply the schema.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new().max_connections(10).connect(url).await?;

        sqlx::raw_sql(include_str!("../../schema/postgres.sql"))
            .execute(&pool)
            .await?;

        Ok(Self::new(pool))
    }
}

#[async_trait]
impl TrackingStore for PostgresStore {
    async fn watermark(&self) -> Result<Option<DateTime<Utc>>, StoreError> {
        let row: Option<(DateTime<Utc>,)> =
            sqlx::query_as("SELECT last_searched_at FROM watermark WHERE id = $1")
                .bind(WATERMARK_ID)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.map(|(at,)| at))
    }

    async fn set_watermark(&self, at: DateTime<Utc>) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO watermark (id, last_searched_at)
            VALUES ($1, $2)
            ON CONFLICT (id) DO UPDATE SET last_searched_at = EXCLUDED.last_searched_at
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
            VALUES ($1, $2, $3)
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
        sqlx::query("DELETE FROM tracked_executions WHERE tracking_id = $1 AND shard = $2")
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
                    WHERE shard = $1
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
