// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Durable tracking store for watched executions.
//!
//! The store holds exactly two kinds of state: a single watermark row
//! marking the boundary below which executions are assumed already
//! discovered, and a collection of tracked executions split across a fixed
//! number of artificial partitions so the read-everything operation can fan
//! out one query per shard instead of scanning one unbounded range.

pub mod postgres;
pub mod sqlite;

pub use self::postgres::PostgresStore;
pub use self::sqlite::SqliteStore;

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Number of artificial partitions the tracked-execution collection is
/// split across. Writer and reader must agree on this value: reading fewer
/// shards than were written silently loses records.
pub const SHARD_COUNT: u32 = 20;

/// Fixed key of the watermark row.
const WATERMARK_ID: &str = "stepwatch";

/// One watched workflow execution.
///
/// Records are immutable between insert and delete; there is no update
/// operation.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct TrackedExecution {
    /// Tracking identifier assigned at insert time (UUID v4), independent
    /// of the workflow service's own execution reference.
    pub tracking_id: String,
    /// Partition tag in `1..=SHARD_COUNT`.
    pub shard: i32,
    /// The workflow service's unique execution reference.
    pub execution_ref: String,
}

/// Store errors.
///
/// A missing watermark is not an error: [`TrackingStore::watermark`] returns
/// `Ok(None)` so callers can fall back to "now" on first run.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StoreError {
    /// Database operation failed.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A shard read task could not be joined.
    #[error("shard read failed: {0}")]
    ShardJoin(#[from] tokio::task::JoinError),

    /// The database URL names no supported backend.
    #[error("unsupported database url: {0}")]
    UnsupportedUrl(String),
}

/// Durable store holding the watermark and the tracked-execution collection.
#[async_trait]
pub trait TrackingStore: Send + Sync {
    /// Read the watermark. `Ok(None)` means no watermark has been written
    /// yet.
    async fn watermark(&self) -> Result<Option<DateTime<Utc>>, StoreError>;

    /// Unconditionally overwrite the watermark.
    async fn set_watermark(&self, at: DateTime<Utc>) -> Result<(), StoreError>;

    /// Insert a newly discovered execution under a fresh tracking id and
    /// the next shard tag. Always an insert, never an update; the store
    /// does not deduplicate execution references.
    async fn insert_execution(&self, execution_ref: &str)
    -> Result<TrackedExecution, StoreError>;

    /// Delete a tracked execution. Deleting a row that is already gone is
    /// not an error.
    async fn delete_execution(&self, tracking_id: &str, shard: i32) -> Result<(), StoreError>;

    /// Read every tracked execution across all shards.
    ///
    /// Fails the whole read if any single shard read fails; partial results
    /// are never returned. Skipping an evaluation tick is preferred over
    /// acting on an incomplete view.
    async fn find_all_executions(&self) -> Result<Vec<TrackedExecution>, StoreError>;
}

/// Connect to the tracking store selected by `url` and apply its schema.
pub async fn connect(url: &str) -> Result<Arc<dyn TrackingStore>, StoreError> {
    if url.starts_with("postgres://") || url.starts_with("postgresql://") {
        Ok(Arc::new(PostgresStore::connect(url).await?))
    } else if let Some(path) = url.strip_prefix("sqlite:") {
        Ok(Arc::new(SqliteStore::from_path(path).await?))
    } else {
        Err(StoreError::UnsupportedUrl(url.to_string()))
    }
}

/// Round-robin shard assignment over `1..=SHARD_COUNT`.
///
/// Deterministic and uniform; one cycle per store instance, advanced on
/// every insert.
#[derive(Debug, Default)]
pub(crate) struct ShardCycle(AtomicU32);

impl ShardCycle {
    pub(crate) fn next(&self) -> i32 {
        (self.0.fetch_add(1, Ordering::Relaxed) % SHARD_COUNT) as i32 + 1
    }
}
