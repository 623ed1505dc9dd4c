// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Tracking store integration tests over the SQLite backend.

mod common;

use std::collections::HashSet;

use chrono::{Duration, Utc};
use stepwatch::store::{SHARD_COUNT, TrackingStore};

#[tokio::test]
async fn test_watermark_absent_then_roundtrip() {
    let (store, _dir) = common::sqlite_store().await;

    assert_eq!(store.watermark().await.unwrap(), None);

    let at = Utc::now() - Duration::seconds(30);
    store.set_watermark(at).await.unwrap();

    let read = store.watermark().await.unwrap().unwrap();
    assert!((read - at).num_milliseconds().abs() < 1000);
}

#[tokio::test]
async fn test_watermark_overwrite_keeps_single_row() {
    let (store, _dir) = common::sqlite_store().await;

    let first = Utc::now() - Duration::seconds(120);
    let second = Utc::now();
    store.set_watermark(first).await.unwrap();
    store.set_watermark(second).await.unwrap();

    let read = store.watermark().await.unwrap().unwrap();
    assert!((read - second).num_milliseconds().abs() < 1000);
}

#[tokio::test]
async fn test_insert_assigns_unique_ids_and_shards_in_range() {
    let (store, _dir) = common::sqlite_store().await;

    let mut ids = HashSet::new();
    for i in 0..10 {
        let record = store
            .insert_execution(&format!("wrn:execution:{i}"))
            .await
            .unwrap();
        assert!((1..=SHARD_COUNT as i32).contains(&record.shard));
        assert!(ids.insert(record.tracking_id));
    }
}

#[tokio::test]
async fn test_find_all_is_complete_across_all_shards() {
    let (store, _dir) = common::sqlite_store().await;

    // Two full shard cycles, so every shard holds at least one record.
    let count = SHARD_COUNT as usize * 2;
    for i in 0..count {
        store
            .insert_execution(&format!("wrn:execution:{i}"))
            .await
            .unwrap();
    }

    let all = store.find_all_executions().await.unwrap();
    assert_eq!(all.len(), count);

    let shards: HashSet<i32> = all.iter().map(|e| e.shard).collect();
    assert_eq!(shards.len(), SHARD_COUNT as usize);

    let ids: HashSet<&str> = all.iter().map(|e| e.tracking_id.as_str()).collect();
    assert_eq!(ids.len(), count);
}

#[tokio::test]
async fn test_find_all_on_empty_store() {
    let (store, _dir) = common::sqlite_store().await;
    assert!(store.find_all_executions().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_delete_is_noop_safe() {
    let (store, _dir) = common::sqlite_store().await;

    let record = store.insert_execution("wrn:execution:gone").await.unwrap();

    store
        .delete_execution(&record.tracking_id, record.shard)
        .await
        .unwrap();
    assert!(store.find_all_executions().await.unwrap().is_empty());

    // Deleting an absent row is indistinguishable from success.
    store
        .delete_execution(&record.tracking_id, record.shard)
        .await
        .unwrap();
}
