// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Discovery stage integration tests.

mod common;

use std::sync::Arc;

use chrono::{Duration, Utc};

use stepwatch::registration::RegistrationWorker;
use stepwatch::store::TrackingStore;
use stepwatch::workflow::mock::MockWorkflowService;

#[tokio::test]
async fn test_first_run_registers_execution_and_writes_watermark() {
    let (store, _dir) = common::sqlite_store().await;
    let service = Arc::new(MockWorkflowService::new());

    // No watermark yet, so the tick falls back to its own start time;
    // this execution starts just after the scan begins.
    service
        .add_execution(
            &common::workflow_id("orders"),
            common::detail(
                "orders",
                "run-1",
                "RUNNING",
                Utc::now() + Duration::seconds(5),
                None,
            ),
        )
        .await;

    let worker = RegistrationWorker::new(
        store.clone(),
        service,
        Arc::new(common::test_config(&[("orders", None)])),
    );
    worker.register().await.unwrap();

    let all = store.find_all_executions().await.unwrap();
    assert_eq!(all.len(), 1);
    assert!(all[0].execution_ref.contains("orders"));

    let watermark = store.watermark().await.unwrap().unwrap();
    assert!((Utc::now() - watermark).num_seconds().abs() < 5);
}

#[tokio::test]
async fn test_rerun_with_advanced_watermark_adds_nothing() {
    let (store, _dir) = common::sqlite_store().await;
    let service = Arc::new(MockWorkflowService::new());

    store
        .set_watermark(Utc::now() - Duration::seconds(100))
        .await
        .unwrap();

    service
        .add_execution(
            &common::workflow_id("orders"),
            common::detail(
                "orders",
                "run-1",
                "RUNNING",
                Utc::now() - Duration::seconds(50),
                None,
            ),
        )
        .await;

    let worker = RegistrationWorker::new(
        store.clone(),
        service,
        Arc::new(common::test_config(&[("orders", None)])),
    );

    worker.register().await.unwrap();
    assert_eq!(store.find_all_executions().await.unwrap().len(), 1);

    // The watermark advanced past the execution's start time, so an
    // unchanged upstream list yields no further records.
    worker.register().await.unwrap();
    assert_eq!(store.find_all_executions().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_executions_older_than_watermark_stop_the_scan() {
    let (store, _dir) = common::sqlite_store().await;
    // One execution per page, so the early-exit crosses page boundaries.
    let service = Arc::new(MockWorkflowService::new().with_page_size(1));

    store
        .set_watermark(Utc::now() - Duration::seconds(60))
        .await
        .unwrap();

    let workflow_id = common::workflow_id("orders");
    service
        .add_execution(
            &workflow_id,
            common::detail(
                "orders",
                "new-run",
                "RUNNING",
                Utc::now() - Duration::seconds(30),
                None,
            ),
        )
        .await;
    service
        .add_execution(
            &workflow_id,
            common::detail(
                "orders",
                "old-run",
                "SUCCEEDED",
                Utc::now() - Duration::seconds(90),
                None,
            ),
        )
        .await;

    let worker = RegistrationWorker::new(
        store.clone(),
        service,
        Arc::new(common::test_config(&[("orders", None)])),
    );
    worker.register().await.unwrap();

    let all = store.find_all_executions().await.unwrap();
    assert_eq!(all.len(), 1);
    assert!(all[0].execution_ref.contains("new-run"));
}

#[tokio::test]
async fn test_missing_workflow_is_skipped_and_tick_succeeds() {
    let (store, _dir) = common::sqlite_store().await;
    let service = Arc::new(MockWorkflowService::new());

    let before = Utc::now() - Duration::seconds(100);
    store.set_watermark(before).await.unwrap();

    service
        .add_execution(
            &common::workflow_id("orders"),
            common::detail(
                "orders",
                "run-1",
                "RUNNING",
                Utc::now() - Duration::seconds(50),
                None,
            ),
        )
        .await;
    service.remove_workflow(&common::workflow_id("billing")).await;

    let worker = RegistrationWorker::new(
        store.clone(),
        service,
        Arc::new(common::test_config(&[("orders", None), ("billing", None)])),
    );
    worker.register().await.unwrap();

    assert_eq!(store.find_all_executions().await.unwrap().len(), 1);

    // The deleted workflow did not block the tick-global watermark advance.
    let watermark = store.watermark().await.unwrap().unwrap();
    assert!(watermark > before);
}

#[tokio::test]
async fn test_listing_failure_aborts_tick_without_watermark_advance() {
    let (store, _dir) = common::sqlite_store().await;
    let service = Arc::new(MockWorkflowService::new());

    service.break_workflow(&common::workflow_id("orders")).await;

    let worker = RegistrationWorker::new(
        store.clone(),
        service,
        Arc::new(common::test_config(&[("orders", None)])),
    );

    assert!(worker.register().await.is_err());
    assert_eq!(store.watermark().await.unwrap(), None);
}
