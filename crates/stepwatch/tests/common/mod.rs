// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Common test infrastructure for stepwatch integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tempfile::TempDir;

use stepwatch::config::{Config, SlackConfig, WorkflowConfig};
use stepwatch::store::SqliteStore;
use stepwatch::workflow::{self, ExecutionDetail};

pub const REGION: &str = "eu-west-1";
pub const ACCOUNT: &str = "123456789012";

/// Create a file-backed SQLite store in a fresh temporary directory.
///
/// The directory must stay alive for as long as the store is used.
pub async fn sqlite_store() -> (Arc<SqliteStore>, TempDir) {
    let dir = TempDir::new().unwrap();
    let store = SqliteStore::from_path(dir.path().join("stepwatch.db"))
        .await
        .unwrap();
    (Arc::new(store), dir)
}

/// Build a config watching the given `(name, deadline)` workflows.
pub fn test_config(workflows: &[(&str, Option<u64>)]) -> Config {
    Config {
        debug: false,
        database_url: "sqlite:stepwatch.db".to_string(),
        service_endpoint: "https://states.example.com".to_string(),
        region: REGION.to_string(),
        registration_interval: 60,
        watch_interval: 60,
        slack: SlackConfig {
            api_token: "xoxb-test".to_string(),
            username: "stepwatch".to_string(),
            channel: "#workflows".to_string(),
            attachment_color: "#36a64f".to_string(),
            icon_url: String::new(),
        },
        workflows: workflows
            .iter()
            .map(|(name, deadline)| {
                (
                    name.to_string(),
                    WorkflowConfig {
                        deadline: *deadline,
                        slack: SlackConfig::default(),
                    },
                )
            })
            .collect(),
    }
}

/// Fully-qualified identifier of a test workflow.
pub fn workflow_id(name: &str) -> String {
    workflow::workflow_id(REGION, ACCOUNT, name)
}

/// Build an execution detail for `workflow`/`execution`.
pub fn detail(
    workflow: &str,
    execution: &str,
    status: &str,
    started_at: DateTime<Utc>,
    stopped_at: Option<DateTime<Utc>>,
) -> ExecutionDetail {
    ExecutionDetail {
        execution_ref: format!("wrn:states:{REGION}:{ACCOUNT}:execution:{workflow}:{execution}"),
        name: execution.to_string(),
        workflow_id: workflow_id(workflow),
        status: status.to_string(),
        started_at,
        stopped_at,
    }
}
