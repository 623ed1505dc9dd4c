// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Client interface to the managed state-machine service.
//!
//! The service is consumed read-only: stepwatch lists executions, looks up
//! their current state, and resolves the caller's account identifier. The
//! wire format beyond the fields read here is not this crate's concern.

pub mod http;
pub mod mock;

pub use self::http::HttpWorkflowService;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use thiserror::Error;

/// Errors from the workflow service.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ApiError {
    /// The named workflow does not exist upstream. Recoverable during
    /// discovery: the workflow may have been deleted after it was
    /// configured.
    #[error("workflow not found: {0}")]
    WorkflowNotFound(String),

    /// Transport-level failure (connect, timeout, body read).
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The service answered with a non-success status.
    #[error("service error {status}: {message}")]
    Service {
        /// HTTP status code.
        status: u16,
        /// Response body, if any.
        message: String,
    },
}

impl ApiError {
    /// Whether a retry is likely to succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            ApiError::Transport(_) => true,
            ApiError::Service { status, .. } => *status >= 500 || *status == 429,
            ApiError::WorkflowNotFound(_) => false,
        }
    }
}

/// Summary of an execution as returned by the listing endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct ExecutionSummary {
    /// Unique execution reference.
    pub execution_ref: String,
    /// Execution name, unique within its workflow.
    pub name: String,
    /// When the execution started.
    pub started_at: DateTime<Utc>,
}

/// One page of the execution listing, newest executions first.
#[derive(Debug, Clone, Deserialize)]
pub struct ExecutionPage {
    /// Executions on this page.
    pub executions: Vec<ExecutionSummary>,
    /// Token for the next page, absent on the last page.
    pub next_page: Option<String>,
}

/// Full execution state as returned by the describe endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct ExecutionDetail {
    /// Unique execution reference.
    pub execution_ref: String,
    /// Execution name, unique within its workflow.
    pub name: String,
    /// Fully-qualified workflow identifier
    /// (`wrn:states:<region>:<account>:workflow:<name>`).
    pub workflow_id: String,
    /// Raw status string (RUNNING, SUCCEEDED, FAILED, TIMED_OUT, ABORTED).
    pub status: String,
    /// When the execution started.
    pub started_at: DateTime<Utc>,
    /// When the execution stopped, absent while running.
    pub stopped_at: Option<DateTime<Utc>>,
}

/// Read-only client surface of the workflow service.
#[async_trait]
pub trait WorkflowService: Send + Sync {
    /// Resolve the account identifier of the calling credentials.
    async fn caller_account(&self) -> Result<String, ApiError>;

    /// List executions of `workflow_id`, newest first, one page at a time.
    async fn list_executions(
        &self,
        workflow_id: &str,
        page_token: Option<&str>,
    ) -> Result<ExecutionPage, ApiError>;

    /// Fetch the current state of one execution.
    async fn describe_execution(&self, execution_ref: &str) -> Result<ExecutionDetail, ApiError>;
}

/// Build a fully-qualified workflow identifier.
pub fn workflow_id(region: &str, account: &str, name: &str) -> String {
    format!("wrn:states:{region}:{account}:workflow:{name}")
}

/// Extract the workflow name, the last `:`-segment of a fully-qualified
/// identifier.
pub fn workflow_name(workflow_id: &str) -> &str {
    match workflow_id.rfind(':') {
        Some(i) => &workflow_id[i + 1..],
        None => workflow_id,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workflow_id_format() {
        assert_eq!(
            workflow_id("eu-west-1", "123456789012", "orders"),
            "wrn:states:eu-west-1:123456789012:workflow:orders"
        );
    }

    #[test]
    fn test_workflow_name_is_last_segment() {
        assert_eq!(
            workflow_name("wrn:states:eu-west-1:123456789012:workflow:orders"),
            "orders"
        );
        assert_eq!(workflow_name("orders"), "orders");
    }

    #[test]
    fn test_transient_classification() {
        assert!(
            ApiError::Service {
                status: 503,
                message: String::new()
            }
            .is_transient()
        );
        assert!(
            ApiError::Service {
                status: 429,
                message: String::new()
            }
            .is_transient()
        );
        assert!(
            !ApiError::Service {
                status: 400,
                message: String::new()
            }
            .is_transient()
        );
        assert!(!ApiError::WorkflowNotFound("orders".to_string()).is_transient());
    }
}
