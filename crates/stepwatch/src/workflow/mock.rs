// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Mock workflow service for testing.
//!
//! Serves a fixed set of executions from memory, with helpers to simulate
//! deleted workflows and transient describe failures.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{ApiError, ExecutionDetail, ExecutionPage, ExecutionSummary, WorkflowService};

/// In-memory workflow service.
pub struct MockWorkflowService {
    account: String,
    page_size: usize,
    executions: Mutex<HashMap<String, Vec<ExecutionSummary>>>,
    details: Mutex<HashMap<String, ExecutionDetail>>,
    missing_workflows: Mutex<HashSet<String>>,
    broken_workflows: Mutex<HashSet<String>>,
    describe_failures: Mutex<HashMap<String, u32>>,
}

impl Default for MockWorkflowService {
    fn default() -> Self {
        Self::new()
    }
}

impl MockWorkflowService {
    /// Create a mock service for account `123456789012` with two
    /// executions per listing page.
    pub fn new() -> Self {
        Self {
            account: "123456789012".to_string(),
            page_size: 2,
            executions: Mutex::new(HashMap::new()),
            details: Mutex::new(HashMap::new()),
            missing_workflows: Mutex::new(HashSet::new()),
            broken_workflows: Mutex::new(HashSet::new()),
            describe_failures: Mutex::new(HashMap::new()),
        }
    }

    /// Use a custom listing page size.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    /// Add an execution to a workflow's listing and to the describe index.
    pub async fn add_execution(&self, workflow_id: &str, detail: ExecutionDetail) {
        let summary = ExecutionSummary {
            execution_ref: detail.execution_ref.clone(),
            name: detail.name.clone(),
            started_at: detail.started_at,
        };
        self.executions
            .lock()
            .await
            .entry(workflow_id.to_string())
            .or_default()
            .push(summary);
        self.details
            .lock()
            .await
            .insert(detail.execution_ref.clone(), detail);
    }

    /// Register an execution for describe lookups only, without listing it.
    pub async fn add_detail(&self, detail: ExecutionDetail) {
        self.details
            .lock()
            .await
            .insert(detail.execution_ref.clone(), detail);
    }

    /// Make listing `workflow_id` fail with [`ApiError::WorkflowNotFound`].
    pub async fn remove_workflow(&self, workflow_id: &str) {
        self.missing_workflows
            .lock()
            .await
            .insert(workflow_id.to_string());
    }

    /// Make listing `workflow_id` fail with a 500 service error.
    pub async fn break_workflow(&self, workflow_id: &str) {
        self.broken_workflows
            .lock()
            .await
            .insert(workflow_id.to_string());
    }

    /// Make the next `times` describe calls for `execution_ref` fail with a
    /// transient service error.
    pub async fn fail_describe(&self, execution_ref: &str, times: u32) {
        self.describe_failures
            .lock()
            .await
            .insert(execution_ref.to_string(), times);
    }
}

#[async_trait]
impl WorkflowService for MockWorkflowService {
    async fn caller_account(&self) -> Result<String, ApiError> {
        Ok(self.account.clone())
    }

    async fn list_executions(
        &self,
        workflow_id: &str,
        page_token: Option<&str>,
    ) -> Result<ExecutionPage, ApiError> {
        if self.missing_workflows.lock().await.contains(workflow_id) {
            return Err(ApiError::WorkflowNotFound(workflow_id.to_string()));
        }

        if self.broken_workflows.lock().await.contains(workflow_id) {
            return Err(ApiError::Service {
                status: 500,
                message: "internal error".to_string(),
            });
        }

        let executions = self.executions.lock().await;
        let mut all: Vec<ExecutionSummary> =
            executions.get(workflow_id).cloned().unwrap_or_default();
        // Listing pages are reverse-chronological.
        all.sort_by(|a, b| b.started_at.cmp(&a.started_at));

        let offset: usize = page_token.map(|t| t.parse().unwrap_or(0)).unwrap_or(0);
        let page: Vec<ExecutionSummary> =
            all.iter().skip(offset).take(self.page_size).cloned().collect();
        let next_offset = offset + page.len();
        let next_page = (next_offset < all.len()).then(|| next_offset.to_string());

        Ok(ExecutionPage {
            executions: page,
            next_page,
        })
    }

    async fn describe_execution(&self, execution_ref: &str) -> Result<ExecutionDetail, ApiError> {
        let mut failures = self.describe_failures.lock().await;
        if let Some(remaining) = failures.get_mut(execution_ref)
            && *remaining > 0
        {
            *remaining -= 1;
            return Err(ApiError::Service {
                status: 503,
                message: "temporarily unavailable".to_string(),
            });
        }
        drop(failures);

        self.details
            .lock()
            .await
            .get(execution_ref)
            .cloned()
            .ok_or_else(|| ApiError::Service {
                status: 404,
                message: format!("execution not found: {execution_ref}"),
            })
    }
}
