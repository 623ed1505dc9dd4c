// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! HTTP implementation of the workflow service client.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;

use super::{ApiError, ExecutionDetail, ExecutionPage, WorkflowService};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Workflow service client over the service's HTTP API.
pub struct HttpWorkflowService {
    client: reqwest::Client,
    endpoint: String,
}

#[derive(Debug, Deserialize)]
struct IdentityResponse {
    account: String,
}

impl HttpWorkflowService {
    /// Create a client for the service at `endpoint`.
    pub fn new(endpoint: impl Into<String>) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;

        Ok(Self {
            client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, ApiError> {
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ApiError::Service {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl WorkflowService for HttpWorkflowService {
    async fn caller_account(&self) -> Result<String, ApiError> {
        let identity: IdentityResponse =
            self.get_json(&format!("{}/v1/identity", self.endpoint)).await?;
        Ok(identity.account)
    }

    async fn list_executions(
        &self,
        workflow_id: &str,
        page_token: Option<&str>,
    ) -> Result<ExecutionPage, ApiError> {
        let mut url = format!("{}/v1/workflows/{}/executions", self.endpoint, workflow_id);
        if let Some(token) = page_token {
            url.push_str("?page_token=");
            url.push_str(token);
        }

        match self.get_json(&url).await {
            // The service reports a deleted workflow as a plain 404.
            Err(ApiError::Service { status: 404, .. }) => {
                Err(ApiError::WorkflowNotFound(workflow_id.to_string()))
            }
            other => other,
        }
    }

    async fn describe_execution(&self, execution_ref: &str) -> Result<ExecutionDetail, ApiError> {
        self.get_json(&format!("{}/v1/executions/{}", self.endpoint, execution_ref))
            .await
    }
}
