// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Evaluation stage: re-checks tracked executions and reacts.
//!
//! Each tick reads every tracked execution, fetches its current status from
//! the workflow service, and classifies it:
//!
//! | Status | Action |
//! |--------|--------|
//! | RUNNING, no deadline | none, stays tracked |
//! | RUNNING, within deadline | none, stays tracked |
//! | RUNNING, past deadline | delayed alert, then untrack |
//! | SUCCEEDED, ABORTED | untrack silently |
//! | FAILED, TIMED_OUT | failure alert, then untrack |
//! | anything else | tick fails |
//!
//! An alert is always delivered before its record is removed. A tick that
//! fails after a delivered alert re-evaluates the execution next time and
//! may alert again: delivery is at-least-once, never at-most-once.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::Notify;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::error::Error;
use crate::notify::{Alert, AlertKind, Notifier};
use crate::store::{TrackedExecution, TrackingStore};
use crate::workflow::{self, ApiError, ExecutionDetail, WorkflowService};

/// How many times a transient status fetch failure is retried before the
/// tick fails.
const MAX_FETCH_ATTEMPTS: u32 = 5;
/// Delay before the first retry; doubles per attempt.
const INITIAL_RETRY_DELAY: Duration = Duration::from_millis(500);

/// Background worker running the evaluation loop.
pub struct WatchWorker {
    store: Arc<dyn TrackingStore>,
    service: Arc<dyn WorkflowService>,
    notifier: Arc<dyn Notifier>,
    config: Arc<Config>,
    shutdown: Arc<Notify>,
}

impl WatchWorker {
    /// Create a new watch worker.
    pub fn new(
        store: Arc<dyn TrackingStore>,
        service: Arc<dyn WorkflowService>,
        notifier: Arc<dyn Notifier>,
        config: Arc<Config>,
    ) -> Self {
        Self {
            store,
            service,
            notifier,
            config,
            shutdown: Arc::new(Notify::new()),
        }
    }

    /// Get a handle that can be used to signal shutdown.
    pub fn shutdown_handle(&self) -> Arc<Notify> {
        self.shutdown.clone()
    }

    /// Run the watch loop: one tick immediately, then one per configured
    /// interval. The loop exits when the shutdown signal is received; a
    /// stop is honored only between ticks.
    pub async fn run(&self) {
        info!(
            interval_secs = self.config.watch_interval,
            "Watch worker started"
        );

        if let Err(e) = self.watch().await {
            error!(error = %e, "Watch tick failed");
        }

        loop {
            tokio::select! {
                biased;

                _ = self.shutdown.notified() => {
                    info!("Watch worker received shutdown signal");
                    break;
                }

                _ = tokio::time::sleep(Duration::from_secs(self.config.watch_interval)) => {
                    if let Err(e) = self.watch().await {
                        error!(error = %e, "Watch tick failed");
                    }
                }
            }
        }

        info!("Watch worker stopped");
    }

    /// Run a single evaluation tick over every tracked execution.
    pub async fn watch(&self) -> Result<(), Error> {
        let executions = self.store.find_all_executions().await?;
        debug!(count = executions.len(), "Evaluating tracked executions");

        for tracked in &executions {
            self.evaluate(tracked).await?;
        }

        Ok(())
    }

    async fn evaluate(&self, tracked: &TrackedExecution) -> Result<(), Error> {
        let detail = self.describe_with_backoff(&tracked.execution_ref).await?;

        let workflow_name = workflow::workflow_name(&detail.workflow_id);
        let Some(workflow_config) = self.config.workflows.get(workflow_name) else {
            // Not a workflow this service is responsible for.
            return Ok(());
        };

        let channel = self.config.slack.merged(&workflow_config.slack);
        let link = format!(
            "{}/console/{}/executions/{}",
            self.config.service_endpoint, self.config.region, detail.execution_ref
        );

        match detail.status.as_str() {
            "RUNNING" => {
                let Some(deadline_secs) = workflow_config.deadline else {
                    return Ok(());
                };

                let allowed = Duration::from_secs(deadline_secs);
                let deadline = detail.started_at + chrono::Duration::seconds(deadline_secs as i64);
                if Utc::now() <= deadline {
                    return Ok(());
                }

                info!(
                    execution_ref = %detail.execution_ref,
                    deadline = %deadline,
                    "Execution delayed"
                );

                self.notifier
                    .notify(
                        &channel,
                        &Alert {
                            kind: AlertKind::Delayed { deadline, allowed },
                            workflow: workflow_name.to_string(),
                            execution: detail.name.clone(),
                            link,
                            started_at: detail.started_at,
                        },
                    )
                    .await?;

                self.store
                    .delete_execution(&tracked.tracking_id, tracked.shard)
                    .await?;
            }
            // ABORTED is a deliberate cancel: no alert for it either.
            "SUCCEEDED" | "ABORTED" => {
                info!(
                    execution_ref = %detail.execution_ref,
                    status = %detail.status,
                    "Execution finished"
                );

                self.store
                    .delete_execution(&tracked.tracking_id, tracked.shard)
                    .await?;
            }
            "FAILED" | "TIMED_OUT" => {
                info!(
                    execution_ref = %detail.execution_ref,
                    status = %detail.status,
                    "Execution failed"
                );

                let stopped_at = detail.stopped_at.unwrap_or_else(Utc::now);
                self.notifier
                    .notify(
                        &channel,
                        &Alert {
                            kind: AlertKind::Terminal {
                                status: detail.status.clone(),
                                stopped_at,
                            },
                            workflow: workflow_name.to_string(),
                            execution: detail.name.clone(),
                            link,
                            started_at: detail.started_at,
                        },
                    )
                    .await?;

                self.store
                    .delete_execution(&tracked.tracking_id, tracked.shard)
                    .await?;
            }
            other => {
                return Err(Error::UnrecognizedStatus {
                    execution_ref: detail.execution_ref.clone(),
                    status: other.to_string(),
                });
            }
        }

        Ok(())
    }

    /// Fetch execution state, retrying transient failures with exponential
    /// backoff up to [`MAX_FETCH_ATTEMPTS`].
    async fn describe_with_backoff(&self, execution_ref: &str) -> Result<ExecutionDetail, ApiError> {
        let mut delay = INITIAL_RETRY_DELAY;
        let mut attempt = 1;

        loop {
            match self.service.describe_execution(execution_ref).await {
                Ok(detail) => return Ok(detail),
                Err(e) if e.is_transient() && attempt < MAX_FETCH_ATTEMPTS => {
                    warn!(
                        execution_ref = %execution_ref,
                        attempt,
                        error = %e,
                        "Status fetch failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
