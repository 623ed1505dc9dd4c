// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Discovery stage: registers newly started executions for watching.
//!
//! Each tick lists executions per configured workflow since the stored
//! watermark, inserts unseen ones into the tracking store, and advances the
//! watermark to the time the tick began. Listing pages arrive newest first,
//! so the first execution older than the watermark ends that workflow's
//! scan.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::Notify;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::error::Error;
use crate::store::TrackingStore;
use crate::workflow::{self, ApiError, WorkflowService};

/// Background worker running the discovery loop.
pub struct RegistrationWorker {
    store: Arc<dyn TrackingStore>,
    service: Arc<dyn WorkflowService>,
    config: Arc<Config>,
    shutdown: Arc<Notify>,
}

impl RegistrationWorker {
    /// Create a new registration worker.
    pub fn new(
        store: Arc<dyn TrackingStore>,
        service: Arc<dyn WorkflowService>,
        config: Arc<Config>,
    ) -> Self {
        Self {
            store,
            service,
            config,
            shutdown: Arc::new(Notify::new()),
        }
    }

    /// Get a handle that can be used to signal shutdown.
    pub fn shutdown_handle(&self) -> Arc<Notify> {
        self.shutdown.clone()
    }

    /// Run the registration loop: one tick immediately, then one per
    /// configured interval. The loop exits when the shutdown signal is
    /// received; a stop is honored only between ticks.
    pub async fn run(&self) {
        info!(
            interval_secs = self.config.registration_interval,
            "Registration worker started"
        );

        if let Err(e) = self.register().await {
            error!(error = %e, "Registration tick failed");
        }

        loop {
            tokio::select! {
                biased;

                _ = self.shutdown.notified() => {
                    info!("Registration worker received shutdown signal");
                    break;
                }

                _ = tokio::time::sleep(std::time::Duration::from_secs(self.config.registration_interval)) => {
                    if let Err(e) = self.register().await {
                        error!(error = %e, "Registration tick failed");
                    }
                }
            }
        }

        info!("Registration worker stopped");
    }

    /// Run a single discovery tick.
    pub async fn register(&self) -> Result<(), Error> {
        let tick_started = Utc::now();

        // First run: only executions starting from now on are discovered.
        let watermark = match self.store.watermark().await? {
            Some(at) => at,
            None => tick_started,
        };

        let account = self.service.caller_account().await?;

        for name in self.config.workflows.keys() {
            let workflow_id = workflow::workflow_id(&self.config.region, &account, name);

            if let Err(e) = self.register_workflow(&workflow_id, watermark).await {
                match e {
                    Error::Api(ApiError::WorkflowNotFound(_)) => {
                        warn!(workflow = %name, "Workflow not found upstream, skipping");
                        continue;
                    }
                    other => return Err(other),
                }
            }
        }

        // Written as the tick start time so executions started mid-scan are
        // picked up by the next tick.
        self.store.set_watermark(tick_started).await?;

        Ok(())
    }

    /// Scan one workflow's executions, newest first, down to the watermark.
    async fn register_workflow(
        &self,
        workflow_id: &str,
        watermark: DateTime<Utc>,
    ) -> Result<(), Error> {
        let mut page_token: Option<String> = None;

        loop {
            let page = self
                .service
                .list_executions(workflow_id, page_token.as_deref())
                .await?;

            for execution in &page.executions {
                if execution.started_at < watermark {
                    // Pages are chronologically ordered, so everything from
                    // here on was already discovered by an earlier tick.
                    return Ok(());
                }

                let record = self.store.insert_execution(&execution.execution_ref).await?;
                info!(
                    execution_ref = %execution.execution_ref,
                    tracking_id = %record.tracking_id,
                    shard = record.shard,
                    "Registered execution"
                );
            }

            match page.next_page {
                Some(token) => page_token = Some(token),
                None => return Ok(()),
            }
        }
    }
}
