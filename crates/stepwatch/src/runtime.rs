// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Service runtime: spawns the stage workers and joins them on shutdown.

use std::sync::Arc;

use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::config::Config;
use crate::notify::Notifier;
use crate::registration::RegistrationWorker;
use crate::store::TrackingStore;
use crate::watch::WatchWorker;
use crate::workflow::WorkflowService;

/// A running stepwatch service.
///
/// The two stages run as independent tokio tasks with no ordering
/// guarantee between their ticks; the tracking store is their only
/// coupling point. Call [`shutdown`](Self::shutdown) for graceful
/// termination.
pub struct Runtime {
    registration_handle: JoinHandle<()>,
    watch_handle: JoinHandle<()>,
    registration_shutdown: Arc<Notify>,
    watch_shutdown: Arc<Notify>,
}

impl Runtime {
    /// Spawn both stage workers.
    pub fn start(
        store: Arc<dyn TrackingStore>,
        service: Arc<dyn WorkflowService>,
        notifier: Arc<dyn Notifier>,
        config: Arc<Config>,
    ) -> Self {
        let registration = RegistrationWorker::new(store.clone(), service.clone(), config.clone());
        let registration_shutdown = registration.shutdown_handle();
        let registration_handle = tokio::spawn(async move {
            registration.run().await;
        });

        let watch = WatchWorker::new(store, service, notifier, config);
        let watch_shutdown = watch.shutdown_handle();
        let watch_handle = tokio::spawn(async move {
            watch.run().await;
        });

        info!("Runtime started");

        Self {
            registration_handle,
            watch_handle,
            registration_shutdown,
            watch_shutdown,
        }
    }

    /// Gracefully stop both workers.
    ///
    /// Blocks until any in-flight tick has completed and both loops have
    /// exited.
    pub async fn shutdown(self) {
        info!("Runtime shutting down...");

        self.registration_shutdown.notify_one();
        self.watch_shutdown.notify_one();

        if let Err(e) = self.registration_handle.await {
            error!("Registration worker task panicked: {}", e);
        }

        if let Err(e) = self.watch_handle.await {
            error!("Watch worker task panicked: {}", e);
        }

        info!("Runtime shutdown complete");
    }
}
