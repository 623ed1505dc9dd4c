// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Alert delivery to chat channels.

pub mod mock;
pub mod slack;

pub use self::slack::SlackNotifier;

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::config::SlackConfig;

/// Errors from alert delivery.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum NotifyError {
    /// Transport-level failure while posting the message.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The chat service accepted the request but rejected the message.
    #[error("chat service rejected the message: {0}")]
    Rejected(String),
}

/// What happened to the execution.
#[derive(Debug, Clone)]
pub enum AlertKind {
    /// Still running past its configured deadline.
    Delayed {
        /// The instant the deadline passed.
        deadline: DateTime<Utc>,
        /// The configured maximum running duration.
        allowed: Duration,
    },
    /// Reached a terminal failure status (FAILED or TIMED_OUT).
    Terminal {
        /// The raw terminal status.
        status: String,
        /// When the execution stopped.
        stopped_at: DateTime<Utc>,
    },
}

/// One alert about a single execution.
#[derive(Debug, Clone)]
pub struct Alert {
    /// What is being reported.
    pub kind: AlertKind,
    /// Workflow name.
    pub workflow: String,
    /// Execution name.
    pub execution: String,
    /// Deep link to the execution in the service console.
    pub link: String,
    /// When the execution started.
    pub started_at: DateTime<Utc>,
}

/// Sends alerts to a chat channel.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver `alert` using the given channel settings.
    ///
    /// Failures surface to the caller; they are never swallowed.
    async fn notify(&self, channel: &SlackConfig, alert: &Alert) -> Result<(), NotifyError>;
}
