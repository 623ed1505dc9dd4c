// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Recording notifier for testing.

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{Alert, Notifier, NotifyError};
use crate::config::SlackConfig;

/// Notifier that records every alert instead of sending it.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<(SlackConfig, Alert)>>,
    fail: bool,
}

impl RecordingNotifier {
    /// Create a recording notifier that accepts every alert.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a recording notifier that fails every delivery.
    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    /// Alerts delivered so far, with the channel each was sent to.
    pub async fn sent(&self) -> Vec<(SlackConfig, Alert)> {
        self.sent.lock().await.clone()
    }

    /// Number of alerts delivered so far.
    pub async fn count(&self) -> usize {
        self.sent.lock().await.len()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, channel: &SlackConfig, alert: &Alert) -> Result<(), NotifyError> {
        if self.fail {
            return Err(NotifyError::Rejected("mock delivery failure".to_string()));
        }
        self.sent.lock().await.push((channel.clone(), alert.clone()));
        Ok(())
    }
}
