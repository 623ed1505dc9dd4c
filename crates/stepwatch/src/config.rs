// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Configuration loading for stepwatch.
//!
//! Configuration lives in a YAML file whose path is given by the
//! `CONFIG_PATH` environment variable. The file names the tracking store,
//! the workflow service endpoint, the Slack defaults, and the set of
//! workflows to watch.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

/// Service configuration loaded from a YAML file.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Enables verbose (`stepwatch=debug`) logging.
    #[serde(default)]
    pub debug: bool,
    /// Tracking store URL (`postgres://…` or `sqlite:…`).
    pub database_url: String,
    /// Base URL of the workflow service HTTP API.
    pub service_endpoint: String,
    /// Cloud region, used in workflow identifiers and console links.
    pub region: String,
    /// Seconds between discovery ticks.
    #[serde(default = "default_interval")]
    pub registration_interval: u64,
    /// Seconds between evaluation ticks.
    #[serde(default = "default_interval")]
    pub watch_interval: u64,
    /// Global Slack settings, overridable per workflow.
    #[serde(default)]
    pub slack: SlackConfig,
    /// Watched workflows by name.
    #[serde(default)]
    pub workflows: HashMap<String, WorkflowConfig>,
}

fn default_interval() -> u64 {
    60
}

/// Per-workflow settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WorkflowConfig {
    /// Maximum running duration in seconds before an execution counts as
    /// delayed. Executions of workflows without a deadline are never
    /// reported as delayed.
    pub deadline: Option<u64>,
    /// Slack overrides for this workflow.
    #[serde(default)]
    pub slack: SlackConfig,
}

/// Slack channel settings.
///
/// Empty fields inherit from the global settings when merged; there is no
/// way to explicitly clear a global default for one workflow.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SlackConfig {
    /// Bot token used for `chat.postMessage`.
    #[serde(default)]
    pub api_token: String,
    /// Display name the message is posted under.
    #[serde(default)]
    pub username: String,
    /// Target channel.
    #[serde(default)]
    pub channel: String,
    /// Accent color of the message attachment.
    #[serde(default)]
    pub attachment_color: String,
    /// Avatar URL the message is posted with.
    #[serde(default)]
    pub icon_url: String,
}

impl SlackConfig {
    /// Overlay the non-empty fields of `overrides` onto a copy of self.
    pub fn merged(&self, overrides: &SlackConfig) -> SlackConfig {
        let mut merged = self.clone();
        if !overrides.api_token.is_empty() {
            merged.api_token = overrides.api_token.clone();
        }
        if !overrides.username.is_empty() {
            merged.username = overrides.username.clone();
        }
        if !overrides.channel.is_empty() {
            merged.channel = overrides.channel.clone();
        }
        if !overrides.attachment_color.is_empty() {
            merged.attachment_color = overrides.attachment_color.clone();
        }
        if !overrides.icon_url.is_empty() {
            merged.icon_url = overrides.icon_url.clone();
        }
        merged
    }
}

impl Config {
    /// Load configuration from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let data = std::fs::read_to_string(path.as_ref()).map_err(ConfigError::Read)?;
        let config = serde_yaml::from_str(&data)?;
        Ok(config)
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read configuration file: {0}")]
    Read(#[source] std::io::Error),

    /// The configuration file could not be parsed.
    #[error("failed to parse configuration file: {0}")]
    Parse(#[from] serde_yaml::Error),
}
