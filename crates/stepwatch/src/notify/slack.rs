// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Slack notifier.
//!
//! Posts one `chat.postMessage` per alert with a single attachment:
//! a markdown pretext naming the condition, the execution as a linked
//! title, and Start plus Deadline/Stop fields.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};

use super::{Alert, AlertKind, Notifier, NotifyError};
use crate::config::SlackConfig;

const POST_MESSAGE_URL: &str = "https://slack.com/api/chat.postMessage";
const TIME_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Notifier posting to the Slack Web API.
pub struct SlackNotifier {
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct PostMessageAck {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
}

impl Default for SlackNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl SlackNotifier {
    /// Create a Slack notifier.
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

fn build_payload(channel: &SlackConfig, alert: &Alert) -> Value {
    let (pretext, extra_field) = match &alert.kind {
        AlertKind::Delayed { deadline, allowed } => (
            "Found *DELAYED* execution".to_string(),
            json!({
                "title": "Deadline",
                "value": format!(
                    "{} (within {:.2} minutes)",
                    deadline.format(TIME_FORMAT),
                    allowed.as_secs_f64() / 60.0
                ),
                "short": false,
            }),
        ),
        AlertKind::Terminal { status, stopped_at } => (
            format!("Found *{status}* execution"),
            json!({
                "title": "Stop",
                "value": stopped_at.format(TIME_FORMAT).to_string(),
                "short": true,
            }),
        ),
    };

    json!({
        "channel": channel.channel,
        "username": channel.username,
        "icon_url": channel.icon_url,
        "attachments": [{
            "mrkdwn_in": ["pretext"],
            "pretext": pretext,
            "color": channel.attachment_color,
            "title": format!("{}/{}", alert.workflow, alert.execution),
            "title_link": alert.link,
            "fields": [
                {
                    "title": "Start",
                    "value": alert.started_at.format(TIME_FORMAT).to_string(),
                    "short": true,
                },
                extra_field,
            ],
        }],
    })
}

#[async_trait]
impl Notifier for SlackNotifier {
    async fn notify(&self, channel: &SlackConfig, alert: &Alert) -> Result<(), NotifyError> {
        let response = self
            .client
            .post(POST_MESSAGE_URL)
            .bearer_auth(&channel.api_token)
            .json(&build_payload(channel, alert))
            .send()
            .await?;

        // Slack reports most failures inside a 200 response body.
        let ack: PostMessageAck = response.json().await?;
        if !ack.ok {
            return Err(NotifyError::Rejected(
                ack.error.unwrap_or_else(|| "unknown error".to_string()),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use chrono::Utc;
    use std::time::Duration;

    fn channel() -> SlackConfig {
        SlackConfig {
            api_token: "xoxb-test".to_string(),
            username: "stepwatch".to_string(),
            channel: "#workflows".to_string(),
            attachment_color: "#36a64f".to_string(),
            icon_url: "https://example.com/icon.png".to_string(),
        }
    }

    fn alert(kind: AlertKind) -> Alert {
        Alert {
            kind,
            workflow: "orders".to_string(),
            execution: "run-42".to_string(),
            link: "https://states.example.com/console/eu-west-1/executions/x".to_string(),
            started_at: Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_delayed_payload() {
        let deadline = Utc.with_ymd_and_hms(2025, 6, 1, 12, 5, 0).unwrap();
        let payload = build_payload(
            &channel(),
            &alert(AlertKind::Delayed {
                deadline,
                allowed: Duration::from_secs(300),
            }),
        );

        assert_eq!(payload["channel"], "#workflows");
        assert_eq!(payload["username"], "stepwatch");

        let attachment = &payload["attachments"][0];
        assert_eq!(attachment["pretext"], "Found *DELAYED* execution");
        assert_eq!(attachment["title"], "orders/run-42");
        assert_eq!(attachment["fields"][0]["title"], "Start");
        assert_eq!(attachment["fields"][0]["value"], "2025-06-01 12:00");
        assert_eq!(attachment["fields"][1]["title"], "Deadline");
        assert_eq!(
            attachment["fields"][1]["value"],
            "2025-06-01 12:05 (within 5.00 minutes)"
        );
    }

    #[test]
    fn test_terminal_payload() {
        let stopped_at = Utc.with_ymd_and_hms(2025, 6, 1, 12, 7, 0).unwrap();
        let payload = build_payload(
            &channel(),
            &alert(AlertKind::Terminal {
                status: "FAILED".to_string(),
                stopped_at,
            }),
        );

        let attachment = &payload["attachments"][0];
        assert_eq!(attachment["pretext"], "Found *FAILED* execution");
        assert_eq!(attachment["fields"][1]["title"], "Stop");
        assert_eq!(attachment["fields"][1]["value"], "2025-06-01 12:07");
    }
}
