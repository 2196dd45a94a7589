use async_trait::async_trait;
use serde_json::json;
use std::time::Duration;

use super::ChannelDispatcher;
use crate::notify::error::{NotifyError, Result};
use crate::notify::types::{Channel, EventKind, NotificationEvent, Recipient};

/// Plain-text Slack message for an event
pub fn slack_message(event: &NotificationEvent) -> String {
    let incident = &event.incident;
    let mut lines = Vec::new();

    match event.kind {
        EventKind::Incident => {
            lines.push(format!("*Incident: {}*", event.site.name));
            lines.push(format!("Severity: {}", incident.severity));
            lines.push(format!("Issue: {}", incident.title));
        }
        EventKind::Resolution => {
            lines.push(format!("*Resolved: {}*", event.site.name));
            lines.push(format!("Issue: {}", incident.title));
        }
    }

    if let Some(summary) = incident.ai_summary.as_deref().filter(|s| !s.trim().is_empty()) {
        lines.push(format!("Summary: {summary}"));
    }

    lines.push(format!("Started: {}", incident.started_at.format("%Y-%m-%d %H:%M:%S UTC")));
    if let Some(resolved_at) = incident.resolved_at {
        lines.push(format!("Resolved: {}", resolved_at.format("%Y-%m-%d %H:%M:%S UTC")));
    }

    lines.push(format!("URL: {}", event.site.url));
    lines.join("\n")
}

/// Posts to the recipient's Slack incoming webhook
#[derive(Debug, Clone)]
pub struct SlackChannel {
    client: reqwest::Client,
}

impl SlackChannel {
    pub fn new(timeout: Duration) -> Result<Self> {
        Ok(Self { client: reqwest::Client::builder().timeout(timeout).build()? })
    }
}

#[async_trait]
impl ChannelDispatcher for SlackChannel {
    fn channel(&self) -> Channel {
        Channel::Slack
    }

    async fn send(&self, recipient: &Recipient, event: &NotificationEvent) -> Result<()> {
        let webhook_url = recipient
            .credential(Channel::Slack)
            .ok_or(NotifyError::MissingCredential(Channel::Slack))?;

        let response = self
            .client
            .post(webhook_url)
            .json(&json!({ "text": slack_message(event) }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(NotifyError::Api { service: "Slack".to_string(), status: status.as_u16() });
        }

        Ok(())
    }
}
