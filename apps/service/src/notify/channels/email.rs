use anyhow::{Context, anyhow};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use url::Url;

use super::ChannelDispatcher;
use crate::notify::error::{NotifyError, Result};
use crate::notify::types::{Channel, EventKind, NotificationEvent, Recipient};

/// Email templates known to the provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum EmailTemplate {
    IncidentAlert,
    IncidentResolved,
}

impl EmailTemplate {
    pub fn for_event(kind: EventKind) -> Self {
        match kind {
            EventKind::Incident => EmailTemplate::IncidentAlert,
            EventKind::Resolution => EmailTemplate::IncidentResolved,
        }
    }
}

/// Opaque email provider
#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send_email(&self, to: &str, template: EmailTemplate, data: &Value) -> anyhow::Result<()>;
}

/// Email provider reached over an HTTP API
#[derive(Debug, Clone)]
pub struct HttpEmailSender {
    client: reqwest::Client,
    api_url: Url,
    api_key: Option<String>,
    from: String,
}

impl HttpEmailSender {
    pub fn new(api_url: &str, from: impl Into<String>, timeout: Duration) -> anyhow::Result<Self> {
        Ok(Self {
            client: reqwest::Client::builder().timeout(timeout).build()?,
            api_url: Url::parse(api_url).context("Invalid email API URL")?,
            api_key: None,
            from: from.into(),
        })
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }
}

#[async_trait]
impl EmailSender for HttpEmailSender {
    async fn send_email(&self, to: &str, template: EmailTemplate, data: &Value) -> anyhow::Result<()> {
        let mut request = self.client.post(self.api_url.clone()).json(&json!({
            "from": self.from,
            "to": to,
            "template": template,
            "data": data,
        }));
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("Email API returned status {}", status.as_u16()));
        }

        Ok(())
    }
}

/// Templated email per event kind
pub struct EmailChannel {
    sender: Arc<dyn EmailSender>,
    dashboard_url: String,
}

impl EmailChannel {
    pub fn new(sender: Arc<dyn EmailSender>, dashboard_url: impl Into<String>) -> Self {
        Self { sender, dashboard_url: dashboard_url.into() }
    }

    fn template_data(&self, event: &NotificationEvent) -> Value {
        let incident = &event.incident;
        json!({
            "siteName": event.site.name,
            "siteUrl": event.site.url,
            "incidentTitle": incident.title,
            "severity": incident.severity,
            "aiSummary": incident.ai_summary,
            "startedAt": incident.started_at.to_rfc3339(),
            "resolvedAt": incident.resolved_at.map(|at| at.to_rfc3339()),
            "dashboardUrl": format!("{}/sites/{}", self.dashboard_url.trim_end_matches('/'), event.site.id),
        })
    }
}

#[async_trait]
impl ChannelDispatcher for EmailChannel {
    fn channel(&self) -> Channel {
        Channel::Email
    }

    async fn send(&self, recipient: &Recipient, event: &NotificationEvent) -> Result<()> {
        let template = EmailTemplate::for_event(event.kind);
        debug!("Emailing {:?} for incident {} to {}", template, event.incident.id, recipient.email);

        self.sender
            .send_email(&recipient.email, template, &self.template_data(event))
            .await
            .map_err(|e| NotifyError::provider(Channel::Email, e))
    }
}
