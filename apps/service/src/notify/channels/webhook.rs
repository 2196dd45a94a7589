use async_trait::async_trait;
use serde::Serialize;

use super::ChannelDispatcher;
use crate::notify::error::{NotifyError, Result};
use crate::notify::types::{Channel, EventKind, Incident, NotificationEvent, Recipient, Site};
use crate::webhooks::WebhookSender;

#[derive(Debug, Serialize)]
struct Envelope<'a> {
    #[serde(rename = "type")]
    kind: EventKind,
    incident: &'a Incident,
    site: &'a Site,
    message: String,
}

/// Posts the event to the recipient's own webhook URL
#[derive(Debug, Clone)]
pub struct WebhookChannel {
    sender: WebhookSender,
}

impl WebhookChannel {
    pub fn new(sender: WebhookSender) -> Self {
        Self { sender }
    }
}

#[async_trait]
impl ChannelDispatcher for WebhookChannel {
    fn channel(&self) -> Channel {
        Channel::Webhook
    }

    async fn send(&self, recipient: &Recipient, event: &NotificationEvent) -> Result<()> {
        let url = recipient
            .credential(Channel::Webhook)
            .ok_or(NotifyError::MissingCredential(Channel::Webhook))?;

        let body = serde_json::to_string(&Envelope {
            kind: event.kind,
            incident: &event.incident,
            site: &event.site,
            message: event.headline(),
        })?;

        let status = self.sender.post(url, None, event.kind.webhook_event().as_str(), body).await?;
        if !status.is_success() {
            return Err(NotifyError::Api { service: "Webhook".to_string(), status: status.as_u16() });
        }

        Ok(())
    }
}
