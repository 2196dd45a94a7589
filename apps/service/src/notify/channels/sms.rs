use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use super::ChannelDispatcher;
use super::slack::slack_message;
use crate::notify::error::{NotifyError, Result};
use crate::notify::types::{Channel, NotificationEvent, Recipient};

/// Text message gateway
#[async_trait]
pub trait SmsProvider: Send + Sync {
    async fn send_sms(&self, to: &str, message: &str) -> anyhow::Result<()>;
}

/// SMS delivery. Without a provider every attempt fails and is not counted.
#[derive(Default)]
pub struct SmsChannel {
    provider: Option<Arc<dyn SmsProvider>>,
}

impl SmsChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_provider(mut self, provider: Arc<dyn SmsProvider>) -> Self {
        self.provider = Some(provider);
        self
    }
}

#[async_trait]
impl ChannelDispatcher for SmsChannel {
    fn channel(&self) -> Channel {
        Channel::Sms
    }

    async fn send(&self, recipient: &Recipient, event: &NotificationEvent) -> Result<()> {
        let Some(provider) = &self.provider else {
            debug!("SMS requested for {} but no provider is wired", recipient.email);
            return Err(NotifyError::NoProvider(Channel::Sms));
        };

        let phone = recipient
            .credential(Channel::Sms)
            .ok_or(NotifyError::MissingCredential(Channel::Sms))?;

        provider
            .send_sms(phone, &slack_message(event))
            .await
            .map_err(|e| NotifyError::provider(Channel::Sms, e))
    }
}
