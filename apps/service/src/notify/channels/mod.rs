//! Delivery channels for the notification engine.
//!
//! Every channel goes through the same gate: the recipient enabled it, the
//! organization's plan allows it, and the recipient supplied a credential
//! when the channel needs one.

pub mod email;
pub mod slack;
pub mod sms;
pub mod webhook;

use async_trait::async_trait;

use super::error::Result;
use super::types::{Channel, NotificationEvent, PlanLimits, Recipient};

pub use email::{EmailChannel, EmailSender, EmailTemplate, HttpEmailSender};
pub use slack::{SlackChannel, slack_message};
pub use sms::{SmsChannel, SmsProvider};
pub use webhook::WebhookChannel;

/// A channel the engine can deliver through
#[async_trait]
pub trait ChannelDispatcher: Send + Sync {
    fn channel(&self) -> Channel;

    /// Whether this recipient may receive on this channel under `plan`
    fn can_send(&self, recipient: &Recipient, plan: &PlanLimits) -> bool {
        let channel = self.channel();
        recipient.has_enabled(channel)
            && plan.allows(channel)
            && (!channel.requires_credential() || recipient.credential(channel).is_some())
    }

    async fn send(&self, recipient: &Recipient, event: &NotificationEvent) -> Result<()>;
}
