//! Signed webhook delivery to organization-registered endpoints.

pub mod delivery;
pub mod signing;
pub mod store;

pub use delivery::{DEFAULT_WEBHOOK_TIMEOUT, DeliveryOutcome, TriggerHandle, WebhookDelivery, WebhookSender};
pub use signing::{EVENT_HEADER, SIGNATURE_HEADER, sign_payload, verify_signature};
pub use store::{MemoryWebhookStore, WebhookEventType, WebhookStore, WebhookSubscription};
