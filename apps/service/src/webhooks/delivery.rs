use chrono::{SecondsFormat, Utc};
use reqwest::StatusCode;
use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::signing::{EVENT_HEADER, SIGNATURE_HEADER, WEBHOOK_USER_AGENT, sign_payload};
use super::store::{WebhookEventType, WebhookStore, WebhookSubscription};
use crate::error::EngineError;

/// Outbound timeout for a single webhook delivery
pub const DEFAULT_WEBHOOK_TIMEOUT: Duration = Duration::from_secs(10);

/// Signs and POSTs JSON bodies to webhook endpoints
#[derive(Debug, Clone)]
pub struct WebhookSender {
    client: reqwest::Client,
}

impl WebhookSender {
    pub fn new(timeout: Duration) -> Result<Self, EngineError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    /// POST `body` as is. When a secret is given the signature is computed
    /// over these exact bytes.
    pub async fn post(
        &self,
        url: &str,
        secret: Option<&str>,
        event: &str,
        body: String,
    ) -> Result<StatusCode, reqwest::Error> {
        let mut request = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .header(USER_AGENT, WEBHOOK_USER_AGENT)
            .header(EVENT_HEADER, event);

        if let Some(secret) = secret.filter(|s| !s.is_empty()) {
            request = request.header(SIGNATURE_HEADER, sign_payload(secret, body.as_bytes()));
        }

        let response = request.body(body).send().await?;
        Ok(response.status())
    }
}

#[derive(Debug, Serialize)]
struct Envelope<'a> {
    event: WebhookEventType,
    timestamp: String,
    data: &'a Value,
}

/// What happened to one webhook delivery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryOutcome {
    pub webhook_id: String,
    pub url: String,
    /// Response status, absent when the request never got a response
    pub status: Option<u16>,
    pub error: Option<String>,
}

impl DeliveryOutcome {
    pub fn delivered(&self) -> bool {
        self.status.is_some_and(|status| (200..300).contains(&status))
    }
}

/// Handle to in-flight deliveries.
///
/// Dropping it leaves the deliveries running in the background; `join`
/// waits for all of them.
#[derive(Debug, Default)]
pub struct TriggerHandle {
    deliveries: Vec<(String, String, JoinHandle<DeliveryOutcome>)>,
}

impl TriggerHandle {
    pub fn len(&self) -> usize {
        self.deliveries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.deliveries.is_empty()
    }

    /// Wait for every delivery, whatever its outcome
    pub async fn join(self) -> Vec<DeliveryOutcome> {
        let mut outcomes = Vec::with_capacity(self.deliveries.len());
        for (webhook_id, url, handle) in self.deliveries {
            let outcome = handle.await.unwrap_or_else(|e| DeliveryOutcome {
                webhook_id,
                url,
                status: None,
                error: Some(format!("Delivery task failed: {e}")),
            });
            outcomes.push(outcome);
        }
        outcomes
    }
}

/// Delivers organization events to registered webhooks
#[derive(Clone)]
pub struct WebhookDelivery {
    sender: WebhookSender,
    store: Arc<dyn WebhookStore>,
}

impl WebhookDelivery {
    pub fn new(store: Arc<dyn WebhookStore>, timeout: Duration) -> Result<Self, EngineError> {
        Ok(Self { sender: WebhookSender::new(timeout)?, store })
    }

    pub fn sender(&self) -> &WebhookSender {
        &self.sender
    }

    /// Send `payload` to every active webhook of the organization that
    /// subscribed to `event`. Each delivery runs on its own task.
    pub async fn trigger(&self, organization_id: &str, event: WebhookEventType, payload: Value) -> TriggerHandle {
        let webhooks = match self.store.webhooks_for_organization(organization_id).await {
            Ok(webhooks) => webhooks,
            Err(e) => {
                error!("Failed to load webhooks for organization {}: {:#}", organization_id, e);
                return TriggerHandle::default();
            }
        };

        let targets: Vec<WebhookSubscription> = webhooks.into_iter().filter(|w| w.wants(event)).collect();
        if targets.is_empty() {
            debug!("No webhooks subscribed to {} for organization {}", event, organization_id);
            return TriggerHandle::default();
        }

        let envelope = Envelope {
            event,
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            data: &payload,
        };
        let body = match serde_json::to_string(&envelope) {
            Ok(body) => body,
            Err(e) => {
                error!("Failed to serialize {} webhook payload: {}", event, e);
                return TriggerHandle::default();
            }
        };

        info!("Triggering {} webhook(s) for {} in organization {}", targets.len(), event, organization_id);

        let deliveries = targets
            .into_iter()
            .map(|webhook| {
                let sender = self.sender.clone();
                let store = Arc::clone(&self.store);
                let body = body.clone();
                let (id, url) = (webhook.id.clone(), webhook.url.clone());
                let handle = tokio::spawn(deliver(sender, store, webhook, event, body));
                (id, url, handle)
            })
            .collect();

        TriggerHandle { deliveries }
    }
}

async fn deliver(
    sender: WebhookSender,
    store: Arc<dyn WebhookStore>,
    webhook: WebhookSubscription,
    event: WebhookEventType,
    body: String,
) -> DeliveryOutcome {
    let mut outcome = DeliveryOutcome {
        webhook_id: webhook.id.clone(),
        url: webhook.url.clone(),
        status: None,
        error: None,
    };

    match sender.post(&webhook.url, webhook.secret.as_deref(), event.as_str(), body).await {
        Ok(status) => {
            outcome.status = Some(status.as_u16());
            if !status.is_success() {
                warn!("Webhook {} answered {} with status {}", webhook.id, event, status);
            }

            // Any response counts as a trigger, successful or not.
            if let Err(e) = store.mark_triggered(&webhook.id, Utc::now()).await {
                warn!("Failed to record trigger time for webhook {}: {:#}", webhook.id, e);
            }
        }
        Err(e) => {
            warn!("Webhook {} delivery to {} failed: {}", webhook.id, webhook.url, e);
            outcome.error = Some(e.to_string());
        }
    }

    outcome
}
