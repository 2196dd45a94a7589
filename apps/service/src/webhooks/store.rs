use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Event types an organization can subscribe a webhook to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum WebhookEventType {
    #[serde(rename = "incident.created")]
    IncidentCreated,
    #[serde(rename = "incident.resolved")]
    IncidentResolved,
    #[serde(rename = "site.down")]
    SiteDown,
    #[serde(rename = "site.degraded")]
    SiteDegraded,
    #[serde(rename = "site.recovered")]
    SiteRecovered,
}

impl WebhookEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            WebhookEventType::IncidentCreated => "incident.created",
            WebhookEventType::IncidentResolved => "incident.resolved",
            WebhookEventType::SiteDown => "site.down",
            WebhookEventType::SiteDegraded => "site.degraded",
            WebhookEventType::SiteRecovered => "site.recovered",
        }
    }
}

impl fmt::Display for WebhookEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An endpoint registered by an organization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookSubscription {
    pub id: String,
    pub organization_id: String,
    pub url: String,
    #[serde(default)]
    pub secret: Option<String>,
    pub events: BTreeSet<WebhookEventType>,
    pub is_active: bool,
    #[serde(default)]
    pub last_triggered_at: Option<DateTime<Utc>>,
}

impl WebhookSubscription {
    /// An active subscription with a fresh id
    pub fn new(
        organization_id: impl Into<String>,
        url: impl Into<String>,
        events: impl IntoIterator<Item = WebhookEventType>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            organization_id: organization_id.into(),
            url: url.into(),
            secret: None,
            events: events.into_iter().collect(),
            is_active: true,
            last_triggered_at: None,
        }
    }

    pub fn with_secret(mut self, secret: impl Into<String>) -> Self {
        self.secret = Some(secret.into());
        self
    }

    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }

    /// Whether a delivery of `event` should go to this endpoint
    pub fn wants(&self, event: WebhookEventType) -> bool {
        self.is_active && self.events.contains(&event)
    }
}

/// Read/touch contract on the externally owned webhook records
#[async_trait]
pub trait WebhookStore: Send + Sync {
    /// All webhooks registered by an organization, active or not
    async fn webhooks_for_organization(&self, organization_id: &str) -> Result<Vec<WebhookSubscription>>;

    /// Record that a delivery attempt got a response
    async fn mark_triggered(&self, webhook_id: &str, at: DateTime<Utc>) -> Result<()>;
}

/// In-memory webhook store
#[derive(Debug, Default)]
pub struct MemoryWebhookStore {
    webhooks: RwLock<Vec<WebhookSubscription>>,
}

impl MemoryWebhookStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, webhook: WebhookSubscription) {
        self.webhooks.write().await.push(webhook);
    }

    pub async fn get(&self, webhook_id: &str) -> Option<WebhookSubscription> {
        self.webhooks.read().await.iter().find(|w| w.id == webhook_id).cloned()
    }
}

#[async_trait]
impl WebhookStore for MemoryWebhookStore {
    async fn webhooks_for_organization(&self, organization_id: &str) -> Result<Vec<WebhookSubscription>> {
        let webhooks = self.webhooks.read().await;
        Ok(webhooks.iter().filter(|w| w.organization_id == organization_id).cloned().collect())
    }

    async fn mark_triggered(&self, webhook_id: &str, at: DateTime<Utc>) -> Result<()> {
        let mut webhooks = self.webhooks.write().await;
        let webhook = webhooks
            .iter_mut()
            .find(|w| w.id == webhook_id)
            .ok_or_else(|| anyhow!("Webhook {} not found", webhook_id))?;
        webhook.last_triggered_at = Some(at);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_type_names() {
        assert_eq!(
            serde_json::to_string(&WebhookEventType::IncidentCreated).unwrap(),
            "\"incident.created\""
        );
        assert_eq!(WebhookEventType::SiteRecovered.to_string(), "site.recovered");
    }

    #[test]
    fn test_wants_requires_active_and_subscribed() {
        let webhook = WebhookSubscription::new("org", "https://hooks.example.com", [WebhookEventType::SiteDown]);

        assert!(webhook.wants(WebhookEventType::SiteDown));
        assert!(!webhook.wants(WebhookEventType::SiteRecovered));
        assert!(!webhook.inactive().wants(WebhookEventType::SiteDown));
    }

    #[tokio::test]
    async fn test_memory_store_filters_by_organization() {
        let store = MemoryWebhookStore::new();
        store.insert(WebhookSubscription::new("org-a", "https://a.example.com", [])).await;
        store.insert(WebhookSubscription::new("org-b", "https://b.example.com", [])).await;

        let webhooks = store.webhooks_for_organization("org-a").await.unwrap();
        assert_eq!(webhooks.len(), 1);
        assert_eq!(webhooks[0].url, "https://a.example.com");
    }

    #[tokio::test]
    async fn test_mark_triggered() {
        let store = MemoryWebhookStore::new();
        let webhook = WebhookSubscription::new("org", "https://a.example.com", []);
        let id = webhook.id.clone();
        store.insert(webhook).await;

        let now = Utc::now();
        store.mark_triggered(&id, now).await.unwrap();

        assert_eq!(store.get(&id).await.unwrap().last_triggered_at, Some(now));
        assert!(store.mark_triggered("missing", now).await.is_err());
    }
}
