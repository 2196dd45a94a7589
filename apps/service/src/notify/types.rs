use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::webhooks::WebhookEventType;

/// A notification channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Email,
    Slack,
    Sms,
    Webhook,
}

impl Channel {
    pub const ALL: [Channel; 4] = [Channel::Email, Channel::Slack, Channel::Sms, Channel::Webhook];

    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Email => "email",
            Channel::Slack => "slack",
            Channel::Sms => "sms",
            Channel::Webhook => "webhook",
        }
    }

    /// Channels that cannot fire without a recipient-supplied URL
    pub fn requires_credential(&self) -> bool {
        matches!(self, Channel::Slack | Channel::Webhook)
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Organization role of a recipient
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    #[default]
    User,
    OrgAdmin,
    SuperAdmin,
}

impl Role {
    pub fn is_admin(&self) -> bool {
        !matches!(self, Role::User)
    }
}

/// Per-user notification preferences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipient {
    pub email: String,
    #[serde(default)]
    pub role: Role,
    pub notify_on_incident: bool,
    pub notify_on_degradation: bool,
    pub notify_on_resolution: bool,
    #[serde(default)]
    pub notify_only_admins: bool,
    #[serde(default)]
    pub channel_enabled: BTreeMap<Channel, bool>,
    /// Slack webhook URL, custom webhook URL, phone number
    #[serde(default)]
    pub channel_config: BTreeMap<Channel, String>,
    /// Sites the recipient follows. Empty means every site.
    #[serde(default)]
    pub site_subscriptions: BTreeSet<String>,
}

impl Recipient {
    /// A recipient with every event enabled and email as the only channel
    pub fn new(email: impl Into<String>, role: Role) -> Self {
        Self {
            email: email.into(),
            role,
            notify_on_incident: true,
            notify_on_degradation: true,
            notify_on_resolution: true,
            notify_only_admins: false,
            channel_enabled: BTreeMap::from([(Channel::Email, true)]),
            channel_config: BTreeMap::new(),
            site_subscriptions: BTreeSet::new(),
        }
    }

    pub fn enable(mut self, channel: Channel, credential: Option<&str>) -> Self {
        self.channel_enabled.insert(channel, true);
        if let Some(credential) = credential {
            self.channel_config.insert(channel, credential.to_string());
        }
        self
    }

    pub fn disable(mut self, channel: Channel) -> Self {
        self.channel_enabled.insert(channel, false);
        self
    }

    pub fn subscribe(mut self, site_id: impl Into<String>) -> Self {
        self.site_subscriptions.insert(site_id.into());
        self
    }

    pub fn has_enabled(&self, channel: Channel) -> bool {
        self.channel_enabled.get(&channel).copied().unwrap_or(false)
    }

    /// Configured credential for `channel`, ignoring blank values
    pub fn credential(&self, channel: Channel) -> Option<&str> {
        self.channel_config
            .get(&channel)
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
    }

    pub fn is_subscribed_to(&self, site_id: &str) -> bool {
        self.site_subscriptions.is_empty() || self.site_subscriptions.contains(site_id)
    }
}

/// Channels an organization's plan entitles it to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanLimits {
    pub allowed_channels: BTreeSet<Channel>,
}

impl PlanLimits {
    pub fn new(channels: impl IntoIterator<Item = Channel>) -> Self {
        Self { allowed_channels: channels.into_iter().collect() }
    }

    pub fn allows(&self, channel: Channel) -> bool {
        self.allowed_channels.contains(&channel)
    }
}

impl Default for PlanLimits {
    /// Free tier: email only
    fn default() -> Self {
        Self::new([Channel::Email])
    }
}

/// Incident severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// The degraded-performance tier
    pub fn is_degradation(&self) -> bool {
        matches!(self, Severity::Medium)
    }

    /// The outage tier
    pub fn is_outage(&self) -> bool {
        matches!(self, Severity::High | Severity::Critical)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Severity::Low => "LOW",
            Severity::Medium => "MEDIUM",
            Severity::High => "HIGH",
            Severity::Critical => "CRITICAL",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Incident {
    pub id: String,
    pub title: String,
    pub severity: Severity,
    #[serde(default)]
    pub ai_summary: Option<String>,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub resolved_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Site {
    pub id: String,
    pub organization_id: String,
    pub name: String,
    pub url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Incident,
    Resolution,
}

impl EventKind {
    /// Webhook event type announced for this kind of notification
    pub fn webhook_event(&self) -> WebhookEventType {
        match self {
            EventKind::Incident => WebhookEventType::IncidentCreated,
            EventKind::Resolution => WebhookEventType::IncidentResolved,
        }
    }
}

/// An incident or resolution to tell recipients about
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationEvent {
    pub kind: EventKind,
    pub incident: Incident,
    pub site: Site,
}

impl NotificationEvent {
    pub fn incident(incident: Incident, site: Site) -> Self {
        Self { kind: EventKind::Incident, incident, site }
    }

    pub fn resolution(incident: Incident, site: Site) -> Self {
        Self { kind: EventKind::Resolution, incident, site }
    }

    /// One-line human summary
    pub fn headline(&self) -> String {
        match self.kind {
            EventKind::Incident => {
                format!("[{}] {} is having issues: {}", self.incident.severity, self.site.name, self.incident.title)
            }
            EventKind::Resolution => format!("{} has recovered: {}", self.site.name, self.incident.title),
        }
    }
}

/// Counts produced by one dispatch
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DispatchSummary {
    /// Recipients that got at least one delivery
    pub sent: usize,
    /// Recipients considered
    pub total: usize,
    /// Successful deliveries per channel
    pub channels: BTreeMap<Channel, usize>,
}

impl DispatchSummary {
    pub fn new(total: usize) -> Self {
        Self {
            sent: 0,
            total,
            channels: Channel::ALL.into_iter().map(|channel| (channel, 0)).collect(),
        }
    }

    pub fn delivered(&self, channel: Channel) -> usize {
        self.channels.get(&channel).copied().unwrap_or(0)
    }
}
