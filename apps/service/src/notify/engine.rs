use futures::future::join_all;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::channels::ChannelDispatcher;
use super::plans::PlanLimitsProvider;
use super::types::{Channel, DispatchSummary, EventKind, NotificationEvent, PlanLimits, Recipient};

/// Whether `recipient` wants to hear about `event` at all.
///
/// Gates, in order: the event-type switch, degradation opt-in, the
/// admins-only setting, and site subscriptions.
pub fn should_notify(recipient: &Recipient, event: &NotificationEvent) -> bool {
    let wants_kind = match event.kind {
        EventKind::Incident => recipient.notify_on_incident,
        EventKind::Resolution => recipient.notify_on_resolution,
    };
    if !wants_kind {
        return false;
    }

    if event.kind == EventKind::Incident
        && event.incident.severity.is_degradation()
        && !recipient.notify_on_degradation
    {
        return false;
    }

    if recipient.notify_only_admins && !recipient.role.is_admin() {
        return false;
    }

    recipient.is_subscribed_to(&event.site.id)
}

/// Fans incident and resolution events out to recipients over every channel
/// they are entitled to
pub struct NotificationEngine {
    dispatchers: Vec<Arc<dyn ChannelDispatcher>>,
    plans: Arc<dyn PlanLimitsProvider>,
}

impl NotificationEngine {
    pub fn new(plans: Arc<dyn PlanLimitsProvider>) -> Self {
        Self { dispatchers: Vec::new(), plans }
    }

    /// Register a channel. Later registrations for the same channel replace
    /// earlier ones.
    pub fn with_dispatcher(mut self, dispatcher: Arc<dyn ChannelDispatcher>) -> Self {
        let channel = dispatcher.channel();
        self.dispatchers.retain(|d| d.channel() != channel);
        self.dispatchers.push(dispatcher);
        self
    }

    pub fn channels(&self) -> Vec<Channel> {
        self.dispatchers.iter().map(|d| d.channel()).collect()
    }

    /// Dispatch using the organization's plan. A plan lookup failure falls
    /// back to the free tier.
    pub async fn dispatch(&self, event: &NotificationEvent, recipients: &[Recipient]) -> DispatchSummary {
        let organization_id = &event.site.organization_id;
        let plan = match self.plans.plan_limits(organization_id).await {
            Ok(plan) => plan,
            Err(e) => {
                warn!("Failed to load plan for organization {}, using free tier: {:#}", organization_id, e);
                PlanLimits::default()
            }
        };

        self.dispatch_with_plan(event, recipients, &plan).await
    }

    /// Dispatch `event` to `recipients` under `plan`. Channel failures are
    /// logged and not counted.
    pub async fn dispatch_with_plan(
        &self,
        event: &NotificationEvent,
        recipients: &[Recipient],
        plan: &PlanLimits,
    ) -> DispatchSummary {
        let mut summary = DispatchSummary::new(recipients.len());

        let eligible: Vec<&Recipient> = recipients.iter().filter(|r| should_notify(r, event)).collect();
        debug!(
            "Incident {}: {} of {} recipients pass preference gates",
            event.incident.id,
            eligible.len(),
            recipients.len()
        );

        let deliveries = join_all(eligible.into_iter().map(|r| self.notify_recipient(r, event, plan))).await;

        for delivered in deliveries {
            if delivered.is_empty() {
                continue;
            }
            summary.sent += 1;
            for channel in delivered {
                *summary.channels.entry(channel).or_insert(0) += 1;
            }
        }

        info!(
            "Notified {}/{} recipients for {:?} on incident {}",
            summary.sent, summary.total, event.kind, event.incident.id
        );

        summary
    }

    /// Channels that delivered successfully for one recipient
    async fn notify_recipient(
        &self,
        recipient: &Recipient,
        event: &NotificationEvent,
        plan: &PlanLimits,
    ) -> Vec<Channel> {
        let attempts = self
            .dispatchers
            .iter()
            .filter(|d| d.can_send(recipient, plan))
            .map(|d| async move { (d.channel(), d.send(recipient, event).await) });

        join_all(attempts)
            .await
            .into_iter()
            .filter_map(|(channel, outcome)| match outcome {
                Ok(()) => Some(channel),
                Err(e) => {
                    warn!("Failed to send {} notification to {}: {}", channel, recipient.email, e);
                    None
                }
            })
            .collect()
    }
}
