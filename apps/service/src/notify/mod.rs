//! Notification fan-out: preference gates, plan gating and per-channel
//! delivery with failure isolation.

pub mod channels;
pub mod engine;
pub mod error;
pub mod plans;
pub mod types;

pub use channels::{
    ChannelDispatcher, EmailChannel, EmailSender, EmailTemplate, HttpEmailSender, SlackChannel, SmsChannel,
    SmsProvider, WebhookChannel,
};
pub use engine::{NotificationEngine, should_notify};
pub use error::NotifyError;
pub use plans::{CachedPlanLimits, DEFAULT_PLAN_CACHE_TTL, PlanLimitsProvider, StaticPlanLimits};
pub use types::{
    Channel, DispatchSummary, EventKind, Incident, NotificationEvent, PlanLimits, Recipient, Role, Severity, Site,
};
