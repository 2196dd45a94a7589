use super::types::Channel;

/// Errors raised while delivering a notification through one channel.
///
/// The engine logs these and moves on; they never abort a dispatch.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    /// An HTTP request to an external notification endpoint failed.
    #[error("Notify: HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The external endpoint returned a non-success response.
    #[error("Notify: {service} returned status {status}")]
    Api { service: String, status: u16 },

    /// The recipient has no credential configured for the channel.
    #[error("Notify: no {0} credential configured")]
    MissingCredential(Channel),

    /// The channel is gated but has no delivery implementation wired in.
    #[error("Notify: no delivery provider wired for {0}")]
    NoProvider(Channel),

    /// A delivery provider (email, SMS) reported a failure.
    #[error("Notify: {channel} provider failed: {reason}")]
    Provider { channel: Channel, reason: String },

    /// Building the notification payload failed.
    #[error("Notify: JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl NotifyError {
    pub(crate) fn provider(channel: Channel, error: anyhow::Error) -> Self {
        NotifyError::Provider { channel, reason: format!("{error:#}") }
    }
}

/// Convenience `Result` alias for notification operations.
pub type Result<T> = std::result::Result<T, NotifyError>;
