use thiserror::Error;

/// Caller-side configuration errors.
///
/// These are raised synchronously at the call boundary. Runtime failures of
/// a check never surface here, they end up in the check result instead.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    UnknownRegion(#[from] edgeprobe::UnknownRegion),

    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Invalid header '{0}'")]
    InvalidHeader(String),

    #[error("Malformed JSON body: {0}")]
    InvalidBody(#[from] serde_json::Error),

    #[error("Timeout must be greater than zero")]
    InvalidTimeout,

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}
