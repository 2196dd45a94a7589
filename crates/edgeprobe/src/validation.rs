//! Request validation for edge probes.
//!
//! A request that fails here is a caller bug, so it is rejected before
//! anything is sent to the edge.

use thiserror::Error;
use url::Url;

use crate::protocol::ProbeRequest;

pub const MIN_TIMEOUT_MS: u64 = 100;
pub const MAX_TIMEOUT_MS: u64 = 300_000;
pub const MAX_HEADERS: usize = 20;
pub const MAX_HEADER_BYTES: usize = 8192;
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

const METHODS: [&str; 7] = ["GET", "POST", "PUT", "DELETE", "HEAD", "OPTIONS", "PATCH"];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidProbe {
    #[error("Invalid target URL: {0}")]
    Url(String),

    #[error("Unsupported URL scheme: {0}")]
    Scheme(String),

    #[error("Unsupported HTTP method: {0}")]
    Method(String),

    #[error("Timeout out of range: {0} ms (allowed 100..=300000 ms)")]
    Timeout(u64),

    #[error("Too many headers: {0} (max: 20)")]
    TooManyHeaders(usize),

    #[error("Header {name} too large: {size} bytes (max: 8192 bytes)")]
    HeaderTooLarge { name: String, size: usize },

    #[error("Body too large: {0} bytes (max: 1048576 bytes)")]
    BodyTooLarge(usize),
}

/// Validate a probe request
pub fn validate_probe_request(request: &ProbeRequest) -> Result<(), InvalidProbe> {
    let url =
        Url::parse(&request.target_url).map_err(|e| InvalidProbe::Url(e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(InvalidProbe::Scheme(url.scheme().to_string()));
    }
    if url.host_str().is_none() {
        return Err(InvalidProbe::Url("URL must have a valid host".to_string()));
    }

    if !METHODS.contains(&request.method.to_ascii_uppercase().as_str()) {
        return Err(InvalidProbe::Method(request.method.clone()));
    }

    if !(MIN_TIMEOUT_MS..=MAX_TIMEOUT_MS).contains(&request.timeout) {
        return Err(InvalidProbe::Timeout(request.timeout));
    }

    let headers = request.headers.as_deref().unwrap_or_default();
    if headers.len() > MAX_HEADERS {
        return Err(InvalidProbe::TooManyHeaders(headers.len()));
    }
    if let Some((name, value)) = headers
        .iter()
        .find(|(n, v)| n.len() + v.len() > MAX_HEADER_BYTES)
    {
        return Err(InvalidProbe::HeaderTooLarge {
            name: name.clone(),
            size: name.len() + value.len(),
        });
    }

    let body_len = request.body.as_ref().map_or(0, String::len);
    if body_len > MAX_BODY_BYTES {
        return Err(InvalidProbe::BodyTooLarge(body_len));
    }

    Ok(())
}
