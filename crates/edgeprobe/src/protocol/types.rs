//! Protocol type definitions for edge probes.

use serde::{Deserialize, Serialize};

use crate::region::Region;

/// A probe request sent to the edge executor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbeRequest {
    /// The URL to probe
    pub target_url: String,

    /// The HTTP method to use (HEAD, GET, ...)
    pub method: String,

    /// Timeout in milliseconds
    pub timeout: u64,

    /// Optional request body
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,

    /// Optional request headers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<Vec<(String, String)>>,

    /// Region the caller wants to report on. The edge cannot be pinned to a
    /// point of presence, so this is informational only.
    pub region: Region,
}

impl ProbeRequest {
    /// Build a header-only probe for `target_url`
    pub fn head(target_url: impl Into<String>, region: Region, timeout: u64) -> Self {
        Self {
            target_url: target_url.into(),
            method: "HEAD".to_string(),
            timeout,
            body: None,
            headers: None,
            region,
        }
    }
}

/// A probe response from the edge executor
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbeResponse {
    /// HTTP status code
    #[serde(default)]
    pub status: Option<u16>,

    /// Duration of the request in milliseconds
    pub duration: u64,

    /// Error message if the probe failed
    #[serde(default)]
    pub error: Option<String>,

    /// Point of presence (colo code) that served the probe, e.g. `"FRA"`
    #[serde(default)]
    pub colo: Option<String>,

    /// Unix timestamp (seconds) when the probe was performed
    #[serde(default)]
    pub timestamp: u64,

    /// Address the target resolved to, when the edge reports it
    #[serde(default)]
    pub resolved_ip: Option<String>,

    #[serde(default)]
    pub dns_lookup_time: Option<u64>,

    #[serde(default)]
    pub connect_time: Option<u64>,

    #[serde(default)]
    pub tls_handshake_time: Option<u64>,

    /// Response headers (limited set)
    #[serde(default)]
    pub headers: Option<Vec<(String, String)>>,
}

impl ProbeResponse {
    /// Whether the edge reached the target at the protocol level
    pub fn reached_target(&self) -> bool {
        self.error.is_none() && self.status.is_some()
    }

    /// Region of the point of presence that actually served the probe
    pub fn served_from(&self) -> Option<Region> {
        self.colo.as_deref().and_then(Region::from_colo)
    }
}
