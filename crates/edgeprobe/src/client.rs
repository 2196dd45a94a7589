//! HTTP client for the edge-check proxy.

use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use tracing::debug;
use url::Url;

use crate::protocol::{ProbeRequest, ProbeResponse};
use crate::validation::validate_probe_request;
use crate::{PROTOCOL_HEADER, PROTOCOL_VERSION};

/// Sends probe requests to a remote edge executor over HTTP
#[derive(Debug, Clone)]
pub struct EdgeClient {
    client: reqwest::Client,
    endpoint: Url,
    token: Option<String>,
}

impl EdgeClient {
    /// Create a client for the edge proxy at `endpoint`.
    ///
    /// `timeout` bounds the whole round trip to the proxy, not the probe the
    /// proxy performs.
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self> {
        let endpoint = Url::parse(endpoint).context("Invalid edge executor URL")?;
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("edgeprobe/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client, endpoint, token: None })
    }

    /// Authenticate against the proxy with a bearer token
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Ask the edge to perform `request` and return what it observed
    pub async fn probe(&self, request: &ProbeRequest) -> Result<ProbeResponse> {
        validate_probe_request(request)?;

        debug!("Sending edge probe for {} ({})", request.target_url, request.region);

        let mut http_request = self
            .client
            .post(self.endpoint.clone())
            .header(PROTOCOL_HEADER, PROTOCOL_VERSION)
            .json(request);
        if let Some(token) = &self.token {
            http_request = http_request.bearer_auth(token);
        }

        let response = http_request
            .send()
            .await
            .map_err(|e| anyhow!("Edge executor request failed: {}", e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("Edge executor returned status {}", status.as_u16()));
        }

        let probe = response
            .json::<ProbeResponse>()
            .await
            .context("Edge executor returned an unreadable response")?;

        Ok(probe)
    }
}
