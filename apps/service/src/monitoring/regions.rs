use async_trait::async_trait;
use chrono::Utc;
use edgeprobe::{EdgeClient, ProbeRequest, ProbeResponse, Region};
use reqwest::header::USER_AGENT;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::{sleep, timeout};
use tracing::{debug, error, warn};

use super::checker::{collect_headers, elapsed_ms};
use super::types::{CheckResult, MonitorStatus};
use crate::error::EngineError;

/// Remote executor that can run a probe from one of its points of presence
#[async_trait]
pub trait EdgeExecutor: Send + Sync {
    async fn probe(&self, request: &ProbeRequest) -> anyhow::Result<ProbeResponse>;
}

#[async_trait]
impl EdgeExecutor for EdgeClient {
    async fn probe(&self, request: &ProbeRequest) -> anyhow::Result<ProbeResponse> {
        EdgeClient::probe(self, request).await
    }
}

/// Where the sub-timings of a region result came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimingSource {
    /// Reported by the edge executor
    Edge,
    /// Estimated locally: DNS from a fixed per-region delay, connect and TLS
    /// as fixed shares of the total. Not measured network phases.
    Approximated,
    /// The check never ran, every sub-timing is empty
    Unmeasured,
}

/// One check of one site from one region
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionResult {
    #[serde(flatten)]
    pub check: CheckResult,

    /// The region the caller asked for
    pub region: Region,

    pub status: MonitorStatus,

    pub resolved_ip: Option<String>,
    pub dns_lookup_time_ms: Option<u64>,
    pub connect_time_ms: Option<u64>,
    pub tls_handshake_time_ms: Option<u64>,

    pub timing_source: TimingSource,

    /// Point of presence that served an edge probe
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edge_colo: Option<String>,

    /// Region the edge point of presence belongs to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edge_region: Option<Region>,
}

impl RegionResult {
    /// A region whose check could not run at all
    pub fn failed(region: Region, error: impl Into<String>) -> Self {
        Self {
            check: CheckResult::failure(0, error),
            region,
            status: MonitorStatus::Offline,
            resolved_ip: None,
            dns_lookup_time_ms: None,
            connect_time_ms: None,
            tls_handshake_time_ms: None,
            timing_source: TimingSource::Unmeasured,
            edge_colo: None,
            edge_region: None,
        }
    }

    pub fn success(&self) -> bool {
        self.check.success
    }

    pub fn response_time_ms(&self) -> u64 {
        self.check.response_time_ms
    }
}

/// Simulated DNS lookup delay for the local fallback path
pub fn simulated_dns_delay(region: Region) -> Duration {
    let ms = match region {
        Region::UsEast => 10,
        Region::UsWest => 15,
        Region::EuWest | Region::EuCentral => 20,
        Region::ApNortheast => 30,
        Region::ApSoutheast => 35,
        Region::SaEast => 40,
    };
    Duration::from_millis(ms)
}

/// Connect time estimated as 20% of total elapsed
fn approximate_connect_ms(total_ms: u64) -> u64 {
    total_ms / 5
}

/// TLS handshake estimated as 15% of total elapsed
fn approximate_tls_ms(total_ms: u64) -> u64 {
    total_ms * 15 / 100
}

/// Classify a regional check: 5xx is offline, 4xx or slow is degraded
pub fn classify_region(result: &CheckResult, degraded_threshold_ms: u64) -> MonitorStatus {
    match result.status_code {
        _ if !result.success => MonitorStatus::Offline,
        Some(code) if code >= 500 => MonitorStatus::Offline,
        Some(code) if code >= 400 => MonitorStatus::Degraded,
        _ if result.response_time_ms > degraded_threshold_ms => MonitorStatus::Degraded,
        _ => MonitorStatus::Online,
    }
}

/// Parse region labels, rejecting unknown ones
pub fn parse_regions<S: AsRef<str>>(labels: &[S]) -> Result<Vec<Region>, EngineError> {
    labels
        .iter()
        .map(|label| label.as_ref().parse::<Region>().map_err(EngineError::from))
        .collect()
}

/// Runs checks from several regions, through the edge executor when one is
/// configured and locally otherwise
#[derive(Clone)]
pub struct RegionalDispatcher {
    client: reqwest::Client,
    edge: Option<Arc<dyn EdgeExecutor>>,
    user_agent: String,
    timeout: Duration,
    degraded_threshold_ms: u64,
}

impl RegionalDispatcher {
    pub fn new(
        user_agent: impl Into<String>,
        timeout: Duration,
        degraded_threshold_ms: u64,
    ) -> Result<Self, EngineError> {
        if timeout.is_zero() {
            return Err(EngineError::InvalidTimeout);
        }

        Ok(Self {
            client: reqwest::Client::builder().build()?,
            edge: None,
            user_agent: user_agent.into(),
            timeout,
            degraded_threshold_ms,
        })
    }

    /// Use `client` for local fallback checks
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    /// Delegate checks to a remote edge executor
    pub fn with_edge(mut self, edge: Arc<dyn EdgeExecutor>) -> Self {
        self.edge = Some(edge);
        self
    }

    pub fn has_edge(&self) -> bool {
        self.edge.is_some()
    }

    /// Check `url` from `region`. Never fails.
    pub async fn check_region(&self, url: &str, region: Region) -> RegionResult {
        if let Some(edge) = &self.edge {
            let request = ProbeRequest::head(url, region, self.timeout.as_millis() as u64);
            match edge.probe(&request).await {
                Ok(response) => return self.from_edge(region, response),
                Err(e) => {
                    warn!("Edge executor unavailable for {} ({}), checking locally: {:#}", url, region, e);
                }
            }
        }

        self.check_locally(url, region).await
    }

    /// Check `url` from every region concurrently.
    ///
    /// Results come back in the order of `regions`; a region whose task dies
    /// is reported as offline without touching the others.
    pub async fn check_all_regions(&self, url: &str, regions: &[Region]) -> Vec<RegionResult> {
        let handles: Vec<_> = regions
            .iter()
            .map(|&region| {
                let dispatcher = self.clone();
                let url = url.to_string();
                tokio::spawn(async move { dispatcher.check_region(&url, region).await })
            })
            .collect();

        let mut results = Vec::with_capacity(handles.len());
        for (handle, &region) in handles.into_iter().zip(regions) {
            match handle.await {
                Ok(result) => results.push(result),
                Err(e) => {
                    error!("Region check task for {} failed: {}", region, e);
                    results.push(RegionResult::failed(region, format!("Region check failed: {e}")));
                }
            }
        }
        results
    }

    fn from_edge(&self, region: Region, response: ProbeResponse) -> RegionResult {
        let success = response.reached_target();
        let edge_region = response.served_from();

        debug!(
            "Edge probe for {} served by {:?} ({:?})",
            region, response.colo, edge_region
        );

        let response_headers: BTreeMap<String, String> = response
            .headers
            .unwrap_or_default()
            .into_iter()
            .map(|(name, value)| (name.to_ascii_lowercase(), value))
            .collect();

        let error_message = match (&response.error, success) {
            (Some(error), _) => Some(error.clone()),
            (None, false) => Some("Edge executor returned no status".to_string()),
            (None, true) => None,
        };

        let check = CheckResult {
            success,
            response_time_ms: response.duration,
            status_code: response.status,
            response_body: None,
            response_headers,
            validation_passed: success && response.status.is_some_and(|code| code < 400),
            validation_errors: Vec::new(),
            error_message,
            checked_at: Utc::now(),
        };

        RegionResult {
            status: classify_region(&check, self.degraded_threshold_ms),
            check,
            region,
            resolved_ip: response.resolved_ip,
            dns_lookup_time_ms: response.dns_lookup_time,
            connect_time_ms: response.connect_time,
            tls_handshake_time_ms: response.tls_handshake_time,
            timing_source: TimingSource::Edge,
            edge_colo: response.colo,
            edge_region,
        }
    }

    async fn check_locally(&self, url: &str, region: Region) -> RegionResult {
        let is_https = url.starts_with("https://");
        let dns_delay = simulated_dns_delay(region);
        let start = Instant::now();

        sleep(dns_delay).await;

        let request = self.client.head(url).header(USER_AGENT, &self.user_agent).send();
        let outcome = timeout(self.timeout, request).await;
        let total_ms = elapsed_ms(start);

        let mut result = RegionResult::failed(region, "");
        result.timing_source = TimingSource::Approximated;
        result.check.response_time_ms = total_ms;
        result.dns_lookup_time_ms = Some(dns_delay.as_millis() as u64);

        let response = match outcome {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                result.check.error_message = Some(format!("Connection failed: {e}"));
                return result;
            }
            Err(_) => {
                result.check.error_message =
                    Some(format!("Request timed out after {} ms", self.timeout.as_millis()));
                return result;
            }
        };

        let status_code = response.status().as_u16();
        result.check.success = true;
        result.check.status_code = Some(status_code);
        result.check.response_headers = collect_headers(response.headers());
        result.check.validation_passed = status_code < 400;
        result.check.error_message = None;
        result.resolved_ip = response.remote_addr().map(|addr| addr.ip().to_string());
        result.connect_time_ms = Some(approximate_connect_ms(total_ms));
        result.tls_handshake_time_ms = is_https.then(|| approximate_tls_ms(total_ms));
        result.status = classify_region(&result.check, self.degraded_threshold_ms);

        debug!("Local check of {} for {}: {} in {} ms", url, region, status_code, total_ms);

        result
    }
}

/// Mean response time over successful results
pub fn average_response_time(results: &[RegionResult]) -> Option<u64> {
    let times: Vec<u64> = results.iter().filter(|r| r.success()).map(|r| r.response_time_ms()).collect();
    if times.is_empty() {
        return None;
    }
    Some(times.iter().sum::<u64>() / times.len() as u64)
}

fn online(results: &[RegionResult]) -> impl Iterator<Item = &RegionResult> {
    results.iter().filter(|r| r.success() && r.status == MonitorStatus::Online)
}

/// Fastest region among online results
pub fn fastest_region(results: &[RegionResult]) -> Option<&RegionResult> {
    online(results).min_by_key(|r| r.response_time_ms())
}

/// Slowest region among online results
pub fn slowest_region(results: &[RegionResult]) -> Option<&RegionResult> {
    online(results).max_by_key(|r| r.response_time_ms())
}

/// Headline numbers for a multi-region check
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionSummary {
    pub average_response_time_ms: Option<u64>,
    pub fastest_region: Option<Region>,
    pub slowest_region: Option<Region>,
}

impl RegionSummary {
    pub fn from_results(results: &[RegionResult]) -> Self {
        Self {
            average_response_time_ms: average_response_time(results),
            fastest_region: fastest_region(results).map(|r| r.region),
            slowest_region: slowest_region(results).map(|r| r.region),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(region: Region, success: bool, status: MonitorStatus, ms: u64) -> RegionResult {
        let mut result = RegionResult::failed(region, "unused");
        result.check.success = success;
        result.check.response_time_ms = ms;
        result.status = status;
        result
    }

    #[test]
    fn test_classify_region() {
        let mut check = CheckResult::failure(100, "refused");
        assert_eq!(classify_region(&check, 5_000), MonitorStatus::Offline);

        check.success = true;
        check.status_code = Some(503);
        assert_eq!(classify_region(&check, 5_000), MonitorStatus::Offline);

        check.status_code = Some(404);
        assert_eq!(classify_region(&check, 5_000), MonitorStatus::Degraded);

        check.status_code = Some(200);
        assert_eq!(classify_region(&check, 5_000), MonitorStatus::Online);

        check.response_time_ms = 6_000;
        assert_eq!(classify_region(&check, 5_000), MonitorStatus::Degraded);
    }

    #[test]
    fn test_approximations() {
        assert_eq!(approximate_connect_ms(200), 40);
        assert_eq!(approximate_tls_ms(200), 30);
        assert_eq!(simulated_dns_delay(Region::SaEast), Duration::from_millis(40));
    }

    #[test]
    fn test_parse_regions() {
        assert_eq!(
            parse_regions(&["us-east", "EU_WEST"]).unwrap(),
            vec![Region::UsEast, Region::EuWest]
        );
        assert!(matches!(
            parse_regions(&["us-east", "mars-north"]),
            Err(EngineError::UnknownRegion(_))
        ));
    }

    #[test]
    fn test_average_counts_degraded_successes() {
        let results = vec![
            result(Region::UsEast, true, MonitorStatus::Online, 100),
            result(Region::EuWest, true, MonitorStatus::Degraded, 300),
            result(Region::SaEast, false, MonitorStatus::Offline, 30_000),
        ];

        assert_eq!(average_response_time(&results), Some(200));
    }

    #[test]
    fn test_fastest_and_slowest_skip_degraded() {
        let results = vec![
            result(Region::UsEast, true, MonitorStatus::Online, 120),
            result(Region::EuWest, true, MonitorStatus::Degraded, 20),
            result(Region::ApSoutheast, true, MonitorStatus::Online, 340),
            result(Region::SaEast, true, MonitorStatus::Degraded, 9_000),
        ];

        let summary = RegionSummary::from_results(&results);
        assert_eq!(summary.fastest_region, Some(Region::UsEast));
        assert_eq!(summary.slowest_region, Some(Region::ApSoutheast));
    }

    #[test]
    fn test_summary_of_nothing() {
        let summary = RegionSummary::from_results(&[]);
        assert_eq!(summary.average_response_time_ms, None);
        assert_eq!(summary.fastest_region, None);
    }

    #[test]
    fn test_edge_response_reports_requested_region() {
        let dispatcher = RegionalDispatcher::new("test", Duration::from_secs(5), 5_000).unwrap();
        let response = ProbeResponse {
            status: Some(200),
            duration: 87,
            colo: Some("FRA".to_string()),
            ..Default::default()
        };

        let result = dispatcher.from_edge(Region::ApNortheast, response);

        assert_eq!(result.region, Region::ApNortheast);
        assert_eq!(result.edge_region, Some(Region::EuCentral));
        assert_eq!(result.edge_colo.as_deref(), Some("FRA"));
        assert_eq!(result.timing_source, TimingSource::Edge);
        assert_eq!(result.status, MonitorStatus::Online);
        assert!(result.check.validation_passed);
    }

    #[test]
    fn test_edge_error_is_offline() {
        let dispatcher = RegionalDispatcher::new("test", Duration::from_secs(5), 5_000).unwrap();
        let response = ProbeResponse {
            duration: 15_000,
            error: Some("timeout".to_string()),
            ..Default::default()
        };

        let result = dispatcher.from_edge(Region::UsEast, response);

        assert!(!result.success());
        assert_eq!(result.status, MonitorStatus::Offline);
        assert_eq!(result.check.error_message.as_deref(), Some("timeout"));
    }
}
