use serde::Serialize;

use super::checker::HttpChecker;
use super::types::{CheckResult, CheckTarget, MonitorStatus};
use crate::error::EngineError;

/// Response time above which a reachable target counts as degraded
pub const DEFAULT_DEGRADED_THRESHOLD_MS: u64 = 5_000;

/// A check result together with its monitoring classification
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckOutcome {
    #[serde(flatten)]
    pub result: CheckResult,
    pub status: MonitorStatus,
}

/// Classify a single check for monitoring purposes
pub fn classify_check(result: &CheckResult, degraded_threshold_ms: u64) -> MonitorStatus {
    if !result.success {
        MonitorStatus::Offline
    } else if !result.validation_passed || result.response_time_ms > degraded_threshold_ms {
        MonitorStatus::Degraded
    } else {
        MonitorStatus::Online
    }
}

/// Monitoring executor - runs checks and classifies their results
#[derive(Debug, Clone)]
pub struct MonitoringExecutor {
    checker: HttpChecker,
    degraded_threshold_ms: u64,
}

impl MonitoringExecutor {
    /// Create a new monitoring executor
    pub fn new(user_agent: impl Into<String>, degraded_threshold_ms: u64) -> Result<Self, EngineError> {
        Ok(Self {
            checker: HttpChecker::new(user_agent)?,
            degraded_threshold_ms,
        })
    }

    pub fn degraded_threshold_ms(&self) -> u64 {
        self.degraded_threshold_ms
    }

    /// Run the check and classify it.
    ///
    /// Only a target that can never be checked (bad URL, zero timeout) is
    /// rejected; everything that goes wrong on the network ends up in the
    /// returned result.
    pub async fn execute_check(&self, target: &CheckTarget) -> Result<CheckOutcome, EngineError> {
        target.validate()?;

        let result = self.checker.execute(target).await;
        let status = classify_check(&result, self.degraded_threshold_ms);

        Ok(CheckOutcome { result, status })
    }
}
