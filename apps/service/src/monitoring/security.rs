use reqwest::header::{HeaderMap, USER_AGENT};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::error::EngineError;

const HSTS_WEIGHT: i32 = 25;
const HSTS_MAX_AGE_BONUS: i32 = 5;
const HSTS_SUBDOMAINS_BONUS: i32 = 5;
const CSP_WEIGHT: i32 = 25;
const CSP_UNSAFE_PENALTY: i32 = 10;
const X_FRAME_OPTIONS_WEIGHT: i32 = 15;
const X_CONTENT_TYPE_WEIGHT: i32 = 15;
const X_XSS_PROTECTION_WEIGHT: i32 = 10;
const REFERRER_POLICY_WEIGHT: i32 = 5;
const PERMISSIONS_POLICY_WEIGHT: i32 = 5;

/// One year in seconds, the minimum HSTS max-age that earns the bonus
const ONE_YEAR_SECONDS: u64 = 31_536_000;

const STRONG_REFERRER_POLICIES: [&str; 4] = [
    "no-referrer",
    "same-origin",
    "strict-origin",
    "strict-origin-when-cross-origin",
];

const CSP_HASH_SOURCES: [&str; 4] = ["'nonce-", "'sha256-", "'sha384-", "'sha512-"];

/// Letter grade for a security score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Grade {
    #[serde(rename = "A+")]
    APlus,
    A,
    B,
    C,
    D,
    F,
}

/// Ordered `(min, max) -> grade` table, first match wins
const GRADE_BANDS: [(i32, i32, Grade); 6] = [
    (95, 100, Grade::APlus),
    (85, 94, Grade::A),
    (70, 84, Grade::B),
    (55, 69, Grade::C),
    (40, 54, Grade::D),
    (0, 39, Grade::F),
];

impl Grade {
    pub fn from_score(score: u8) -> Self {
        let score = i32::from(score);
        GRADE_BANDS
            .iter()
            .find(|(min, max, _)| (*min..=*max).contains(&score))
            .map(|(_, _, grade)| *grade)
            .unwrap_or(Grade::F)
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Grade::APlus => "A+",
            Grade::A => "A",
            Grade::B => "B",
            Grade::C => "C",
            Grade::D => "D",
            Grade::F => "F",
        };
        write!(f, "{label}")
    }
}

/// Outcome of a security header analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityCheckResult {
    #[serde(rename = "hasHSTS")]
    pub has_hsts: bool,
    pub hsts_max_age: Option<u64>,
    pub hsts_includes_subdomains: bool,
    #[serde(rename = "hasCSP")]
    pub has_csp: bool,
    pub csp_policy: Option<String>,
    pub has_x_frame_options: bool,
    pub x_frame_options: Option<String>,
    pub has_x_content_type: bool,
    #[serde(rename = "hasXXSSProtection")]
    pub has_x_xss_protection: bool,
    pub has_referrer_policy: bool,
    pub referrer_policy: Option<String>,
    pub has_permissions_policy: bool,
    pub security_score: u8,
    pub grade: Grade,
    pub issues: Vec<String>,
    pub recommendations: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl SecurityCheckResult {
    fn empty() -> Self {
        Self {
            has_hsts: false,
            hsts_max_age: None,
            hsts_includes_subdomains: false,
            has_csp: false,
            csp_policy: None,
            has_x_frame_options: false,
            x_frame_options: None,
            has_x_content_type: false,
            has_x_xss_protection: false,
            has_referrer_policy: false,
            referrer_policy: None,
            has_permissions_policy: false,
            security_score: 0,
            grade: Grade::F,
            issues: Vec::new(),
            recommendations: Vec::new(),
            error_message: None,
        }
    }

    /// The target could not be reached at all
    pub fn unreachable(error: impl Into<String>) -> Self {
        let mut result = Self::empty();
        result.error_message = Some(error.into());
        result
            .recommendations
            .push("Unable to connect to the site. Verify the URL is reachable and try again.".to_string());
        result
    }
}

/// Fetches response headers with HEAD and grades them
#[derive(Debug, Clone)]
pub struct SecurityAnalyzer {
    client: reqwest::Client,
    user_agent: String,
    timeout: Duration,
}

impl SecurityAnalyzer {
    pub fn new(user_agent: impl Into<String>, timeout: Duration) -> Result<Self, EngineError> {
        Ok(Self {
            client: reqwest::Client::builder().build()?,
            user_agent: user_agent.into(),
            timeout,
        })
    }

    /// Analyze the security headers served by `url`. Never fails.
    pub async fn analyze(&self, url: &str) -> SecurityCheckResult {
        let request = self.client.head(url).header(USER_AGENT, &self.user_agent).send();

        match timeout(self.timeout, request).await {
            Ok(Ok(response)) => {
                debug!("Security headers for {}: status {}", url, response.status());
                analyze_headers(response.headers())
            }
            Ok(Err(e)) => {
                warn!("Security check for {} failed: {}", url, e);
                SecurityCheckResult::unreachable(format!("Connection failed: {e}"))
            }
            Err(_) => {
                warn!("Security check for {} timed out", url);
                SecurityCheckResult::unreachable(format!(
                    "Request timed out after {} ms",
                    self.timeout.as_millis()
                ))
            }
        }
    }
}

fn header(headers: &HeaderMap, name: &str) -> Option<String> {
    headers.get(name).and_then(|value| value.to_str().ok()).map(|value| value.trim().to_string())
}

/// Score a set of response headers against the weighted rubric
pub fn analyze_headers(headers: &HeaderMap) -> SecurityCheckResult {
    let mut result = SecurityCheckResult::empty();
    let mut score = 0;

    // Strict-Transport-Security
    match header(headers, "strict-transport-security") {
        Some(value) => {
            result.has_hsts = true;
            score += HSTS_WEIGHT;

            let directives: Vec<String> =
                value.split(';').map(|d| d.trim().to_ascii_lowercase()).collect();
            result.hsts_max_age = directives
                .iter()
                .find_map(|d| d.strip_prefix("max-age="))
                .and_then(|age| age.trim_matches('"').parse().ok());
            result.hsts_includes_subdomains = directives.iter().any(|d| d == "includesubdomains");

            if result.hsts_max_age.is_some_and(|age| age >= ONE_YEAR_SECONDS) {
                score += HSTS_MAX_AGE_BONUS;
            } else {
                result.issues.push("HSTS max-age is shorter than one year".to_string());
                result
                    .recommendations
                    .push("Set HSTS max-age to at least 31536000 seconds (one year)".to_string());
            }
            if result.hsts_includes_subdomains {
                score += HSTS_SUBDOMAINS_BONUS;
            }
        }
        None => {
            result.issues.push("Missing Strict-Transport-Security header".to_string());
            result.recommendations.push(
                "Add Strict-Transport-Security: max-age=31536000; includeSubDomains".to_string(),
            );
        }
    }

    // Content-Security-Policy
    match header(headers, "content-security-policy") {
        Some(policy) => {
            result.has_csp = true;
            score += CSP_WEIGHT;

            if policy.contains("'unsafe-inline'") || policy.contains("'unsafe-eval'") {
                score -= CSP_UNSAFE_PENALTY;
                result.issues.push("CSP allows 'unsafe-inline' or 'unsafe-eval'".to_string());
                result
                    .recommendations
                    .push("Remove 'unsafe-inline' and 'unsafe-eval' from the CSP".to_string());
            }

            let has_wildcard = policy.split([' ', ';']).any(|token| token == "*");
            let has_hash_source = CSP_HASH_SOURCES.iter().any(|source| policy.contains(source));
            if has_wildcard && !has_hash_source {
                result.issues.push("CSP uses a wildcard (*) source".to_string());
            }

            result.csp_policy = Some(policy);
        }
        None => {
            result.issues.push("Missing Content-Security-Policy header".to_string());
            result.recommendations.push(
                "Add a Content-Security-Policy header to restrict resource loading".to_string(),
            );
        }
    }

    // X-Frame-Options
    match header(headers, "x-frame-options") {
        Some(value) => {
            let upper = value.to_ascii_uppercase();
            if upper == "DENY" || upper == "SAMEORIGIN" {
                result.has_x_frame_options = true;
                score += X_FRAME_OPTIONS_WEIGHT;
            } else {
                result.issues.push(format!("Invalid X-Frame-Options value: {value}"));
                result
                    .recommendations
                    .push("Set X-Frame-Options to DENY or SAMEORIGIN".to_string());
            }
            result.x_frame_options = Some(value);
        }
        None => {
            result.issues.push("Missing X-Frame-Options header".to_string());
            result
                .recommendations
                .push("Add X-Frame-Options: DENY to prevent clickjacking".to_string());
        }
    }

    // X-Content-Type-Options
    match header(headers, "x-content-type-options") {
        Some(value) if value.to_ascii_lowercase().contains("nosniff") => {
            result.has_x_content_type = true;
            score += X_CONTENT_TYPE_WEIGHT;
        }
        _ => {
            result.issues.push("Missing or invalid X-Content-Type-Options header".to_string());
            result.recommendations.push("Add X-Content-Type-Options: nosniff".to_string());
        }
    }

    // X-XSS-Protection
    match header(headers, "x-xss-protection") {
        Some(value) if value.contains('1') => {
            result.has_x_xss_protection = true;
            score += X_XSS_PROTECTION_WEIGHT;
        }
        _ => {
            result.issues.push("Missing or disabled X-XSS-Protection header".to_string());
            result.recommendations.push("Add X-XSS-Protection: 1; mode=block".to_string());
        }
    }

    // Referrer-Policy
    match header(headers, "referrer-policy") {
        Some(policy) => {
            result.has_referrer_policy = true;
            score += REFERRER_POLICY_WEIGHT;

            let lowered = policy.to_ascii_lowercase();
            if !STRONG_REFERRER_POLICIES.contains(&lowered.as_str()) {
                result.issues.push(format!("Weak Referrer-Policy: {policy}"));
                result.recommendations.push(
                    "Use Referrer-Policy: strict-origin-when-cross-origin or stricter".to_string(),
                );
            }
            result.referrer_policy = Some(policy);
        }
        None => {
            result.issues.push("Missing Referrer-Policy header".to_string());
            result
                .recommendations
                .push("Add Referrer-Policy: strict-origin-when-cross-origin".to_string());
        }
    }

    // Permissions-Policy, or its legacy Feature-Policy name
    if header(headers, "permissions-policy").is_some() || header(headers, "feature-policy").is_some() {
        result.has_permissions_policy = true;
        score += PERMISSIONS_POLICY_WEIGHT;
    } else {
        result.recommendations.push(
            "Add a Permissions-Policy header to restrict browser features".to_string(),
        );
    }

    result.security_score = score.clamp(0, 100) as u8;
    result.grade = Grade::from_score(result.security_score);
    result
}
