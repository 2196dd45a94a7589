use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::time::Duration;
use url::Url;

use super::validation::ValidationSpec;
use crate::error::EngineError;

/// Default request timeout for a check target
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// Status of a monitored site or of a single check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MonitorStatus {
    Online,
    Degraded,
    Offline,
}

impl fmt::Display for MonitorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MonitorStatus::Online => write!(f, "ONLINE"),
            MonitorStatus::Degraded => write!(f, "DEGRADED"),
            MonitorStatus::Offline => write!(f, "OFFLINE"),
        }
    }
}

/// HTTP method used by a check
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
}

impl HttpMethod {
    /// Only these methods carry a request body
    pub fn allows_body(&self) -> bool {
        matches!(self, HttpMethod::Post | HttpMethod::Put | HttpMethod::Patch)
    }
}

impl From<HttpMethod> for reqwest::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Patch => reqwest::Method::PATCH,
            HttpMethod::Delete => reqwest::Method::DELETE,
            HttpMethod::Head => reqwest::Method::HEAD,
            HttpMethod::Options => reqwest::Method::OPTIONS,
        }
    }
}

/// Authentication attached to a check request
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Auth {
    #[default]
    None,
    Bearer(String),
    ApiKey(String),
    Basic(String),
}

impl fmt::Debug for Auth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Auth::None => write!(f, "None"),
            Auth::Bearer(_) => write!(f, "Bearer(***)"),
            Auth::ApiKey(_) => write!(f, "ApiKey(***)"),
            Auth::Basic(_) => write!(f, "Basic(***)"),
        }
    }
}

fn default_expected_status() -> BTreeSet<u16> {
    BTreeSet::from([200])
}

fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

/// Everything needed to perform one HTTP/API check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckTarget {
    pub url: String,

    #[serde(default)]
    pub method: HttpMethod,

    #[serde(default)]
    pub headers: BTreeMap<String, String>,

    #[serde(default)]
    pub body: Option<String>,

    #[serde(default = "default_expected_status")]
    pub expected_status: BTreeSet<u16>,

    #[serde(default)]
    pub auth: Auth,

    #[serde(default)]
    pub validation: Option<ValidationSpec>,

    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl CheckTarget {
    /// A GET check expecting 200 with the default timeout
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: HttpMethod::Get,
            headers: BTreeMap::new(),
            body: None,
            expected_status: default_expected_status(),
            auth: Auth::None,
            validation: None,
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }

    pub fn method(mut self, method: HttpMethod) -> Self {
        self.method = method;
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Attach a JSON body, rejecting malformed JSON up front
    pub fn json_body(mut self, body: &str) -> Result<Self, EngineError> {
        serde_json::from_str::<Value>(body)?;
        self.body = Some(body.to_string());
        Ok(self)
    }

    /// Replace the accepted status codes
    pub fn expect_status(mut self, codes: impl IntoIterator<Item = u16>) -> Self {
        self.expected_status = codes.into_iter().collect();
        self
    }

    pub fn auth(mut self, auth: Auth) -> Self {
        self.auth = auth;
        self
    }

    pub fn validation(mut self, spec: ValidationSpec) -> Self {
        self.validation = Some(spec);
        self
    }

    pub fn timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Reject targets that can never be checked
    pub fn validate(&self) -> Result<(), EngineError> {
        let invalid = |reason: &str| EngineError::InvalidUrl {
            url: self.url.clone(),
            reason: reason.to_string(),
        };

        let url = Url::parse(&self.url).map_err(|e| invalid(&e.to_string()))?;
        match url.scheme() {
            "http" | "https" => {}
            other => return Err(invalid(&format!("unsupported scheme '{other}'"))),
        }
        if url.host_str().is_none() {
            return Err(invalid("URL must have a valid host"));
        }

        if self.timeout_ms == 0 {
            return Err(EngineError::InvalidTimeout);
        }

        Ok(())
    }
}

/// Result of one HTTP/API check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckResult {
    /// Whether a response was received at all
    pub success: bool,

    /// Wall-clock time of the attempt, recorded on failure too
    pub response_time_ms: u64,

    pub status_code: Option<u16>,

    /// Parsed JSON, or truncated text for non-JSON responses
    pub response_body: Option<Value>,

    pub response_headers: BTreeMap<String, String>,

    pub validation_passed: bool,

    pub validation_errors: Vec<String>,

    pub error_message: Option<String>,

    pub checked_at: DateTime<Utc>,
}

impl CheckResult {
    /// A check that never got a response
    pub fn failure(response_time_ms: u64, error: impl Into<String>) -> Self {
        Self {
            success: false,
            response_time_ms,
            status_code: None,
            response_body: None,
            response_headers: BTreeMap::new(),
            validation_passed: false,
            validation_errors: Vec::new(),
            error_message: Some(error.into()),
            checked_at: Utc::now(),
        }
    }
}
