use chrono::Utc;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue, USER_AGENT};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::time::Instant;
use tokio::time::timeout;
use tracing::debug;

use super::types::{Auth, CheckResult, CheckTarget};
use super::validation::validate;
use crate::error::EngineError;

/// User agent sent with every check unless the caller overrides it
pub const DEFAULT_USER_AGENT: &str = "Uppe-Monitor/1.0";

/// Non-JSON bodies are kept for diagnostics, cut at this many characters
const MAX_TEXT_BODY_CHARS: usize = 1000;

/// Header names that already carry an API key, in lookup order
const API_KEY_HEADERS: [&str; 2] = ["x-api-key", "api-key"];

/// Performs single timed HTTP/API checks
#[derive(Debug, Clone)]
pub struct HttpChecker {
    client: reqwest::Client,
    user_agent: String,
}

impl HttpChecker {
    pub fn new(user_agent: impl Into<String>) -> Result<Self, EngineError> {
        let client = reqwest::Client::builder().build()?;

        Ok(Self { client, user_agent: user_agent.into() })
    }

    /// Execute the check described by `target`.
    ///
    /// Never fails: transport errors and timeouts come back as a result with
    /// `success == false` and an error message.
    pub async fn execute(&self, target: &CheckTarget) -> CheckResult {
        let start = Instant::now();

        let headers = match build_headers(target, &self.user_agent) {
            Ok(headers) => headers,
            Err(e) => return CheckResult::failure(elapsed_ms(start), e.to_string()),
        };

        let mut request = self.client.request(target.method.into(), &target.url).headers(headers);
        if target.method.allows_body() {
            if let Some(body) = &target.body {
                request = request.body(body.clone());
            }
        }

        // Dropping the future on expiry aborts the in-flight request.
        let outcome = timeout(target.timeout(), async {
            let response = request.send().await?;
            let status = response.status().as_u16();
            let headers = collect_headers(response.headers());
            // A body that breaks off mid-stream still leaves a valid response.
            let text = response.text().await.ok();
            Ok::<_, reqwest::Error>((status, headers, text))
        })
        .await;

        let response_time_ms = elapsed_ms(start);

        let (status_code, response_headers, text) = match outcome {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => return CheckResult::failure(response_time_ms, describe_error(&e)),
            Err(_) => {
                return CheckResult::failure(
                    response_time_ms,
                    format!("Request timed out after {} ms", target.timeout_ms),
                );
            }
        };

        let is_json = response_headers
            .get("content-type")
            .is_some_and(|value| value.contains("application/json"));
        let response_body = text.and_then(|text| parse_body(&text, is_json));

        let mut validation_errors = Vec::new();
        let status_valid = target.expected_status.contains(&status_code);
        if !status_valid {
            validation_errors.push(format!(
                "Expected status code {}, got {}",
                format_status_set(&target.expected_status),
                status_code
            ));
        }

        let mut rules_passed = true;
        if let Some(spec) = &target.validation {
            let outcome = validate(response_body.as_ref().unwrap_or(&Value::Null), spec);
            rules_passed = outcome.passed;
            validation_errors.extend(outcome.errors);
        }

        debug!("Checked {}: status {} in {} ms", target.url, status_code, response_time_ms);

        CheckResult {
            success: true,
            response_time_ms,
            status_code: Some(status_code),
            response_body,
            response_headers,
            validation_passed: status_valid && rules_passed,
            validation_errors,
            error_message: None,
            checked_at: Utc::now(),
        }
    }
}

/// Build the request headers for `target`.
///
/// Defaults come first, caller headers override them, and exactly one
/// authentication header is injected last. Caller-declared API key headers
/// are dropped under Bearer or Basic auth.
pub fn build_headers(target: &CheckTarget, user_agent: &str) -> Result<HeaderMap, EngineError> {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, header_value(USER_AGENT.as_str(), user_agent)?);
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    for (name, value) in &target.headers {
        let header_name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| EngineError::InvalidHeader(name.clone()))?;
        headers.insert(header_name, header_value(name, value)?);
    }

    let (name, value) = match &target.auth {
        Auth::None => return Ok(headers),
        Auth::Bearer(token) => {
            strip_api_key_headers(&mut headers);
            (AUTHORIZATION, format!("Bearer {token}"))
        }
        Auth::Basic(credentials) => {
            strip_api_key_headers(&mut headers);
            (AUTHORIZATION, format!("Basic {credentials}"))
        }
        Auth::ApiKey(key) => {
            let existing = API_KEY_HEADERS.into_iter().find(|name| headers.contains_key(*name));
            (HeaderName::from_static(existing.unwrap_or("x-api-key")), key.clone())
        }
    };

    let mut value = header_value(name.as_str(), &value)?;
    value.set_sensitive(true);
    headers.insert(name, value);

    Ok(headers)
}

fn strip_api_key_headers(headers: &mut HeaderMap) {
    for name in API_KEY_HEADERS {
        headers.remove(name);
    }
}

fn header_value(name: &str, value: &str) -> Result<HeaderValue, EngineError> {
    HeaderValue::from_str(value).map_err(|_| EngineError::InvalidHeader(name.to_string()))
}

pub(crate) fn collect_headers(headers: &HeaderMap) -> BTreeMap<String, String> {
    let mut collected: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in headers {
        let Ok(value) = value.to_str() else { continue };
        collected
            .entry(name.as_str().to_string())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(value);
            })
            .or_insert_with(|| value.to_string());
    }
    collected
}

/// JSON bodies are parsed (failures swallowed), anything else is kept as
/// truncated text.
fn parse_body(text: &str, is_json: bool) -> Option<Value> {
    if is_json {
        return serde_json::from_str(text).ok();
    }

    if text.is_empty() {
        return None;
    }

    Some(Value::String(truncate_text(text, MAX_TEXT_BODY_CHARS)))
}

fn truncate_text(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

fn format_status_set(codes: &BTreeSet<u16>) -> String {
    let codes: Vec<String> = codes.iter().map(u16::to_string).collect();
    format!("[{}]", codes.join(", "))
}

fn describe_error(error: &reqwest::Error) -> String {
    if error.is_timeout() {
        "Request timed out".to_string()
    } else if error.is_connect() {
        format!("Connection failed: {error}")
    } else {
        format!("HTTP request failed: {error}")
    }
}

pub(crate) fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}
