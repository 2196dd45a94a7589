/// Monitoring engine module - runs checks and reduces them to a site status
///
/// This module is responsible for:
/// - Executing HTTP/API checks with auth and response validation
/// - Grading security headers
/// - Running checks from several regions, via an edge executor or locally
/// - Aggregating results into one status
pub mod aggregate;
pub mod checker;
pub mod executor;
pub mod regions;
pub mod security;
pub mod types;
pub mod validation;

pub use aggregate::{StatusSample, aggregate};
pub use checker::{DEFAULT_USER_AGENT, HttpChecker, build_headers};
pub use executor::{CheckOutcome, DEFAULT_DEGRADED_THRESHOLD_MS, MonitoringExecutor, classify_check};
pub use regions::{EdgeExecutor, RegionResult, RegionSummary, RegionalDispatcher, TimingSource, parse_regions};
pub use security::{Grade, SecurityAnalyzer, SecurityCheckResult, analyze_headers};
pub use types::{Auth, CheckResult, CheckTarget, HttpMethod, MonitorStatus};
pub use validation::{SchemaNode, SchemaType, ValidationOutcome, ValidationSpec, validate};
