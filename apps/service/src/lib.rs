//! Uppe health engine
//!
//! Executes uptime, API, security-header and multi-region checks, reduces
//! them to a site status, and fans incidents out to notification channels
//! and organization webhooks.

pub mod config;
pub mod error;
pub mod monitoring;
pub mod notify;
pub mod webhooks;

pub use error::EngineError;
