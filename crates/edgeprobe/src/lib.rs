//! EdgeProbe - remote edge executor protocol for Uppe
//!
//! This library describes how a regional check is delegated to an edge
//! executor: the logical regions Uppe reports on, the colo table used to
//! translate an edge point of presence back into a region, the probe wire
//! types and the HTTP client that talks to the edge proxy.

pub mod client;
pub mod protocol;
pub mod region;
pub mod validation;

// Re-export main types
pub use client::EdgeClient;
pub use protocol::{ProbeRequest, ProbeResponse};
pub use region::{Region, UnknownRegion};
pub use validation::{validate_probe_request, InvalidProbe};

/// The version of the edge probe protocol, sent as [`PROTOCOL_HEADER`]
pub const PROTOCOL_VERSION: &str = "1.0";

/// Request header carrying [`PROTOCOL_VERSION`] on every probe
pub const PROTOCOL_HEADER: &str = "X-Edgeprobe-Protocol";
