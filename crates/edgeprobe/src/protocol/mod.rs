//! Protocol definitions for edge probes.
//!
//! A probe request is sent to the edge proxy, which performs the request
//! from whichever point of presence picked it up and answers with a probe
//! response.

pub mod types;

pub use types::{ProbeRequest, ProbeResponse};
