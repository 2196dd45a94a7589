//! Shared tracing setup for Uppe binaries.

mod tracing;

pub use self::tracing::{LogFormat, init as init_tracing, init_with_level};
