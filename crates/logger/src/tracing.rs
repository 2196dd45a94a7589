use std::{env::var, str::FromStr};

use tracing::level_filters::LevelFilter;
use tracing_subscriber::{Layer, filter::EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Output format selected through `RUST_LOG_FORMAT`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Compact,
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown log format '{other}'")),
        }
    }
}

impl LogFormat {
    /// Unset or unrecognised values fall back to compact output.
    pub fn from_env() -> (Self, Option<String>) {
        match var("RUST_LOG_FORMAT").map(|raw| raw.parse::<Self>()) {
            Ok(Ok(format)) => (format, None),
            Ok(Err(unknown)) => (Self::Compact, Some(unknown)),
            Err(_) => (Self::Compact, None),
        }
    }
}

pub fn init() {
    init_with_level(LevelFilter::INFO);
}

/// `RUST_LOG` directives still override `level`.
pub fn init_with_level(level: LevelFilter) {
    let env_filter = EnvFilter::builder().with_default_directive(level.into()).from_env_lossy();
    let (format, rejected) = LogFormat::from_env();

    let layer = match format {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_current_span(false)
            .with_filter(env_filter)
            .boxed(),
        LogFormat::Pretty => tracing_subscriber::fmt::layer().pretty().with_filter(env_filter).boxed(),
        LogFormat::Compact => tracing_subscriber::fmt::layer()
            .compact()
            .without_time()
            .with_target(false)
            .with_filter(env_filter)
            .boxed(),
    };

    // Tests and embedders may already own the global subscriber.
    if tracing_subscriber::registry().with(layer).try_init().is_ok()
        && let Some(reason) = rejected
    {
        ::tracing::warn!("Ignoring RUST_LOG_FORMAT: {reason}, using compact output");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_known_formats() {
        assert_eq!("json".parse::<LogFormat>(), Ok(LogFormat::Json));
        assert_eq!(" Pretty ".parse::<LogFormat>(), Ok(LogFormat::Pretty));
        assert_eq!("".parse::<LogFormat>(), Ok(LogFormat::Compact));
    }

    #[test]
    fn test_rejects_unknown_format() {
        let err = "xml".parse::<LogFormat>().unwrap_err();
        assert!(err.contains("xml"));
    }
}
