//! CLI definitions for the health engine.

use std::path::PathBuf;

use clap::{ArgGroup, Parser, Subcommand};

use uppe_health::monitoring::HttpMethod;

#[derive(Parser)]
#[command(name = "uppe-health")]
#[command(about = "Run Uppe site checks from the command line")]
#[command(version)]
pub(crate) struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Run an HTTP/API check and print the result
    #[command(group(ArgGroup::new("auth").args(["bearer", "api_key", "basic"])))]
    Check {
        url: String,

        #[arg(long, value_enum, default_value_t = MethodArg::Get)]
        method: MethodArg,

        /// Accepted status code, repeatable
        #[arg(long = "expect", default_values_t = [200u16])]
        expect: Vec<u16>,

        /// JSON request body
        #[arg(long)]
        body: Option<String>,

        #[arg(long)]
        bearer: Option<String>,

        #[arg(long)]
        api_key: Option<String>,

        /// Pre-encoded basic credentials
        #[arg(long)]
        basic: Option<String>,

        /// Dotted path that must exist in the JSON response, repeatable
        #[arg(long = "require-field")]
        require_field: Vec<String>,

        /// Overrides the configured timeout
        #[arg(long)]
        timeout_ms: Option<u64>,
    },

    /// Grade the security headers of a site
    Security { url: String },

    /// Check a site from several regions
    Regions {
        url: String,

        /// Region to check from, repeatable; defaults to the configured list
        #[arg(long = "region")]
        regions: Vec<String>,
    },

    /// Print the effective configuration
    Config,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub(crate) enum MethodArg {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
}

impl From<MethodArg> for HttpMethod {
    fn from(method: MethodArg) -> Self {
        match method {
            MethodArg::Get => HttpMethod::Get,
            MethodArg::Post => HttpMethod::Post,
            MethodArg::Put => HttpMethod::Put,
            MethodArg::Patch => HttpMethod::Patch,
            MethodArg::Delete => HttpMethod::Delete,
            MethodArg::Head => HttpMethod::Head,
            MethodArg::Options => HttpMethod::Options,
        }
    }
}
