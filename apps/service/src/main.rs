mod cli;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use serde_json::json;
use tracing::{info, level_filters::LevelFilter, warn};

use cli::{Cli, Commands};
use edgeprobe::EdgeClient;
use uppe_health::config::Config;
use uppe_health::monitoring::{
    Auth, CheckTarget, MonitoringExecutor, RegionSummary, RegionalDispatcher, SecurityAnalyzer, ValidationSpec,
    aggregate, parse_regions,
};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    if cli.verbose {
        logger::init_with_level(LevelFilter::DEBUG);
    } else {
        logger::init_tracing();
    }

    let config = Config::from_config(cli.config.as_deref()).context("Failed to load configuration")?;

    match cli.command {
        Commands::Check { url, method, expect, body, bearer, api_key, basic, require_field, timeout_ms } => {
            let auth = match (bearer, api_key, basic) {
                (Some(token), _, _) => Auth::Bearer(token),
                (_, Some(key), _) => Auth::ApiKey(key),
                (_, _, Some(credentials)) => Auth::Basic(credentials),
                _ => Auth::None,
            };

            let mut target = CheckTarget::new(url)
                .method(method.into())
                .expect_status(expect)
                .auth(auth)
                .timeout_ms(timeout_ms.unwrap_or(config.monitor.timeout_seconds * 1000));
            if let Some(body) = body {
                target = target.json_body(&body)?;
            }
            if !require_field.is_empty() {
                target = target.validation(ValidationSpec { required_fields: require_field, ..Default::default() });
            }

            let executor = MonitoringExecutor::new(&config.monitor.user_agent, config.monitor.degraded_threshold_ms)?;
            let outcome = executor.execute_check(&target).await?;
            info!("{} is {}", target.url, outcome.status);

            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }
        Commands::Security { url } => {
            let analyzer = SecurityAnalyzer::new(&config.monitor.user_agent, config.monitor.timeout())?;
            let result = analyzer.analyze(&url).await;
            info!("{} scored {} ({})", url, result.security_score, result.grade);

            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Commands::Regions { url, regions } => {
            let labels = if regions.is_empty() { config.regions.default_regions.clone() } else { regions };
            let regions = parse_regions(&labels)?;

            let mut dispatcher = RegionalDispatcher::new(
                &config.monitor.user_agent,
                config.monitor.timeout(),
                config.monitor.degraded_threshold_ms,
            )?;
            if let Some(edge_url) = &config.regions.edge_url {
                match EdgeClient::new(edge_url, config.regions.edge_timeout()) {
                    Ok(client) => dispatcher = dispatcher.with_edge(Arc::new(client)),
                    Err(e) => warn!("Ignoring edge executor at {}: {:#}", edge_url, e),
                }
            }

            let results = dispatcher.check_all_regions(&url, &regions).await;
            let status = aggregate(&results);
            info!("{} is {} across {} region(s)", url, status, results.len());

            let report = json!({
                "status": status,
                "summary": RegionSummary::from_results(&results),
                "results": results,
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Config => {
            print!("{config}");
        }
    }

    Ok(())
}
