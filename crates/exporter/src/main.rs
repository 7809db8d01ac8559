//! TeamCity Queue Exporter
//!
//! Serves Prometheus metrics describing the TeamCity build queue and agent
//! fleet, scraping the TeamCity REST API on every request.

use anyhow::Result;
use clap::Parser;
use exporter_lib::{
    health::{components, HealthRegistry},
    observability::{ExporterMetrics, StructuredLogger},
    Credentials, MetricDescriptors, ObservationEmitter, ReasonClassifier, ScraperBuilder,
    TeamCityClient,
};
use std::sync::Arc;
use teamcity_queue_exporter::{api, config::ExporterConfig};
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const EXPORTER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Command-line overrides; everything else comes from `TE_*` variables
#[derive(Parser, Debug)]
#[command(name = "teamcity-queue-exporter", version, about)]
struct Cli {
    /// Address to listen on
    #[arg(long)]
    listen_address: Option<String>,

    /// Path under which to expose metrics
    #[arg(long)]
    metric_path: Option<String>,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = ExporterConfig::load()?;
    if let Some(listen_address) = cli.listen_address {
        config.listen_address = listen_address;
    }
    if let Some(metric_path) = cli.metric_path {
        config.metric_path = metric_path;
    }
    config.debug |= cli.debug;

    // Initialize tracing with JSON output; RUST_LOG wins over the debug flag
    let default_level = if config.debug { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with(fmt::layer().json())
        .init();

    if let Err(e) = config.validate() {
        error!(event = "invalid_config", error = %e, "Invalid configuration");
        std::process::exit(1);
    }

    info!("Starting teamcity-queue-exporter");

    let api_url = config.api_url()?;
    let credentials = Credentials {
        login: config.api_login.clone(),
        password: config.api_password.clone(),
    };
    let client = TeamCityClient::with_timeout(api_url.clone(), credentials, config.request_timeout())?;
    info!(api_url = %client.base_url(), "TeamCity client configured");

    let logger = StructuredLogger::new(api_url.as_str());

    let scraper = ScraperBuilder::new()
        .api(Arc::new(client))
        .classifier(ReasonClassifier::new(config.reason_mode, &config.default_reason))
        .default_pool(&config.default_pool)
        .queue_os_flags(config.queue_os_flags)
        .fleet_metrics(config.fleet_metrics)
        .deadline(config.scrape_deadline())
        .logger(logger.clone())
        .build()?;

    let emitter = ObservationEmitter::new(MetricDescriptors::new(config.queue_os_flags));

    // Initialize health registry
    let health_registry = HealthRegistry::new();
    health_registry.register(components::SERVER).await;
    health_registry.register(components::TEAMCITY_API).await;

    // Initialize metrics
    let metrics = ExporterMetrics::new()?;
    metrics.set_build_info(EXPORTER_VERSION);

    let app_state = Arc::new(api::AppState::new(
        scraper,
        emitter,
        metrics,
        health_registry.clone(),
        config.metric_path.clone(),
    ));

    health_registry.set_ready(true).await;
    logger.log_startup(EXPORTER_VERSION, &config.listen_address, &config.metric_path);

    let server = tokio::spawn(api::serve(config.socket_address(), app_state));

    tokio::select! {
        result = server => {
            let err = match result {
                Ok(Ok(())) => return Ok(()),
                Ok(Err(e)) => e,
                Err(e) => e.into(),
            };
            health_registry
                .set_unhealthy(components::SERVER, err.to_string())
                .await;
            error!(event = "server_failed", error = %err, "API server stopped");
            return Err(err);
        }
        _ = tokio::signal::ctrl_c() => {
            logger.log_shutdown("SIGINT received");
        }
    }

    info!("Shutting down");
    Ok(())
}
