//! HTTP API serving scrapes, the landing page and health checks

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::get,
    Json, Router,
};
use exporter_lib::{
    health::{ComponentStatus, HealthRegistry},
    observability::ExporterMetrics,
    ObservationEmitter, Scraper,
};
use prometheus::{Encoder, TextEncoder, TEXT_FORMAT};
use std::sync::Arc;
use tracing::{error, info};

const EXPORTER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Shared application state
pub struct AppState {
    pub scraper: Scraper,
    pub emitter: ObservationEmitter,
    pub metrics: ExporterMetrics,
    pub health_registry: HealthRegistry,
    pub metric_path: String,
}

impl AppState {
    pub fn new(
        scraper: Scraper,
        emitter: ObservationEmitter,
        metrics: ExporterMetrics,
        health_registry: HealthRegistry,
        metric_path: impl Into<String>,
    ) -> Self {
        Self {
            scraper,
            emitter,
            metrics,
            health_registry,
            metric_path: metric_path.into(),
        }
    }
}

/// Health check response - returns 200 if healthy, 503 if unhealthy
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health_registry.health().await;

    let status_code = match health.status {
        ComponentStatus::Healthy => StatusCode::OK,
        ComponentStatus::Degraded => StatusCode::OK, // TeamCity down still yields teamcity_up 0
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(health))
}

/// Readiness check response - returns 200 if ready, 503 if not ready
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.health_registry.readiness().await;

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

/// Landing page linking to the metrics
async fn landing(State(state): State<Arc<AppState>>) -> Html<String> {
    Html(format!(
        "<html>\n\
         <head><title>TeamCity Queue Exporter v{version}</title></head>\n\
         <body>\n\
         <h1>TeamCity Queue Exporter v{version}</h1>\n\
         <p><a href=\"{path}\">Metrics</a></p>\n\
         </body>\n\
         </html>\n",
        version = EXPORTER_VERSION,
        path = state.metric_path,
    ))
}

/// Scrape TeamCity and render the result with the exporter's own metrics
async fn metrics(State(state): State<Arc<AppState>>) -> Response {
    let report = state.scraper.scrape().await;
    state.metrics.record_scrape(&report);
    state.health_registry.record_scrape(&report).await;

    let mut metric_families = match state.emitter.emit(&report) {
        Ok(families) => families,
        Err(e) => {
            error!(event = "emit_failed", error = %e, "Failed to render scrape");
            Vec::new()
        }
    };
    metric_families.extend(state.metrics.gather());

    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        error!(event = "encode_failed", error = %e, "Failed to encode metrics");
        return (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response();
    }

    (StatusCode::OK, [(header::CONTENT_TYPE, TEXT_FORMAT)], buffer).into_response()
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    let metric_path = state.metric_path.clone();

    Router::new()
        .route("/", get(landing))
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route(&metric_path, get(metrics))
        .with_state(state)
}

/// Start the API server
pub async fn serve(addr: String, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = create_router(state);

    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
