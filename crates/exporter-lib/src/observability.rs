//! Observability infrastructure for the exporter
//!
//! Provides:
//! - Self metrics (scrape duration, failures by stage, skipped builds, build info)
//!   held in an explicitly constructed registry
//! - Structured JSON logging with tracing

use crate::aggregation::{ScrapeReport, ScrapeStage};
use crate::client::ApiError;
use prometheus::{
    proto::MetricFamily, GaugeVec, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts,
    Registry,
};
use std::time::Duration;
use tracing::{info, warn};

/// Histogram buckets for scrape duration (in seconds)
const SCRAPE_DURATION_BUCKETS: &[f64] = &[0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0];

/// Metric namespace for exporter self metrics
const SELF_NAMESPACE: &str = "teamcity_exporter";

/// Whole milliseconds, saturating at `u64::MAX`
fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Exporter self metrics for Prometheus exposition
///
/// Clones share the same registry and collectors.
#[derive(Clone)]
pub struct ExporterMetrics {
    registry: Registry,
    scrape_duration_seconds: Histogram,
    scrape_failures: IntCounterVec,
    skipped_builds: IntCounter,
    build_info: GaugeVec,
}

impl ExporterMetrics {
    /// Create the collectors and register them in a fresh registry
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();

        let scrape_duration_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "scrape_duration_seconds",
                "Time spent scraping the TeamCity API",
            )
            .namespace(SELF_NAMESPACE)
            .buckets(SCRAPE_DURATION_BUCKETS.to_vec()),
        )?;

        let scrape_failures = IntCounterVec::new(
            Opts::new(
                "scrape_failures_total",
                "Failures encountered while scraping, by stage",
            )
            .namespace(SELF_NAMESPACE),
            &["stage"],
        )?;

        let skipped_builds = IntCounter::with_opts(
            Opts::new(
                "skipped_builds_total",
                "Queued builds left out of the queue table after a failure",
            )
            .namespace(SELF_NAMESPACE),
        )?;

        let build_info = GaugeVec::new(
            Opts::new("build_info", "Exporter build information").namespace(SELF_NAMESPACE),
            &["version"],
        )?;

        registry.register(Box::new(scrape_duration_seconds.clone()))?;
        registry.register(Box::new(scrape_failures.clone()))?;
        registry.register(Box::new(skipped_builds.clone()))?;
        registry.register(Box::new(build_info.clone()))?;

        Ok(Self {
            registry,
            scrape_duration_seconds,
            scrape_failures,
            skipped_builds,
            build_info,
        })
    }

    /// Record a scrape duration observation
    pub fn observe_scrape_duration(&self, duration_secs: f64) {
        self.scrape_duration_seconds.observe(duration_secs);
    }

    /// Increment the failure counter for a stage
    pub fn inc_scrape_failure(&self, stage: ScrapeStage) {
        self.scrape_failures
            .with_label_values(&[stage.as_str()])
            .inc();
    }

    pub fn inc_skipped_builds(&self, count: u64) {
        self.skipped_builds.inc_by(count);
    }

    /// Update build info
    pub fn set_build_info(&self, version: &str) {
        self.build_info.reset();
        self.build_info.with_label_values(&[version]).set(1.0);
    }

    /// Fold a finished scrape into the self metrics
    pub fn record_scrape(&self, report: &ScrapeReport) {
        self.observe_scrape_duration(report.elapsed.as_secs_f64());
        for failure in &report.failures {
            self.inc_scrape_failure(failure.stage);
        }
        self.inc_skipped_builds(report.skipped_builds() as u64);
    }

    pub fn gather(&self) -> Vec<MetricFamily> {
        self.registry.gather()
    }
}

/// Structured logger for exporter events
///
/// Provides consistent JSON-formatted logging for scrapes, upstream
/// failures and lifecycle events.
#[derive(Debug, Clone)]
pub struct StructuredLogger {
    instance: String,
}

impl StructuredLogger {
    /// `instance` identifies the TeamCity server being scraped
    pub fn new(instance: impl Into<String>) -> Self {
        Self {
            instance: instance.into(),
        }
    }

    pub fn instance(&self) -> &str {
        &self.instance
    }

    /// Log exporter startup
    pub fn log_startup(&self, version: &str, listen_address: &str, metric_path: &str) {
        info!(
            event = "exporter_started",
            instance = %self.instance,
            version = %version,
            listen_address = %listen_address,
            metric_path = %metric_path,
            "TeamCity queue exporter started"
        );
    }

    /// Log exporter shutdown
    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "exporter_shutdown",
            instance = %self.instance,
            reason = %reason,
            "TeamCity queue exporter shutting down"
        );
    }

    /// Log a failed reachability probe
    pub fn log_upstream_down(&self, error: &ApiError) {
        warn!(
            event = "upstream_down",
            instance = %self.instance,
            connectivity = error.is_connectivity(),
            error = %error,
            "TeamCity server unreachable"
        );
    }

    /// Log a failure that ends one part of a scrape
    pub fn log_stage_failed(&self, stage: ScrapeStage, subject: Option<i64>, error: &ApiError) {
        warn!(
            event = "scrape_stage_failed",
            instance = %self.instance,
            stage = %stage,
            subject = ?subject,
            error = %error,
            "Scrape stage failed"
        );
    }

    /// Log a queued build dropped from the queue table
    pub fn log_build_skipped(&self, build_id: i64, stage: ScrapeStage, error: &ApiError) {
        warn!(
            event = "build_skipped",
            instance = %self.instance,
            build_id = build_id,
            stage = %stage,
            error = %error,
            "Skipping queued build"
        );
    }

    /// Log an abandoned scrape
    pub fn log_deadline_exceeded(&self, deadline: Duration) {
        warn!(
            event = "scrape_deadline_exceeded",
            instance = %self.instance,
            deadline_ms = millis(deadline),
            "Scrape abandoned after deadline"
        );
    }

    /// Log scrape completion
    pub fn log_scrape_completed(&self, report: &ScrapeReport) {
        info!(
            event = "scrape_completed",
            instance = %self.instance,
            up = report.up,
            queue_size = ?report.queue_size,
            queue_leaves = report.queue.len(),
            fleet_agents = ?report.fleet.as_ref().map(|f| f.total()),
            failures = report.failures.len(),
            skipped_builds = report.skipped_builds(),
            elapsed_ms = millis(report.elapsed),
            "Scrape completed"
        );
    }
}
