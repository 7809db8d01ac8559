//! Exporter library for TeamCity build queue and agent fleet metrics
//!
//! This crate provides the core functionality for:
//! - Fetching TeamCity REST resources
//! - Resolving build projects to their top-level project
//! - Classifying queue wait reasons
//! - Aggregating queue and fleet state into frequency tables
//! - Rendering scrapes as Prometheus metric families
//! - Health checks and observability

pub mod aggregation;
pub mod ancestry;
pub mod client;
pub mod emitter;
pub mod health;
pub mod models;
pub mod observability;
pub mod reason;

pub use aggregation::{ScrapeReport, ScrapeSettings, Scraper, ScraperBuilder};
pub use ancestry::{resolve_top, AncestryMemo};
pub use client::{ApiError, CiApi, Credentials, TeamCityClient};
pub use emitter::{MetricDescriptors, ObservationEmitter};
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use observability::{ExporterMetrics, StructuredLogger};
pub use reason::{ReasonClassifier, ReasonMode};
