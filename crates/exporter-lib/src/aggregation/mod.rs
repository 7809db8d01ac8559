//! Scrape-time aggregation of TeamCity queue and fleet state
//!
//! A scrape probes the server, folds the build queue into the queue table
//! and, when enabled, folds the agent fleet into the fleet table. Upstream
//! calls are issued one after another; nothing is shared between scrapes.

mod fleet;
mod queue;
mod table;

#[cfg(test)]
mod tests;

pub use table::{
    AgentOs, FleetKey, FrequencyTable, Observation, OsAvailability, QueueKey, TableKey,
    FLEET_LABELS, QUEUE_LABELS, QUEUE_OS_LABELS,
};

use crate::ancestry::AncestryMemo;
use crate::client::{ApiError, CiApi};
use crate::observability::StructuredLogger;
use crate::reason::ReasonClassifier;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// Pool label used when an agent reports no pool name
pub const DEFAULT_POOL: &str = "Default";

/// Step of a scrape at which a failure happened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScrapeStage {
    Probe,
    Queue,
    QueuedBuild,
    Ancestry,
    CompatibleAgents,
    Agents,
    RunningBuilds,
    AgentProject,
    Deadline,
}

impl ScrapeStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScrapeStage::Probe => "probe",
            ScrapeStage::Queue => "queue",
            ScrapeStage::QueuedBuild => "queued_build",
            ScrapeStage::Ancestry => "ancestry",
            ScrapeStage::CompatibleAgents => "compatible_agents",
            ScrapeStage::Agents => "agents",
            ScrapeStage::RunningBuilds => "running_builds",
            ScrapeStage::AgentProject => "agent_project",
            ScrapeStage::Deadline => "deadline",
        }
    }

    /// Failures at these stages drop a single queued build
    pub fn skips_build(&self) -> bool {
        matches!(
            self,
            ScrapeStage::QueuedBuild | ScrapeStage::Ancestry | ScrapeStage::CompatibleAgents
        )
    }
}

impl fmt::Display for ScrapeStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failure recorded during a scrape
#[derive(Debug, Clone)]
pub struct ScrapeFailure {
    pub stage: ScrapeStage,
    /// Build or agent the failure belongs to, if any
    pub subject: Option<i64>,
    pub message: String,
}

/// Everything one scrape produced
#[derive(Debug, Default)]
pub struct ScrapeReport {
    /// Reachability probe succeeded
    pub up: bool,
    /// Number of builds in the queue listing, when it was fetched
    pub queue_size: Option<usize>,
    pub queue: FrequencyTable<QueueKey>,
    /// Absent when fleet metrics are disabled or could not be fetched
    pub fleet: Option<FrequencyTable<FleetKey>>,
    pub failures: Vec<ScrapeFailure>,
    pub elapsed: Duration,
}

impl ScrapeReport {
    fn fail(&mut self, stage: ScrapeStage, subject: Option<i64>, error: &ApiError) {
        self.failures.push(ScrapeFailure {
            stage,
            subject,
            message: error.to_string(),
        });
    }

    /// Number of queued builds dropped from the queue table
    pub fn skipped_builds(&self) -> usize {
        self.failures
            .iter()
            .filter(|f| f.stage.skips_build())
            .count()
    }

    /// True when nothing failed at all
    pub fn is_complete(&self) -> bool {
        self.up && self.failures.is_empty()
    }
}

/// Knobs for a scrape
#[derive(Debug, Clone)]
pub struct ScrapeSettings {
    /// Pool label for agents without a pool name
    pub default_pool: String,
    /// Track Windows/Linux/macOS availability in the queue table
    pub queue_os_flags: bool,
    /// Build the fleet table
    pub fleet_metrics: bool,
    /// Abandon scrapes running longer than this
    pub deadline: Option<Duration>,
}

impl Default for ScrapeSettings {
    fn default() -> Self {
        Self {
            default_pool: DEFAULT_POOL.to_string(),
            queue_os_flags: true,
            fleet_metrics: true,
            deadline: None,
        }
    }
}

/// Drives scrapes against the TeamCity API
pub struct Scraper {
    api: Arc<dyn CiApi>,
    classifier: ReasonClassifier,
    settings: ScrapeSettings,
    logger: StructuredLogger,
}

impl Scraper {
    pub fn new(
        api: Arc<dyn CiApi>,
        classifier: ReasonClassifier,
        settings: ScrapeSettings,
        logger: StructuredLogger,
    ) -> Self {
        Self {
            api,
            classifier,
            settings,
            logger,
        }
    }

    /// Run one scrape to completion, or until the configured deadline
    pub async fn scrape(&self) -> ScrapeReport {
        let start = Instant::now();

        let mut report = match self.settings.deadline {
            Some(deadline) => match tokio::time::timeout(deadline, self.run()).await {
                Ok(report) => report,
                Err(_) => {
                    self.logger.log_deadline_exceeded(deadline);
                    ScrapeReport {
                        failures: vec![ScrapeFailure {
                            stage: ScrapeStage::Deadline,
                            subject: None,
                            message: format!("scrape exceeded {:?}", deadline),
                        }],
                        ..Default::default()
                    }
                }
            },
            None => self.run().await,
        };

        report.elapsed = start.elapsed();
        self.logger.log_scrape_completed(&report);
        report
    }

    async fn run(&self) -> ScrapeReport {
        let mut report = ScrapeReport::default();

        if let Err(e) = self.api.server_info().await {
            self.logger.log_upstream_down(&e);
            report.fail(ScrapeStage::Probe, None, &e);
            return report;
        }
        report.up = true;

        let queue = match self.api.build_queue().await {
            Ok(queue) => queue,
            Err(e) => {
                self.logger.log_stage_failed(ScrapeStage::Queue, None, &e);
                report.fail(ScrapeStage::Queue, None, &e);
                return report;
            }
        };
        report.queue_size = Some(queue.builds.len());
        debug!(builds = queue.builds.len(), "Fetched build queue");

        let mut memo = AncestryMemo::new();
        for build in &queue.builds {
            if let Err((stage, e)) = self.fold_queued_build(build, &mut memo, &mut report.queue).await {
                self.logger.log_build_skipped(build.id, stage, &e);
                report.fail(stage, Some(build.id), &e);
            }
        }

        if self.settings.fleet_metrics {
            self.fold_fleet(&mut memo, &mut report).await;
        }

        report
    }
}

/// Builder for a [`Scraper`]
pub struct ScraperBuilder {
    api: Option<Arc<dyn CiApi>>,
    classifier: ReasonClassifier,
    settings: ScrapeSettings,
    logger: Option<StructuredLogger>,
}

impl ScraperBuilder {
    pub fn new() -> Self {
        Self {
            api: None,
            classifier: ReasonClassifier::default(),
            settings: ScrapeSettings::default(),
            logger: None,
        }
    }

    /// Set the API the scraper reads from
    pub fn api(mut self, api: Arc<dyn CiApi>) -> Self {
        self.api = Some(api);
        self
    }

    pub fn classifier(mut self, classifier: ReasonClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn default_pool(mut self, pool: impl Into<String>) -> Self {
        self.settings.default_pool = pool.into();
        self
    }

    pub fn queue_os_flags(mut self, enabled: bool) -> Self {
        self.settings.queue_os_flags = enabled;
        self
    }

    pub fn fleet_metrics(mut self, enabled: bool) -> Self {
        self.settings.fleet_metrics = enabled;
        self
    }

    pub fn deadline(mut self, deadline: Option<Duration>) -> Self {
        self.settings.deadline = deadline;
        self
    }

    pub fn logger(mut self, logger: StructuredLogger) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn build(self) -> anyhow::Result<Scraper> {
        let api = self
            .api
            .ok_or_else(|| anyhow::anyhow!("TeamCity API is required"))?;
        let logger = self
            .logger
            .unwrap_or_else(|| StructuredLogger::new("teamcity"));

        Ok(Scraper::new(api, self.classifier, self.settings, logger))
    }
}

impl Default for ScraperBuilder {
    fn default() -> Self {
        Self::new()
    }
}
