//! Fleet table fold

use super::table::{AgentOs, FleetKey, FrequencyTable};
use super::{ScrapeReport, ScrapeStage, Scraper};
use crate::ancestry::{resolve_top, AncestryMemo};
use crate::models::RunningBuild;
use std::collections::HashMap;

impl Scraper {
    /// Count every agent by pool, OS, state flags and current top project
    ///
    /// A failed agents or running-builds fetch leaves `report.fleet` empty
    /// without touching the queue table.
    pub(super) async fn fold_fleet(&self, memo: &mut AncestryMemo, report: &mut ScrapeReport) {
        let agents = match self.api.agents().await {
            Ok(agents) => agents,
            Err(e) => {
                self.logger.log_stage_failed(ScrapeStage::Agents, None, &e);
                report.fail(ScrapeStage::Agents, None, &e);
                return;
            }
        };

        let running = match self.api.running_builds().await {
            Ok(running) => running,
            Err(e) => {
                self.logger
                    .log_stage_failed(ScrapeStage::RunningBuilds, None, &e);
                report.fail(ScrapeStage::RunningBuilds, None, &e);
                return;
            }
        };

        // An agent runs at most one build at a time
        let by_agent: HashMap<i64, &RunningBuild> = running
            .builds
            .iter()
            .filter_map(|build| build.agent.as_ref().map(|agent| (agent.id, build)))
            .collect();

        let mut table = FrequencyTable::new();
        for agent in &agents.agents {
            let (busy, project) = match by_agent.get(&agent.id) {
                Some(build) => (true, self.running_project(build, memo, report).await),
                None => (false, String::new()),
            };

            let pool = match agent.pool_name() {
                "" => self.settings.default_pool.clone(),
                name => name.to_string(),
            };

            table.increment(FleetKey {
                pool,
                os: AgentOs::infer(&agent.properties),
                enabled: agent.enabled,
                authorized: agent.authorized,
                connected: agent.connected,
                project,
                busy,
            });
        }

        report.fleet = Some(table);
    }

    /// Top project of a running build; empty when it cannot be resolved so
    /// the agent is still counted
    async fn running_project(
        &self,
        build: &RunningBuild,
        memo: &mut AncestryMemo,
        report: &mut ScrapeReport,
    ) -> String {
        let agent_id = build.agent.as_ref().map(|a| a.id);
        let project_id = build
            .build_type
            .as_ref()
            .map(|bt| bt.project_id.as_str())
            .unwrap_or_default();

        match resolve_top(self.api.as_ref(), project_id, memo).await {
            Ok(project) => project,
            Err(e) => {
                self.logger
                    .log_stage_failed(ScrapeStage::AgentProject, agent_id, &e);
                report.fail(ScrapeStage::AgentProject, agent_id, &e);
                String::new()
            }
        }
    }
}
