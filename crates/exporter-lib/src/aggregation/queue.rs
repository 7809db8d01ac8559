//! Queue table fold

use super::table::{FrequencyTable, OsAvailability, QueueKey};
use super::{ScrapeStage, Scraper};
use crate::ancestry::{resolve_top, AncestryMemo};
use crate::client::ApiError;
use crate::models::QueuedBuild;
use tracing::{debug, warn};

impl Scraper {
    /// Add one queued build to the queue table
    ///
    /// Every (reason, project, build, pool[, os]) key is marked, not counted:
    /// several compatible agents in one pool collapse into a single leaf.
    pub(super) async fn fold_queued_build(
        &self,
        build: &QueuedBuild,
        memo: &mut AncestryMemo,
        table: &mut FrequencyTable<QueueKey>,
    ) -> Result<(), (ScrapeStage, ApiError)> {
        let (wait_reason, project_id) = match &build.build_type {
            Some(build_type) => (build.wait_reason.clone(), build_type.project_id.clone()),
            None => {
                let detail = self
                    .api
                    .queued_build(build.id)
                    .await
                    .map_err(|e| (ScrapeStage::QueuedBuild, e))?;
                let reason = if build.wait_reason.is_empty() {
                    detail.wait_reason
                } else {
                    build.wait_reason.clone()
                };
                let project = detail
                    .build_type
                    .map(|bt| bt.project_id)
                    .unwrap_or_default();
                (reason, project)
            }
        };

        if wait_reason.is_empty() {
            warn!(build_id = build.id, "Queued build has no wait reason");
        }
        let reason = self.classifier.classify(&wait_reason);

        let project = resolve_top(self.api.as_ref(), &project_id, memo)
            .await
            .map_err(|e| (ScrapeStage::Ancestry, e))?;

        let compatible = self
            .api
            .compatible_agents(build.id)
            .await
            .map_err(|e| (ScrapeStage::CompatibleAgents, e))?;

        let os = self
            .settings
            .queue_os_flags
            .then(|| OsAvailability::from_agents(&compatible.agents));

        debug!(
            build_id = build.id,
            reason = %reason,
            project = %project,
            compatible_agents = compatible.agents.len(),
            "Folding queued build"
        );

        for agent in &compatible.agents {
            let pool = match agent.pool_name() {
                "" => self.settings.default_pool.clone(),
                name => name.to_string(),
            };
            table.mark(QueueKey {
                reason: reason.clone(),
                project: project.clone(),
                build_id: build.id,
                pool,
                os,
            });
        }

        Ok(())
    }
}
