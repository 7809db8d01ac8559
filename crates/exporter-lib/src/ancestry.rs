//! Top-level project resolution
//!
//! Walks the project tree root-ward, fetching only projects that have not
//! been seen earlier in the same scrape.

use crate::client::{ApiError, CiApi};
use crate::models::ROOT_PROJECT_ID;
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

/// Child to direct-parent edges discovered during one scrape
///
/// Created fresh for every scrape; the upstream tree may change between
/// scrapes.
#[derive(Debug, Default)]
pub struct AncestryMemo {
    parents: HashMap<String, String>,
}

impl AncestryMemo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recorded parent of `project_id`
    pub fn parent_of(&self, project_id: &str) -> Option<&str> {
        self.parents.get(project_id).map(String::as_str)
    }

    /// Record an edge; an existing edge is never replaced
    pub fn record(&mut self, project_id: &str, parent_id: &str) {
        match self.parents.get(project_id) {
            Some(existing) if existing != parent_id => {
                warn!(
                    project = %project_id,
                    recorded_parent = %existing,
                    reported_parent = %parent_id,
                    "Project parent changed during scrape, keeping first value"
                );
            }
            Some(_) => {}
            None => {
                self.parents
                    .insert(project_id.to_string(), parent_id.to_string());
            }
        }
    }

    pub fn len(&self) -> usize {
        self.parents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parents.is_empty()
    }
}

/// Resolve the ancestor of `project_id` whose parent is the root project
///
/// `project_id` is expected to be a build-owned project, never the root
/// itself.
pub async fn resolve_top(
    api: &dyn CiApi,
    project_id: &str,
    memo: &mut AncestryMemo,
) -> Result<String, ApiError> {
    let mut current = project_id.to_string();
    let mut visited = HashSet::new();

    loop {
        if !visited.insert(current.clone()) {
            return Err(ApiError::AncestryCycle {
                project: project_id.to_string(),
            });
        }

        let parent = match memo.parent_of(&current) {
            Some(parent) => parent.to_string(),
            None => {
                let project = api.project(&current).await?;
                let parent = project
                    .parent_project_id
                    .unwrap_or_else(|| ROOT_PROJECT_ID.to_string());
                debug!(project = %current, parent = %parent, "Fetched project parent");
                memo.record(&current, &parent);
                parent
            }
        };

        if parent == ROOT_PROJECT_ID {
            return Ok(current);
        }
        current = parent;
    }
}
