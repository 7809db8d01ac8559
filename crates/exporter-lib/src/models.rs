//! TeamCity REST API documents consumed by the exporter
//!
//! Only the fields the aggregation engine reads are modelled. Everything is
//! fetched fresh on every scrape and never persisted.

use serde::{Deserialize, Serialize};

/// Parent id TeamCity reports for top-level projects
pub const ROOT_PROJECT_ID: &str = "_Root";

/// Agent property carrying the operating system name
pub const OS_NAME_PROPERTY: &str = "teamcity.agent.jvm.os.name";

/// Server information, used as the reachability probe
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerInfo {
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub start_time: String,
}

/// Build queue listing
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BuildQueue {
    #[serde(default)]
    pub count: usize,
    #[serde(default, rename = "build")]
    pub builds: Vec<QueuedBuild>,
}

/// A build waiting in the queue
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueuedBuild {
    pub id: i64,
    #[serde(default)]
    pub wait_reason: String,
    /// Absent when the listing was fetched without inlined fields
    #[serde(default)]
    pub build_type: Option<BuildType>,
}

/// Build configuration owning a build
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildType {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub project_name: String,
    #[serde(default)]
    pub project_id: String,
}

/// Project detail
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// Missing for the root project itself
    #[serde(default)]
    pub parent_project_id: Option<String>,
}

/// Agent pool reference
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Pool {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub name: String,
}

/// Single agent property
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Property {
    pub name: String,
    #[serde(default)]
    pub value: String,
}

/// Agent property collection as TeamCity nests it
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Properties {
    #[serde(default)]
    pub property: Vec<Property>,
}

impl Properties {
    /// Value of the named property, if reported
    pub fn get(&self, name: &str) -> Option<&str> {
        self.property
            .iter()
            .find(|p| p.name == name)
            .map(|p| p.value.as_str())
    }

    /// Whether any property name ends with `suffix`
    pub fn has_name_ending_with(&self, suffix: &str) -> bool {
        self.property.iter().any(|p| p.name.ends_with(suffix))
    }
}

/// Build agent
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Agent {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub pool: Option<Pool>,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub authorized: bool,
    #[serde(default)]
    pub connected: bool,
    #[serde(default)]
    pub properties: Properties,
}

impl Agent {
    /// Pool name as reported upstream, empty when missing
    pub fn pool_name(&self) -> &str {
        self.pool.as_ref().map(|p| p.name.as_str()).unwrap_or("")
    }

    /// Operating system name property, empty when missing
    pub fn os_name(&self) -> &str {
        self.properties.get(OS_NAME_PROPERTY).unwrap_or("")
    }
}

/// Agent listing
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentList {
    #[serde(default, rename = "agent")]
    pub agents: Vec<Agent>,
}

/// Agent reference inside a running build
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentRef {
    pub id: i64,
    #[serde(default)]
    pub name: String,
}

/// A build currently executing on an agent
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunningBuild {
    pub id: i64,
    #[serde(default)]
    pub build_type: Option<BuildType>,
    #[serde(default)]
    pub agent: Option<AgentRef>,
}

/// Running build listing
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunningBuilds {
    #[serde(default, rename = "build")]
    pub builds: Vec<RunningBuild>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_build_queue_with_inlined_build_type() {
        let body = r#"{
            "count": 1,
            "href": "/app/rest/buildQueue",
            "build": [{
                "id": 42,
                "waitReason": "No agents available: none online",
                "href": "/app/rest/buildQueue/id:42",
                "buildType": {"id": "P1_Build", "name": "Build", "projectName": "P1", "projectId": "P1"}
            }]
        }"#;

        let queue: BuildQueue = serde_json::from_str(body).unwrap();
        assert_eq!(queue.count, 1);
        assert_eq!(queue.builds[0].id, 42);
        assert_eq!(queue.builds[0].build_type.as_ref().unwrap().project_id, "P1");
    }

    #[test]
    fn test_decode_empty_queue() {
        let queue: BuildQueue = serde_json::from_str(r#"{"count": 0}"#).unwrap();
        assert!(queue.builds.is_empty());
    }

    #[test]
    fn test_decode_root_project_has_no_parent() {
        let project: Project = serde_json::from_str(r#"{"id": "_Root", "name": "<Root project>"}"#).unwrap();
        assert!(project.parent_project_id.is_none());
    }

    #[test]
    fn test_agent_properties_lookup() {
        let body = r#"{
            "id": 7,
            "name": "linux-01",
            "pool": {"id": 0, "name": ""},
            "properties": {"count": 2, "property": [
                {"name": "teamcity.agent.jvm.os.name", "value": "Linux"},
                {"name": "system.agent.linux.version", "value": "6.1"}
            ]}
        }"#;

        let agent: Agent = serde_json::from_str(body).unwrap();
        assert_eq!(agent.os_name(), "Linux");
        assert_eq!(agent.pool_name(), "");
        assert!(agent.properties.has_name_ending_with("linux.version"));
        assert!(!agent.properties.has_name_ending_with("windows.version"));
    }
}
