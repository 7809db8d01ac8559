//! Scrape tests
//!
//! The engine tests run against an in-memory TeamCity; the end-to-end tests
//! go through the HTTP client against a mock server.

use super::*;
use crate::client::{ApiError, CiApi};
use crate::models::{
    Agent, AgentList, AgentRef, BuildQueue, BuildType, Pool, Project, Properties, Property,
    QueuedBuild, RunningBuild, RunningBuilds, ServerInfo, OS_NAME_PROPERTY, ROOT_PROJECT_ID,
};
use crate::reason::{ReasonClassifier, ReasonMode, DEFAULT_REASON};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

fn unavailable(what: &str) -> ApiError {
    ApiError::Status {
        url: format!("http://ci/{}", what),
        status: "500 Internal Server Error".to_string(),
    }
}

/// TeamCity served from memory
#[derive(Default)]
struct FakeTeamCity {
    down: bool,
    queue_broken: bool,
    probe_delay: Option<Duration>,
    queue: Vec<QueuedBuild>,
    queued_details: HashMap<i64, QueuedBuild>,
    parents: HashMap<String, String>,
    compatible: HashMap<i64, Vec<Agent>>,
    /// `None` makes the agents listing fail
    agents: Option<Vec<Agent>>,
    running: Vec<RunningBuild>,
    project_fetches: Mutex<HashMap<String, usize>>,
    agents_calls: AtomicUsize,
}

impl FakeTeamCity {
    fn project_fetches(&self, id: &str) -> usize {
        self.project_fetches
            .lock()
            .unwrap()
            .get(id)
            .copied()
            .unwrap_or(0)
    }

    fn with_tree(mut self, edges: &[(&str, &str)]) -> Self {
        for (child, parent) in edges {
            self.parents.insert(child.to_string(), parent.to_string());
        }
        self
    }
}

#[async_trait]
impl CiApi for FakeTeamCity {
    async fn server_info(&self) -> Result<ServerInfo, ApiError> {
        if let Some(delay) = self.probe_delay {
            tokio::time::sleep(delay).await;
        }
        if self.down {
            return Err(unavailable("app/rest/server"));
        }
        Ok(ServerInfo::default())
    }

    async fn build_queue(&self) -> Result<BuildQueue, ApiError> {
        if self.queue_broken {
            return Err(unavailable("app/rest/buildQueue"));
        }
        Ok(BuildQueue {
            count: self.queue.len(),
            builds: self.queue.clone(),
        })
    }

    async fn queued_build(&self, id: i64) -> Result<QueuedBuild, ApiError> {
        self.queued_details
            .get(&id)
            .cloned()
            .ok_or_else(|| unavailable("app/rest/buildQueue/id"))
    }

    async fn compatible_agents(&self, build_id: i64) -> Result<AgentList, ApiError> {
        self.compatible
            .get(&build_id)
            .map(|agents| AgentList {
                agents: agents.clone(),
            })
            .ok_or_else(|| unavailable("app/rest/agents"))
    }

    async fn project(&self, id: &str) -> Result<Project, ApiError> {
        *self
            .project_fetches
            .lock()
            .unwrap()
            .entry(id.to_string())
            .or_default() += 1;
        self.parents
            .get(id)
            .map(|parent| Project {
                id: id.to_string(),
                name: id.to_string(),
                parent_project_id: Some(parent.clone()),
            })
            .ok_or_else(|| unavailable("app/rest/projects/id"))
    }

    async fn agents(&self) -> Result<AgentList, ApiError> {
        self.agents_calls.fetch_add(1, Ordering::SeqCst);
        self.agents
            .clone()
            .map(|agents| AgentList { agents })
            .ok_or_else(|| unavailable("app/rest/agents"))
    }

    async fn running_builds(&self) -> Result<RunningBuilds, ApiError> {
        Ok(RunningBuilds {
            builds: self.running.clone(),
        })
    }
}

fn build_type(project_id: &str) -> BuildType {
    BuildType {
        id: format!("{}_Build", project_id),
        name: "Build".to_string(),
        project_name: project_id.to_string(),
        project_id: project_id.to_string(),
    }
}

fn queued(id: i64, reason: &str, project_id: &str) -> QueuedBuild {
    QueuedBuild {
        id,
        wait_reason: reason.to_string(),
        build_type: Some(build_type(project_id)),
    }
}

fn agent(id: i64, pool: &str, properties: &[(&str, &str)]) -> Agent {
    Agent {
        id,
        name: format!("agent-{}", id),
        pool: Some(Pool {
            id: 0,
            name: pool.to_string(),
        }),
        enabled: true,
        authorized: true,
        connected: true,
        properties: Properties {
            property: properties
                .iter()
                .map(|(name, value)| Property {
                    name: name.to_string(),
                    value: value.to_string(),
                })
                .collect(),
        },
    }
}

fn linux_agent(id: i64, pool: &str) -> Agent {
    agent(
        id,
        pool,
        &[
            (OS_NAME_PROPERTY, "Linux"),
            ("system.agent.linux.version", "6.1"),
        ],
    )
}

fn windows_agent(id: i64, pool: &str) -> Agent {
    agent(
        id,
        pool,
        &[
            (OS_NAME_PROPERTY, "Windows Server 2022"),
            ("system.agent.windows.version", "10.0"),
        ],
    )
}

fn running(id: i64, agent_id: i64, project_id: &str) -> RunningBuild {
    RunningBuild {
        id,
        build_type: Some(build_type(project_id)),
        agent: Some(AgentRef {
            id: agent_id,
            name: format!("agent-{}", agent_id),
        }),
    }
}

fn scraper(api: Arc<FakeTeamCity>) -> ScraperBuilder {
    ScraperBuilder::new().api(api)
}

fn linux_only() -> Option<OsAvailability> {
    Some(OsAvailability {
        windows: false,
        linux: true,
        mac: false,
    })
}

mod queue_tests {
    use super::*;

    #[tokio::test]
    async fn test_single_build_scenario() {
        let mut fake = FakeTeamCity::default().with_tree(&[("P1", "P2"), ("P2", ROOT_PROJECT_ID)]);
        fake.queue = vec![queued(42, "No agents available: none online", "P1")];
        fake.compatible.insert(42, vec![linux_agent(1, "Default")]);
        fake.agents = Some(vec![]);

        let report = scraper(Arc::new(fake)).build().unwrap().scrape().await;

        assert!(report.up);
        assert_eq!(report.queue_size, Some(1));
        assert_eq!(report.queue.len(), 1);
        let key = QueueKey {
            reason: "No agents available".to_string(),
            project: "P2".to_string(),
            build_id: 42,
            pool: "Default".to_string(),
            os: linux_only(),
        };
        assert_eq!(report.queue.get(&key), 1);
        assert!(report.is_complete());
    }

    #[tokio::test]
    async fn test_duplicate_pool_members_collapse() {
        let mut fake = FakeTeamCity::default().with_tree(&[("P1", ROOT_PROJECT_ID)]);
        fake.queue = vec![queued(1, "Waiting", "P1")];
        fake.compatible.insert(
            1,
            vec![
                linux_agent(1, "Linux"),
                linux_agent(2, "Linux"),
                linux_agent(2, "Linux"),
                windows_agent(3, "Windows"),
            ],
        );

        let report = scraper(Arc::new(fake))
            .fleet_metrics(false)
            .build()
            .unwrap()
            .scrape()
            .await;

        assert_eq!(report.queue.len(), 2);
        for (key, value) in report.queue.iter() {
            assert_eq!(value, 1);
            // OS availability covers the whole compatible set, not the pool
            assert_eq!(
                key.os,
                Some(OsAvailability {
                    windows: true,
                    linux: true,
                    mac: false,
                })
            );
        }
    }

    #[tokio::test]
    async fn test_empty_pool_name_uses_default_pool() {
        let mut fake = FakeTeamCity::default().with_tree(&[("P1", ROOT_PROJECT_ID)]);
        fake.queue = vec![queued(5, "Waiting", "P1")];
        fake.compatible.insert(5, vec![linux_agent(1, "")]);

        let report = scraper(Arc::new(fake))
            .fleet_metrics(false)
            .default_pool("Unassigned")
            .build()
            .unwrap()
            .scrape()
            .await;

        let (key, _) = report.queue.iter().next().unwrap();
        assert_eq!(key.pool, "Unassigned");
    }

    #[tokio::test]
    async fn test_empty_reason_uses_default_phrase() {
        let mut fake = FakeTeamCity::default().with_tree(&[("P1", ROOT_PROJECT_ID)]);
        fake.queue = vec![queued(5, "", "P1")];
        fake.compatible.insert(5, vec![linux_agent(1, "Default")]);

        let report = scraper(Arc::new(fake))
            .fleet_metrics(false)
            .build()
            .unwrap()
            .scrape()
            .await;

        let (key, _) = report.queue.iter().next().unwrap();
        assert_eq!(key.reason, DEFAULT_REASON);
    }

    #[tokio::test]
    async fn test_closed_reason_mode() {
        let mut fake = FakeTeamCity::default().with_tree(&[("P1", ROOT_PROJECT_ID)]);
        fake.queue = vec![queued(5, "Build dependencies have not been built yet", "P1")];
        fake.compatible.insert(5, vec![linux_agent(1, "Default")]);

        let report = scraper(Arc::new(fake))
            .fleet_metrics(false)
            .classifier(ReasonClassifier::new(ReasonMode::Closed, DEFAULT_REASON))
            .build()
            .unwrap()
            .scrape()
            .await;

        let (key, _) = report.queue.iter().next().unwrap();
        assert_eq!(key.reason, "dependencies");
    }

    #[tokio::test]
    async fn test_simple_variant_has_no_os_flags() {
        let mut fake = FakeTeamCity::default().with_tree(&[("P1", ROOT_PROJECT_ID)]);
        fake.queue = vec![queued(5, "Waiting", "P1")];
        fake.compatible.insert(5, vec![linux_agent(1, "Default")]);

        let report = scraper(Arc::new(fake))
            .fleet_metrics(false)
            .queue_os_flags(false)
            .build()
            .unwrap()
            .scrape()
            .await;

        let (key, _) = report.queue.iter().next().unwrap();
        assert_eq!(key.os, None);
        assert_eq!(key.label_values().len(), QUEUE_LABELS.len());
    }

    #[tokio::test]
    async fn test_build_without_compatible_agents_adds_nothing() {
        let mut fake = FakeTeamCity::default().with_tree(&[("P1", ROOT_PROJECT_ID)]);
        fake.queue = vec![queued(5, "Waiting", "P1")];
        fake.compatible.insert(5, vec![]);

        let report = scraper(Arc::new(fake))
            .fleet_metrics(false)
            .build()
            .unwrap()
            .scrape()
            .await;

        assert_eq!(report.queue_size, Some(1));
        assert!(report.queue.is_empty());
        assert!(report.is_complete());
    }

    #[tokio::test]
    async fn test_missing_build_type_fetches_queued_build() {
        let mut fake = FakeTeamCity::default().with_tree(&[("P1", ROOT_PROJECT_ID)]);
        fake.queue = vec![QueuedBuild {
            id: 9,
            wait_reason: String::new(),
            build_type: None,
        }];
        fake.queued_details
            .insert(9, queued(9, "Build dependencies have not been built yet", "P1"));
        fake.compatible.insert(9, vec![linux_agent(1, "Default")]);

        let report = scraper(Arc::new(fake))
            .fleet_metrics(false)
            .build()
            .unwrap()
            .scrape()
            .await;

        let (key, _) = report.queue.iter().next().unwrap();
        assert_eq!(key.project, "P1");
        assert_eq!(key.reason, "Build dependencies have not been built yet");
    }

    #[tokio::test]
    async fn test_ancestry_failure_skips_only_that_build() {
        let mut fake = FakeTeamCity::default().with_tree(&[("P1", ROOT_PROJECT_ID)]);
        fake.queue = vec![
            queued(1, "Waiting", "Missing"),
            queued(2, "Waiting", "P1"),
        ];
        fake.compatible.insert(1, vec![linux_agent(1, "Default")]);
        fake.compatible.insert(2, vec![linux_agent(1, "Default")]);

        let report = scraper(Arc::new(fake))
            .fleet_metrics(false)
            .build()
            .unwrap()
            .scrape()
            .await;

        assert!(report.up);
        assert_eq!(report.queue.len(), 1);
        assert_eq!(report.queue.iter().next().unwrap().0.build_id, 2);
        assert_eq!(report.skipped_builds(), 1);
        assert_eq!(report.failures[0].stage, ScrapeStage::Ancestry);
        assert_eq!(report.failures[0].subject, Some(1));
    }

    #[tokio::test]
    async fn test_compatible_agents_failure_skips_only_that_build() {
        let mut fake = FakeTeamCity::default().with_tree(&[("P1", ROOT_PROJECT_ID)]);
        fake.queue = vec![queued(1, "Waiting", "P1"), queued(2, "Waiting", "P1")];
        fake.compatible.insert(2, vec![linux_agent(1, "Default")]);

        let report = scraper(Arc::new(fake))
            .fleet_metrics(false)
            .build()
            .unwrap()
            .scrape()
            .await;

        assert_eq!(report.queue.len(), 1);
        assert_eq!(report.skipped_builds(), 1);
        assert_eq!(report.failures[0].stage, ScrapeStage::CompatibleAgents);
    }

    #[tokio::test]
    async fn test_shared_projects_fetched_once_per_scrape() {
        let mut fake = FakeTeamCity::default().with_tree(&[
            ("Leaf", "Mid"),
            ("Other", "Mid"),
            ("Mid", "Top"),
            ("Top", ROOT_PROJECT_ID),
        ]);
        fake.queue = vec![
            queued(1, "Waiting", "Leaf"),
            queued(2, "Waiting", "Leaf"),
            queued(3, "Waiting", "Other"),
        ];
        for id in 1..=3 {
            fake.compatible.insert(id, vec![linux_agent(1, "Default")]);
        }
        let fake = Arc::new(fake);

        let scraper = scraper(fake.clone()).fleet_metrics(false).build().unwrap();
        scraper.scrape().await;

        for project in ["Leaf", "Other", "Mid", "Top"] {
            assert_eq!(fake.project_fetches(project), 1, "{}", project);
        }

        // A new scrape starts with an empty memo
        scraper.scrape().await;
        assert_eq!(fake.project_fetches("Top"), 2);
    }
}

mod scrape_failure_tests {
    use super::*;

    #[tokio::test]
    async fn test_probe_failure_reports_down() {
        let mut fake = FakeTeamCity::default().with_tree(&[("P1", ROOT_PROJECT_ID)]);
        fake.down = true;
        fake.queue = vec![queued(1, "Waiting", "P1")];
        fake.compatible.insert(1, vec![linux_agent(1, "Default")]);
        fake.agents = Some(vec![linux_agent(1, "Default")]);
        let fake = Arc::new(fake);

        let report = scraper(fake.clone()).build().unwrap().scrape().await;

        assert!(!report.up);
        assert_eq!(report.queue_size, None);
        assert!(report.queue.is_empty());
        assert!(report.fleet.is_none());
        assert_eq!(report.failures[0].stage, ScrapeStage::Probe);
        assert_eq!(fake.agents_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_queue_failure_keeps_up() {
        let mut fake = FakeTeamCity::default();
        fake.queue_broken = true;
        fake.agents = Some(vec![]);

        let report = scraper(Arc::new(fake)).build().unwrap().scrape().await;

        assert!(report.up);
        assert_eq!(report.queue_size, None);
        assert!(report.fleet.is_none());
        assert_eq!(report.failures[0].stage, ScrapeStage::Queue);
    }

    #[tokio::test]
    async fn test_deadline_abandons_scrape() {
        let fake = FakeTeamCity {
            probe_delay: Some(Duration::from_secs(5)),
            ..Default::default()
        };

        let report = scraper(Arc::new(fake))
            .deadline(Some(Duration::from_millis(50)))
            .build()
            .unwrap()
            .scrape()
            .await;

        assert!(!report.up);
        assert_eq!(report.failures[0].stage, ScrapeStage::Deadline);
        assert!(report.elapsed < Duration::from_secs(5));
    }

    #[test]
    fn test_builder_requires_api() {
        assert!(ScraperBuilder::new().build().is_err());
    }
}

mod fleet_tests {
    use super::*;

    #[tokio::test]
    async fn test_fleet_counts_every_agent() {
        let mut disabled = windows_agent(4, "Windows");
        disabled.enabled = false;
        disabled.authorized = false;
        disabled.connected = false;

        let mut fake = FakeTeamCity::default().with_tree(&[("P1", "P2"), ("P2", ROOT_PROJECT_ID)]);
        fake.agents = Some(vec![
            linux_agent(1, "Linux"),
            linux_agent(2, "Linux"),
            linux_agent(3, "Linux"),
            disabled,
            agent(5, "", &[]),
        ]);
        fake.running = vec![running(100, 3, "P1")];

        let report = scraper(Arc::new(fake)).build().unwrap().scrape().await;
        let fleet = report.fleet.expect("fleet table");

        assert_eq!(fleet.total(), 5);

        let idle_linux = FleetKey {
            pool: "Linux".to_string(),
            os: AgentOs::Linux,
            enabled: true,
            authorized: true,
            connected: true,
            project: String::new(),
            busy: false,
        };
        assert_eq!(fleet.get(&idle_linux), 2);

        let busy_linux = FleetKey {
            project: "P2".to_string(),
            busy: true,
            ..idle_linux.clone()
        };
        assert_eq!(fleet.get(&busy_linux), 1);

        let offline_windows = FleetKey {
            pool: "Windows".to_string(),
            os: AgentOs::Windows,
            enabled: false,
            authorized: false,
            connected: false,
            project: String::new(),
            busy: false,
        };
        assert_eq!(fleet.get(&offline_windows), 1);

        let unpooled = FleetKey {
            pool: DEFAULT_POOL.to_string(),
            os: AgentOs::Other,
            ..idle_linux
        };
        assert_eq!(fleet.get(&unpooled), 1);
    }

    #[tokio::test]
    async fn test_unresolvable_running_project_still_counts_agent() {
        let mut fake = FakeTeamCity::default();
        fake.agents = Some(vec![linux_agent(1, "Linux")]);
        fake.running = vec![running(100, 1, "Vanished")];

        let report = scraper(Arc::new(fake)).build().unwrap().scrape().await;
        let fleet = report.fleet.as_ref().expect("fleet table");

        assert_eq!(fleet.total(), 1);
        let (key, _) = fleet.iter().next().unwrap();
        assert!(key.busy);
        assert_eq!(key.project, "");
        assert_eq!(report.failures[0].stage, ScrapeStage::AgentProject);
        assert_eq!(report.skipped_builds(), 0);
    }

    #[tokio::test]
    async fn test_fleet_and_queue_share_memo() {
        let mut fake = FakeTeamCity::default().with_tree(&[("P1", "P2"), ("P2", ROOT_PROJECT_ID)]);
        fake.queue = vec![queued(1, "Waiting", "P1")];
        fake.compatible.insert(1, vec![linux_agent(1, "Default")]);
        fake.agents = Some(vec![linux_agent(2, "Default")]);
        fake.running = vec![running(100, 2, "P1")];
        let fake = Arc::new(fake);

        scraper(fake.clone()).build().unwrap().scrape().await;

        assert_eq!(fake.project_fetches("P1"), 1);
        assert_eq!(fake.project_fetches("P2"), 1);
    }

    #[tokio::test]
    async fn test_agents_failure_leaves_queue_intact() {
        let mut fake = FakeTeamCity::default().with_tree(&[("P1", ROOT_PROJECT_ID)]);
        fake.queue = vec![queued(1, "Waiting", "P1")];
        fake.compatible.insert(1, vec![linux_agent(1, "Default")]);
        fake.agents = None;

        let report = scraper(Arc::new(fake)).build().unwrap().scrape().await;

        assert_eq!(report.queue.len(), 1);
        assert!(report.fleet.is_none());
        assert_eq!(report.failures[0].stage, ScrapeStage::Agents);
    }

    #[tokio::test]
    async fn test_fleet_disabled_skips_agent_fetch() {
        let fake = Arc::new(FakeTeamCity {
            agents: Some(vec![linux_agent(1, "Default")]),
            ..Default::default()
        });

        let report = scraper(fake.clone())
            .fleet_metrics(false)
            .build()
            .unwrap()
            .scrape()
            .await;

        assert!(report.fleet.is_none());
        assert_eq!(fake.agents_calls.load(Ordering::SeqCst), 0);
    }
}

mod end_to_end_tests {
    use super::*;
    use crate::client::{Credentials, TeamCityClient};
    use crate::emitter::{MetricDescriptors, ObservationEmitter};
    use mockito::{Matcher, Server};
    use url::Url;

    fn credentials() -> Credentials {
        Credentials {
            login: "exporter".to_string(),
            password: "secret".to_string(),
        }
    }

    async fn mock_json(server: &mut Server, path: Matcher, body: &str) -> mockito::Mock {
        server
            .mock("GET", path)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body)
            .create_async()
            .await
    }

    #[tokio::test]
    async fn test_scrape_through_http_client() {
        let mut server = Server::new_async().await;
        mock_json(&mut server, Matcher::Exact("/app/rest/server".into()), r#"{"version": "2023.11"}"#).await;
        mock_json(
            &mut server,
            Matcher::Regex(r"^/app/rest/buildQueue\?".into()),
            r#"{"count": 1, "build": [{"id": 42, "waitReason": "No agents available: none online",
                "buildType": {"id": "P1_Build", "projectId": "P1"}}]}"#,
        )
        .await;
        let p1 = mock_json(
            &mut server,
            Matcher::Exact("/app/rest/projects/id:P1".into()),
            r#"{"id": "P1", "parentProjectId": "P2"}"#,
        )
        .await;
        mock_json(
            &mut server,
            Matcher::Exact("/app/rest/projects/id:P2".into()),
            r#"{"id": "P2", "parentProjectId": "_Root"}"#,
        )
        .await;
        mock_json(
            &mut server,
            Matcher::Regex(r"^/app/rest/agents\?locator=compatible".into()),
            r#"{"agent": [{"id": 1, "name": "linux-01", "pool": {"id": 0, "name": "Default"},
                "properties": {"property": [{"name": "teamcity.agent.jvm.os.name", "value": "Linux"}]}}]}"#,
        )
        .await;
        mock_json(
            &mut server,
            Matcher::Regex(r"^/app/rest/agents\?locator=defaultFilter".into()),
            r#"{"agent": [
                {"id": 1, "name": "linux-01", "enabled": true, "authorized": true, "connected": true,
                 "pool": {"id": 0, "name": "Default"},
                 "properties": {"property": [{"name": "system.agent.linux.version", "value": "6.1"}]}},
                {"id": 2, "name": "win-01", "enabled": true, "authorized": true, "connected": true,
                 "pool": {"id": 1, "name": ""},
                 "properties": {"property": [{"name": "system.agent.windows.version", "value": "10"}]}}
            ]}"#,
        )
        .await;
        mock_json(
            &mut server,
            Matcher::Regex(r"^/app/rest/builds\?".into()),
            r#"{"build": [{"id": 7, "buildType": {"id": "P1_Build", "projectId": "P1"}, "agent": {"id": 2}}]}"#,
        )
        .await;

        let client = TeamCityClient::new(Url::parse(&server.url()).unwrap(), credentials()).unwrap();
        let report = ScraperBuilder::new()
            .api(Arc::new(client))
            .build()
            .unwrap()
            .scrape()
            .await;

        assert!(report.is_complete(), "failures: {:?}", report.failures);
        let key = QueueKey {
            reason: "No agents available".to_string(),
            project: "P2".to_string(),
            build_id: 42,
            pool: "Default".to_string(),
            os: linux_only(),
        };
        assert_eq!(report.queue.get(&key), 1);
        assert_eq!(report.queue.len(), 1);

        let fleet = report.fleet.as_ref().unwrap();
        assert_eq!(fleet.total(), 2);
        let busy_windows = FleetKey {
            pool: "Default".to_string(),
            os: AgentOs::Windows,
            enabled: true,
            authorized: true,
            connected: true,
            project: "P2".to_string(),
            busy: true,
        };
        assert_eq!(fleet.get(&busy_windows), 1);

        // P1 was memoized from the queue fold
        p1.assert_async().await;
    }

    #[tokio::test]
    async fn test_connection_refused_emits_only_down() {
        let client = TeamCityClient::with_timeout(
            Url::parse("http://127.0.0.1:9/").unwrap(),
            credentials(),
            Duration::from_secs(1),
        )
        .unwrap();

        let report = ScraperBuilder::new()
            .api(Arc::new(client))
            .build()
            .unwrap()
            .scrape()
            .await;

        assert!(!report.up);
        assert!(report.queue.is_empty());
        assert!(report.fleet.is_none());

        let families = ObservationEmitter::new(MetricDescriptors::new(true))
            .emit(&report)
            .unwrap();
        assert_eq!(families.len(), 1);
        assert_eq!(families[0].get_name(), "teamcity_up");
        assert_eq!(families[0].get_metric()[0].get_gauge().get_value(), 0.0);
    }
}
