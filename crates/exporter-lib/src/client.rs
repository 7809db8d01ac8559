//! TeamCity REST API client
//!
//! Every logical resource is one authenticated GET whose JSON body is decoded
//! into a typed document. There are no retries; a timeout or a non-200
//! status fails the call.

use crate::models::{AgentList, BuildQueue, Project, QueuedBuild, RunningBuilds, ServerInfo};
use async_trait::async_trait;
use reqwest::{header::ACCEPT, Client, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;
use url::Url;

/// Default per-request timeout
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Errors raised while talking to the TeamCity API
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid route {route}: {source}")]
    Route {
        route: String,
        #[source]
        source: url::ParseError,
    },

    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("error requesting url: {url} ({status})")]
    Status { url: String, status: String },

    #[error("failed to decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("project ancestry of {project} loops back on itself")]
    AncestryCycle { project: String },
}

impl ApiError {
    /// True when the upstream could not be reached or did not answer in time
    pub fn is_connectivity(&self) -> bool {
        matches!(self, ApiError::Transport { .. })
    }
}

/// Relative routes of the consumed resources
pub mod routes {
    pub const SERVER: &str = "app/rest/server";

    pub const BUILD_QUEUE: &str = "app/rest/buildQueue?fields=count,href,build(id,waitReason,href,buildType(id,href,name,projectName,projectId))";

    pub const ALL_AGENTS: &str = "app/rest/agents?locator=defaultFilter:false&fields=agent(id,name,href,enabled,authorized,connected,pool(id,name),properties(property(name,value)))";

    pub const RUNNING_BUILDS: &str = "app/rest/builds?locator=running:true,defaultFilter:false&fields=build(id,buildType(id,projectId),agent(id,name))";

    pub fn queued_build(id: i64) -> String {
        format!("app/rest/buildQueue/id:{}", id)
    }

    pub fn compatible_agents(build_id: i64) -> String {
        format!(
            "app/rest/agents?locator=compatible:(build:(id:{}))&fields=agent(id,name,href,pool(id,name),properties(property(name,value)))",
            build_id
        )
    }

    pub fn project(id: &str) -> String {
        format!("app/rest/projects/id:{}", id)
    }
}

/// Read-only view of the TeamCity resources a scrape needs
#[async_trait]
pub trait CiApi: Send + Sync {
    /// Server information (reachability probe)
    async fn server_info(&self) -> Result<ServerInfo, ApiError>;

    /// Build queue with inlined build types
    async fn build_queue(&self) -> Result<BuildQueue, ApiError>;

    /// Detail of a single queued build
    async fn queued_build(&self, id: i64) -> Result<QueuedBuild, ApiError>;

    /// Agents able to run the given queued build
    async fn compatible_agents(&self, build_id: i64) -> Result<AgentList, ApiError>;

    /// Project detail including its parent id
    async fn project(&self, id: &str) -> Result<Project, ApiError>;

    /// Every agent, including disabled and unauthorized ones
    async fn agents(&self) -> Result<AgentList, ApiError>;

    /// Builds currently running
    async fn running_builds(&self) -> Result<RunningBuilds, ApiError>;
}

/// Basic-auth credentials for the REST API
#[derive(Clone)]
pub struct Credentials {
    pub login: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("login", &self.login)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// HTTP client for the TeamCity REST API
pub struct TeamCityClient {
    client: Client,
    base_url: Url,
    credentials: Credentials,
}

impl TeamCityClient {
    /// Create a new client with the default request timeout
    pub fn new(base_url: Url, credentials: Credentials) -> Result<Self, ApiError> {
        Self::with_timeout(base_url, credentials, DEFAULT_REQUEST_TIMEOUT)
    }

    /// Create a new client with an explicit request timeout
    pub fn with_timeout(
        mut base_url: Url,
        credentials: Credentials,
        timeout: Duration,
    ) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|source| ApiError::Transport {
                url: base_url.to_string(),
                source,
            })?;

        // Routes are joined relative to the base, so keep its last segment
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self {
            client,
            base_url,
            credentials,
        })
    }

    /// Base URL routes are resolved against
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// GET a route and decode its JSON body
    pub async fn fetch<T: DeserializeOwned>(&self, route: &str) -> Result<T, ApiError> {
        let url = self
            .base_url
            .join(route)
            .map_err(|source| ApiError::Route {
                route: route.to_string(),
                source,
            })?;
        debug!(url = %url, "Requesting TeamCity endpoint");

        let response = self
            .client
            .get(url.clone())
            .header(ACCEPT, "application/json")
            .basic_auth(&self.credentials.login, Some(&self.credentials.password))
            .send()
            .await
            .map_err(|source| ApiError::Transport {
                url: url.to_string(),
                source,
            })?;

        if response.status() != StatusCode::OK {
            return Err(ApiError::Status {
                url: url.to_string(),
                status: response.status().to_string(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|source| ApiError::Transport {
                url: url.to_string(),
                source,
            })?;

        serde_json::from_slice(&body).map_err(|source| ApiError::Decode {
            url: url.to_string(),
            source,
        })
    }
}

#[async_trait]
impl CiApi for TeamCityClient {
    async fn server_info(&self) -> Result<ServerInfo, ApiError> {
        self.fetch(routes::SERVER).await
    }

    async fn build_queue(&self) -> Result<BuildQueue, ApiError> {
        self.fetch(routes::BUILD_QUEUE).await
    }

    async fn queued_build(&self, id: i64) -> Result<QueuedBuild, ApiError> {
        self.fetch(&routes::queued_build(id)).await
    }

    async fn compatible_agents(&self, build_id: i64) -> Result<AgentList, ApiError> {
        self.fetch(&routes::compatible_agents(build_id)).await
    }

    async fn project(&self, id: &str) -> Result<Project, ApiError> {
        self.fetch(&routes::project(id)).await
    }

    async fn agents(&self) -> Result<AgentList, ApiError> {
        self.fetch(routes::ALL_AGENTS).await
    }

    async fn running_builds(&self) -> Result<RunningBuilds, ApiError> {
        self.fetch(routes::RUNNING_BUILDS).await
    }
}
