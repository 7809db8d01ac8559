//! Frequency tables keyed by composite classification records

use crate::models::{Agent, Properties};
use std::collections::HashMap;
use std::hash::Hash;

/// Queue table label names, in emission order
pub const QUEUE_LABELS: [&str; 4] = ["reason", "project", "buildId", "pool"];

/// Extra queue table labels when OS availability is tracked
pub const QUEUE_OS_LABELS: [&str; 3] = ["winOk", "linOk", "macOk"];

/// Fleet table label names, in emission order
pub const FLEET_LABELS: [&str; 7] = [
    "pool",
    "os",
    "enabled",
    "authorized",
    "connected",
    "project",
    "busy",
];

/// A composite key that can be rendered as an ordered label tuple
pub trait TableKey: Clone + Eq + Hash {
    /// Label values in the table's declared label order
    fn label_values(&self) -> Vec<String>;
}

/// One emitted leaf: label values and their count
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation {
    pub labels: Vec<String>,
    pub value: u64,
}

/// Flat map from composite key to count
#[derive(Debug, Clone)]
pub struct FrequencyTable<K> {
    counts: HashMap<K, u64>,
}

impl<K> Default for FrequencyTable<K> {
    fn default() -> Self {
        Self {
            counts: HashMap::new(),
        }
    }
}

impl<K: TableKey> FrequencyTable<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `key` occurred at all; repeated marks keep the value at 1
    pub fn mark(&mut self, key: K) {
        self.counts.insert(key, 1);
    }

    /// Add one occurrence of `key`
    pub fn increment(&mut self, key: K) {
        *self.counts.entry(key).or_insert(0) += 1;
    }

    /// Count stored for `key`, 0 when absent
    pub fn get(&self, key: &K) -> u64 {
        self.counts.get(key).copied().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Sum of every leaf
    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, u64)> {
        self.counts.iter().map(|(k, v)| (k, *v))
    }

    /// One observation per leaf, in no particular order
    pub fn observations(&self) -> impl Iterator<Item = Observation> + '_ {
        self.counts.iter().map(|(key, value)| Observation {
            labels: key.label_values(),
            value: *value,
        })
    }
}

fn flag(value: bool) -> String {
    value.to_string()
}

/// Operating systems available among a build's compatible agents
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct OsAvailability {
    pub windows: bool,
    pub linux: bool,
    pub mac: bool,
}

impl OsAvailability {
    /// Fold the OS name property of every agent in the set
    pub fn from_agents(agents: &[Agent]) -> Self {
        agents.iter().fold(Self::default(), |acc, agent| {
            let os = agent.os_name();
            Self {
                windows: acc.windows || os.contains("Windows"),
                linux: acc.linux || os.contains("Linux"),
                mac: acc.mac || os.contains("Mac"),
            }
        })
    }
}

/// Queue table key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueueKey {
    pub reason: String,
    pub project: String,
    pub build_id: i64,
    pub pool: String,
    /// Present when the table tracks OS availability
    pub os: Option<OsAvailability>,
}

impl QueueKey {
    /// Label names matching [`TableKey::label_values`] for the chosen variant
    pub fn label_names(os_flags: bool) -> Vec<&'static str> {
        let mut names = QUEUE_LABELS.to_vec();
        if os_flags {
            names.extend(QUEUE_OS_LABELS);
        }
        names
    }
}

impl TableKey for QueueKey {
    fn label_values(&self) -> Vec<String> {
        let mut values = vec![
            self.reason.clone(),
            self.project.clone(),
            self.build_id.to_string(),
            self.pool.clone(),
        ];
        if let Some(os) = self.os {
            values.extend([flag(os.windows), flag(os.linux), flag(os.mac)]);
        }
        values
    }
}

/// Operating system inferred from agent properties
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AgentOs {
    Windows,
    Linux,
    Other,
}

impl AgentOs {
    /// First match wins: a Windows version property beats a Linux one
    pub fn infer(properties: &Properties) -> Self {
        if properties.has_name_ending_with("windows.version") {
            AgentOs::Windows
        } else if properties.has_name_ending_with("linux.version") {
            AgentOs::Linux
        } else {
            AgentOs::Other
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AgentOs::Windows => "Windows",
            AgentOs::Linux => "Linux",
            AgentOs::Other => "Other",
        }
    }
}

/// Fleet table key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FleetKey {
    pub pool: String,
    pub os: AgentOs,
    pub enabled: bool,
    pub authorized: bool,
    pub connected: bool,
    /// Top project of the running build, empty when idle
    pub project: String,
    pub busy: bool,
}

impl TableKey for FleetKey {
    fn label_values(&self) -> Vec<String> {
        vec![
            self.pool.clone(),
            self.os.as_str().to_string(),
            flag(self.enabled),
            flag(self.authorized),
            flag(self.connected),
            self.project.clone(),
            flag(self.busy),
        ]
    }
}
