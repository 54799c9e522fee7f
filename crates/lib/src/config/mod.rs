//! Harness configuration.
//!
//! Configuration is a plain value, loaded once from a JSON file (or taken from
//! [`HarnessConfig::default`]) and handed to the pieces that need it. Nothing
//! here is global: each scenario receives its own [`ScenarioConfig`].

use std::{collections::HashSet, path::Path, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{
    kind::CrdtKind,
    replica::{ContractProfile, HttpReplicaClient, ReplicaContract, ReplicaEndpoint},
    scenario::{DEFAULT_SETTLE_FACTOR, DEFAULT_STEPS, ScenarioConfig},
};

pub mod errors;

pub use errors::ConfigError;

/// One group of replicas serving the same CRDT kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupConfig {
    pub kind: CrdtKind,
    /// Built-in contract family to use.
    #[serde(default)]
    pub profile: ContractProfile,
    /// Full contract override; takes precedence over `profile`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract: Option<ReplicaContract>,
    /// Replica base URLs.
    pub replicas: Vec<String>,
}

impl GroupConfig {
    pub fn new(kind: CrdtKind, replicas: &[&str]) -> Self {
        Self {
            kind,
            profile: ContractProfile::default(),
            contract: None,
            replicas: replicas.iter().map(|r| r.to_string()).collect(),
        }
    }

    /// The contract in force for this group.
    pub fn contract(&self) -> ReplicaContract {
        self.contract
            .clone()
            .unwrap_or_else(|| ReplicaContract::for_profile(self.kind, self.profile))
    }

    /// Parse every replica address.
    pub fn endpoints(&self) -> Result<Vec<ReplicaEndpoint>, ConfigError> {
        self.replicas
            .iter()
            .map(|address| {
                ReplicaEndpoint::parse(address, self.kind).map_err(|e| {
                    ConfigError::InvalidAddress {
                        address: address.clone(),
                        reason: e.to_string(),
                    }
                })
            })
            .collect()
    }
}

/// Step loop settings shared by every scenario.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioSettings {
    pub steps: usize,
    pub step_delay_ms: u64,
    /// The settle wait is `settle_factor` step delays.
    pub settle_factor: u32,
    pub poll_each_step: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl Default for ScenarioSettings {
    fn default() -> Self {
        Self {
            steps: DEFAULT_STEPS,
            step_delay_ms: 1000,
            settle_factor: DEFAULT_SETTLE_FACTOR,
            poll_each_step: true,
            seed: None,
        }
    }
}

/// Sequential benchmark settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BenchSettings {
    pub ops: usize,
}

impl Default for BenchSettings {
    fn default() -> Self {
        Self { ops: 100 }
    }
}

/// Top-level harness configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    pub groups: Vec<GroupConfig>,
    pub scenario: ScenarioSettings,
    pub bench: BenchSettings,
    pub request_timeout_ms: u64,
}

impl Default for HarnessConfig {
    /// Two replicas per kind on consecutive local ports starting at 8081.
    fn default() -> Self {
        let groups = CrdtKind::ALL
            .iter()
            .enumerate()
            .map(|(i, kind)| {
                let first = 8081 + 2 * i;
                let a = format!("http://localhost:{first}");
                let b = format!("http://localhost:{}", first + 1);
                GroupConfig::new(*kind, &[a.as_str(), b.as_str()])
            })
            .collect();
        Self {
            groups,
            scenario: ScenarioSettings::default(),
            bench: BenchSettings::default(),
            request_timeout_ms: 5000,
        }
    }
}

impl HarnessConfig {
    /// Read, parse and validate a JSON configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        tracing::debug!(path = %path.display(), groups = config.groups.len(), "Loaded config");
        Ok(config)
    }

    /// Check every group: unique kinds, non-empty, parsable addresses and a
    /// contract able to carry the kind's workload.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for group in &self.groups {
            if !seen.insert(group.kind) {
                return Err(ConfigError::DuplicateGroup { kind: group.kind });
            }
            if group.replicas.is_empty() {
                return Err(ConfigError::EmptyGroup { kind: group.kind });
            }
            group.endpoints()?;
            let problems = group.contract().problems(group.kind);
            if !problems.is_empty() {
                return Err(ConfigError::InvalidContract {
                    kind: group.kind,
                    problems,
                });
            }
        }
        Ok(())
    }

    /// The group serving `kind`.
    pub fn group(&self, kind: CrdtKind) -> Result<&GroupConfig, ConfigError> {
        self.groups
            .iter()
            .find(|g| g.kind == kind)
            .ok_or(ConfigError::MissingGroup { kind })
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn step_delay(&self) -> Duration {
        Duration::from_millis(self.scenario.step_delay_ms)
    }

    /// Build an HTTP client carrying every group's contract.
    pub fn client(&self) -> crate::Result<HttpReplicaClient> {
        let client = self
            .groups
            .iter()
            .fold(HttpReplicaClient::new(self.request_timeout())?, |client, g| {
                client.with_contract(g.kind, g.contract())
            });
        Ok(client)
    }

    /// Scenario configuration for the group serving `kind`.
    pub fn scenario(&self, kind: CrdtKind) -> Result<ScenarioConfig, ConfigError> {
        let group = self.group(kind)?;
        let settings = &self.scenario;
        let mut config = ScenarioConfig::new(kind, group.endpoints()?)
            .with_steps(settings.steps)
            .with_delays(self.step_delay(), settings.settle_factor)
            .with_step_polls(settings.poll_each_step);
        if let Some(seed) = settings.seed {
            config = config.with_seed(seed);
        }
        Ok(config)
    }
}
