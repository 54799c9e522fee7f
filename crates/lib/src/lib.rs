//!
//! Converge: black-box convergence verification for replicated CRDT services.
//!
//! The harness drives concurrent operations against groups of HTTP replicas,
//! waits for replication to settle, reads every replica back and decides
//! whether they agree.
//!
//! ## Core Concepts
//!
//! * **Replica client (`replica::ReplicaClient`)**: Translates abstract operations into a CRDT type's HTTP contract and decodes responses into typed values. All I/O failure stops here and is recorded, never raised.
//! * **Workload driver (`workload::WorkloadDriver`)**: Fans one operation per replica per step out concurrently, using a per-type selection policy, and joins every task before returning.
//! * **Convergence oracle (`oracle::ConvergenceOracle`)**: Polls replicas and computes verdicts with the equality each type needs: exact values for counters and registers, set equality for sets.
//! * **Scenario runner (`scenario::ScenarioRunner`)**: The step loop, sync waits and final verdict for one replica group.
//! * **Metrics collector (`metrics::MetricsCollector`)**: Sequential operation + read round trips for clean latency figures.
//! * **Configuration (`config::HarnessConfig`)**: Replica groups, contracts and timing, passed explicitly into each scenario.

pub mod config;
pub mod kind;
pub mod metrics;
pub mod oracle;
pub mod replica;
pub mod scenario;
pub mod workload;

pub use config::HarnessConfig;
pub use kind::CrdtKind;
pub use oracle::{ConvergenceOracle, ConvergenceVerdict, compute_verdict};
pub use replica::{
    HttpReplicaClient, Operation, OperationResult, ReplicaClient, ReplicaEndpoint, StateSnapshot,
    Value,
};
pub use scenario::{ScenarioConfig, ScenarioReport, ScenarioRunner};
pub use workload::WorkloadDriver;

/// Result type used throughout the Converge library.
pub type Result<T> = std::result::Result<T, Error>;

/// Common error type for the Converge library.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    /// Structured replica errors from the replica module
    #[error(transparent)]
    Replica(replica::ReplicaError),

    /// Structured configuration errors from the config module
    #[error(transparent)]
    Config(config::ConfigError),

    /// Structured statistics errors from the metrics module
    #[error(transparent)]
    Metrics(metrics::MetricsError),
}

impl Error {
    /// Get the originating module for this error.
    pub fn module(&self) -> &'static str {
        match self {
            Error::Http(_) => "http",
            Error::Replica(_) => "replica",
            Error::Config(_) => "config",
            Error::Metrics(_) => "metrics",
        }
    }

    /// Check if this error is a transport failure talking to a replica.
    pub fn is_transport_failure(&self) -> bool {
        match self {
            Error::Http(_) => true,
            Error::Replica(e) => e.is_transport_failure(),
            _ => false,
        }
    }

    /// Check if this error is configuration-related.
    pub fn is_config_error(&self) -> bool {
        matches!(self, Error::Config(_))
    }
}
