//! Replica client adapter.
//!
//! This module translates abstract CRDT operations into a replica's HTTP
//! contract and decodes what the replica reports back into typed values.
//! It is the boundary where all I/O failure is absorbed: [`ReplicaClient::perform`]
//! and [`ReplicaClient::read`] always return a result value, recording failures
//! instead of raising them.

use std::{
    collections::BTreeSet,
    fmt,
    time::{Duration, Instant},
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::kind::CrdtKind;

pub mod contract;
pub mod decode;
pub mod errors;
pub mod http;

pub use contract::{ContractProfile, Method, Payload, ReplicaContract, ResponseEncoding, Route};
pub use errors::{FailureClass, ReplicaError};
pub use http::HttpReplicaClient;

/// A replica's base address and the CRDT type it serves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplicaEndpoint {
    pub base: Url,
    pub kind: CrdtKind,
}

impl ReplicaEndpoint {
    pub fn new(base: Url, kind: CrdtKind) -> Self {
        Self { base, kind }
    }

    /// Parse `base` and build an endpoint for `kind`.
    pub fn parse(base: &str, kind: CrdtKind) -> Result<Self, url::ParseError> {
        Ok(Self::new(Url::parse(base)?, kind))
    }

    /// Identifier used in logs, snapshots and reports.
    pub fn id(&self) -> &str {
        self.base.as_str().trim_end_matches('/')
    }

    /// Full URL for a route path on this replica.
    pub fn url_for(&self, path: &str) -> String {
        format!("{}/{}", self.id(), path.trim_start_matches('/'))
    }
}

impl fmt::Display for ReplicaEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.id(), self.kind)
    }
}

/// An abstract mutating operation against one replica.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "op", content = "arg", rename_all = "kebab-case")]
pub enum Operation {
    Increment,
    Decrement,
    Add(String),
    Remove(String),
    Set(String),
    /// Policy fallback that touches no replica (remove against an empty set).
    Noop,
}

impl Operation {
    /// Route name for this operation.
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Increment => "increment",
            Operation::Decrement => "decrement",
            Operation::Add(_) => "add",
            Operation::Remove(_) => "remove",
            Operation::Set(_) => "set",
            Operation::Noop => "noop",
        }
    }

    /// The element or value carried by the operation, if any.
    pub fn argument(&self) -> Option<&str> {
        match self {
            Operation::Add(v) | Operation::Remove(v) | Operation::Set(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.argument() {
            Some(arg) => write!(f, "{}({arg})", self.name()),
            None => f.write_str(self.name()),
        }
    }
}

/// The record of one dispatched operation.
#[derive(Debug, Clone)]
pub struct OperationResult {
    pub operation: Operation,
    pub replica: String,
    pub latency: Duration,
    pub outcome: Result<(), ReplicaError>,
    /// Set when the read that chose the operation failed.
    pub read_error: Option<ReplicaError>,
}

impl OperationResult {
    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }

    /// Whether the operation, or the read that chose it, failed.
    pub fn has_failure(&self) -> bool {
        self.outcome.is_err() || self.read_error.is_some()
    }

    /// Failure class, when the operation or its read failed.
    pub fn failure(&self) -> Option<FailureClass> {
        self.outcome
            .as_ref()
            .err()
            .or(self.read_error.as_ref())
            .map(ReplicaError::class)
    }
}

/// An externally observed replica value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "kebab-case")]
pub enum Value {
    Scalar(i64),
    Text(String),
    /// The raw sequence a set replica reported, before deduplication.
    SetOf(Vec<String>),
    /// The replica could not be read or its response did not decode.
    Missing,
}

impl Value {
    pub fn is_missing(&self) -> bool {
        matches!(self, Value::Missing)
    }

    pub fn as_scalar(&self) -> Option<i64> {
        match self {
            Value::Scalar(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Elements as a set, ignoring order and duplicates.
    pub fn as_set(&self) -> Option<BTreeSet<&str>> {
        match self {
            Value::SetOf(items) => Some(items.iter().map(String::as_str).collect()),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Scalar(n) => write!(f, "{n}"),
            Value::Text(s) => write!(f, "{s:?}"),
            Value::SetOf(items) => {
                let set: BTreeSet<&String> = items.iter().collect();
                let joined: Vec<&str> = set.into_iter().map(String::as_str).collect();
                write!(f, "{{{}}}", joined.join(", "))
            }
            Value::Missing => f.write_str("<missing>"),
        }
    }
}

/// Where in a run a snapshot was taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Checkpoint {
    /// After the dispatch and join of step `n` (1-based).
    Step(usize),
    /// After the settle wait.
    Final,
    /// A read outside the step loop (policy pre-reads, benchmarks).
    Probe,
}

impl fmt::Display for Checkpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Checkpoint::Step(n) => write!(f, "step {n}"),
            Checkpoint::Final => f.write_str("final"),
            Checkpoint::Probe => f.write_str("probe"),
        }
    }
}

/// One replica's observed state at a point in time.
#[derive(Debug, Clone, Serialize)]
pub struct StateSnapshot {
    pub replica: String,
    pub checkpoint: Checkpoint,
    pub timestamp: DateTime<Utc>,
    pub value: Value,
    /// Why the value is [`Value::Missing`], when it is.
    #[serde(skip)]
    pub error: Option<ReplicaError>,
}

impl StateSnapshot {
    pub(crate) fn from_outcome(
        endpoint: &ReplicaEndpoint,
        outcome: Result<Value, ReplicaError>,
    ) -> Self {
        let (value, error) = match outcome {
            Ok(value) => (value, None),
            Err(e) => (Value::Missing, Some(e)),
        };
        Self {
            replica: endpoint.id().to_string(),
            checkpoint: Checkpoint::Probe,
            timestamp: Utc::now(),
            value,
            error,
        }
    }

    /// Re-label this snapshot with the checkpoint it was polled for.
    pub fn at(mut self, checkpoint: Checkpoint) -> Self {
        self.checkpoint = checkpoint;
        self
    }
}

/// Adapter between abstract operations and a replica's wire contract.
///
/// Implementors provide the raw [`send`](ReplicaClient::send) and
/// [`fetch`](ReplicaClient::fetch) calls; the provided [`perform`](ReplicaClient::perform)
/// and [`read`](ReplicaClient::read) wrap them with timing, logging and the
/// conversion of failures into recorded outcomes.
#[async_trait]
pub trait ReplicaClient: Send + Sync {
    /// Send one mutating operation to a replica.
    async fn send(&self, endpoint: &ReplicaEndpoint, operation: &Operation)
    -> Result<(), ReplicaError>;

    /// Fetch and decode a replica's current value.
    async fn fetch(&self, endpoint: &ReplicaEndpoint) -> Result<Value, ReplicaError>;

    /// Perform an operation, recording its latency and outcome.
    ///
    /// [`Operation::Noop`] completes immediately without touching the replica.
    async fn perform(&self, endpoint: &ReplicaEndpoint, operation: Operation) -> OperationResult {
        let start = Instant::now();
        let outcome = match operation {
            Operation::Noop => Ok(()),
            ref op => self.send(endpoint, op).await,
        };
        let latency = start.elapsed();

        match &outcome {
            Ok(()) => tracing::debug!(
                replica = endpoint.id(),
                kind = %endpoint.kind,
                op = %operation,
                latency_ms = latency.as_millis() as u64,
                "Operation completed"
            ),
            Err(e) => tracing::warn!(
                replica = endpoint.id(),
                kind = %endpoint.kind,
                op = %operation,
                "Operation failed: {e}"
            ),
        }

        OperationResult {
            operation,
            replica: endpoint.id().to_string(),
            latency,
            outcome,
            read_error: None,
        }
    }

    /// Read a replica's state. Failures yield a [`Value::Missing`] snapshot.
    async fn read(&self, endpoint: &ReplicaEndpoint) -> StateSnapshot {
        let outcome = self.fetch(endpoint).await;
        match &outcome {
            Ok(value) => tracing::debug!(replica = endpoint.id(), %value, "Read replica state"),
            Err(e) => tracing::warn!(replica = endpoint.id(), "Failed to read replica state: {e}"),
        }
        StateSnapshot::from_outcome(endpoint, outcome)
    }
}
