//! Convergence oracle.
//!
//! Polls every replica of a group and decides whether they agree, using the
//! equality that fits the CRDT kind: exact values for counters and registers,
//! set equality for the set types. A replica that could not be read always
//! counts as disagreement.

use std::sync::Arc;

use serde::Serialize;

use crate::{
    kind::CrdtKind,
    replica::{Checkpoint, ReplicaClient, ReplicaEndpoint, ReplicaError, StateSnapshot, Value},
};

/// Whether a group's snapshots agreed at one checkpoint.
#[derive(Debug, Clone, Serialize)]
pub struct ConvergenceVerdict {
    pub kind: CrdtKind,
    pub checkpoint: Checkpoint,
    pub equal: bool,
    pub snapshots: Vec<StateSnapshot>,
}

impl ConvergenceVerdict {
    /// The value every replica agreed on, when they did.
    pub fn agreed_value(&self) -> Option<&Value> {
        if self.equal {
            self.snapshots.first().map(|s| &s.value)
        } else {
            None
        }
    }

    /// Replicas whose value could not be observed.
    pub fn missing(&self) -> impl Iterator<Item = &StateSnapshot> {
        self.snapshots.iter().filter(|s| s.value.is_missing())
    }
}

/// Decide whether `snapshots` agree under `kind`'s equality.
///
/// Pure: performs no I/O. An empty snapshot list never counts as converged.
pub fn compute_verdict(kind: CrdtKind, snapshots: Vec<StateSnapshot>) -> ConvergenceVerdict {
    let checkpoint = snapshots
        .first()
        .map(|s| s.checkpoint)
        .unwrap_or(Checkpoint::Probe);
    ConvergenceVerdict {
        kind,
        checkpoint,
        equal: values_agree(kind, snapshots.iter().map(|s| &s.value)),
        snapshots,
    }
}

/// Equality check behind [`compute_verdict`].
pub fn values_agree<'a>(kind: CrdtKind, values: impl IntoIterator<Item = &'a Value>) -> bool {
    let values: Vec<&Value> = values.into_iter().collect();
    let Some(first) = values.first() else {
        return false;
    };
    if values.iter().any(|v| v.is_missing()) {
        return false;
    }

    if kind.is_set() {
        let Some(reference) = first.as_set() else {
            return false;
        };
        values.iter().all(|v| v.as_set().as_ref() == Some(&reference))
    } else {
        values.iter().all(|v| v == first)
    }
}

/// Polls replica groups and computes verdicts.
#[derive(Clone)]
pub struct ConvergenceOracle {
    client: Arc<dyn ReplicaClient>,
}

impl ConvergenceOracle {
    pub fn new(client: Arc<dyn ReplicaClient>) -> Self {
        Self { client }
    }

    /// Read every replica concurrently. Snapshots come back in replica order,
    /// labelled with `checkpoint`; unreadable replicas yield [`Value::Missing`].
    pub async fn poll(
        &self,
        replicas: &[ReplicaEndpoint],
        checkpoint: Checkpoint,
    ) -> Vec<StateSnapshot> {
        let handles: Vec<_> = replicas
            .iter()
            .map(|endpoint| {
                let client = Arc::clone(&self.client);
                let endpoint = endpoint.clone();
                tokio::spawn(async move { client.read(&endpoint).await })
            })
            .collect();

        let mut snapshots = Vec::with_capacity(handles.len());
        for (endpoint, handle) in replicas.iter().zip(handles) {
            let snapshot = match handle.await {
                Ok(snapshot) => snapshot,
                Err(e) => StateSnapshot::from_outcome(
                    endpoint,
                    Err(ReplicaError::TaskFailed {
                        address: endpoint.id().to_string(),
                        reason: e.to_string(),
                    }),
                ),
            };
            snapshots.push(snapshot.at(checkpoint));
        }
        snapshots
    }

    /// Poll `replicas` and compute the verdict for `kind`.
    pub async fn check(
        &self,
        kind: CrdtKind,
        replicas: &[ReplicaEndpoint],
        checkpoint: Checkpoint,
    ) -> ConvergenceVerdict {
        let snapshots = self.poll(replicas, checkpoint).await;
        let verdict = compute_verdict(kind, snapshots);
        tracing::debug!(%kind, %checkpoint, equal = verdict.equal, "Computed verdict");
        verdict
    }
}
