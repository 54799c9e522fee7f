//! Workload driver.
//!
//! The driver fans one task per replica out onto the tokio runtime for every
//! step, then joins all of them before returning. Tasks share nothing but the
//! client and their own endpoint; each returns its own [`OperationResult`],
//! so a failing or panicking task costs only its own slot.

use std::sync::Arc;

use rand::{SeedableRng, rngs::StdRng};
use tokio::task::JoinHandle;

use crate::{
    kind::CrdtKind,
    replica::{Operation, OperationResult, ReplicaClient, ReplicaEndpoint, ReplicaError},
};

pub mod policy;

pub use policy::PlannedTask;

/// Dispatches concurrent, type-specific operations against replica groups.
pub struct WorkloadDriver {
    client: Arc<dyn ReplicaClient>,
    rng: StdRng,
}

impl WorkloadDriver {
    /// Create a driver. A `seed` makes the operation mix reproducible.
    pub fn new(client: Arc<dyn ReplicaClient>, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self { client, rng }
    }

    /// Run one step: one concurrent task per targeted replica, all joined.
    ///
    /// The returned results are in replica order, one per task.
    pub async fn run_step(
        &mut self,
        kind: CrdtKind,
        replicas: &[ReplicaEndpoint],
        step: usize,
    ) -> Vec<OperationResult> {
        let plan = policy::plan_step(kind, replicas.len(), &mut self.rng);
        tracing::debug!(%kind, step, tasks = plan.len(), "Dispatching step");

        let handles: Vec<Pending> = plan
            .into_iter()
            .map(|(index, task)| {
                let endpoint = replicas[index].clone();
                let operation = task.operation().unwrap_or(Operation::Noop);
                let client = Arc::clone(&self.client);
                let task_endpoint = endpoint.clone();
                let handle =
                    tokio::spawn(async move { execute(&*client, &task_endpoint, task).await });
                Pending {
                    endpoint,
                    operation,
                    handle,
                }
            })
            .collect();

        join_all(handles).await
    }

    /// Send `ops_per_replica` operations to every targeted replica.
    ///
    /// Operations to one replica are issued back-to-back; replicas proceed
    /// concurrently. Results are grouped by replica, in issue order.
    pub async fn run_burst(
        &mut self,
        kind: CrdtKind,
        replicas: &[ReplicaEndpoint],
        ops_per_replica: usize,
    ) -> Vec<OperationResult> {
        let mut queues: Vec<Vec<PlannedTask>> = vec![Vec::new(); replicas.len()];
        for _ in 0..ops_per_replica {
            for (index, task) in policy::plan_step(kind, replicas.len(), &mut self.rng) {
                queues[index].push(task);
            }
        }
        tracing::debug!(%kind, ops_per_replica, replicas = replicas.len(), "Dispatching burst");

        let handles: Vec<PendingQueue> = queues
            .into_iter()
            .zip(replicas)
            .filter(|(queue, _)| !queue.is_empty())
            .map(|(queue, endpoint)| {
                let operations = queue
                    .iter()
                    .map(|task| task.operation().unwrap_or(Operation::Noop))
                    .collect();
                let client = Arc::clone(&self.client);
                let task_endpoint = endpoint.clone();
                let handle = tokio::spawn(async move {
                    let mut results = Vec::with_capacity(queue.len());
                    for task in queue {
                        results.push(execute(&*client, &task_endpoint, task).await);
                    }
                    results
                });
                PendingQueue {
                    endpoint: endpoint.clone(),
                    operations,
                    handle,
                }
            })
            .collect();

        let mut results = Vec::new();
        for queue in handles {
            match queue.handle.await {
                Ok(batch) => results.extend(batch),
                Err(e) => {
                    let reason = e.to_string();
                    tracing::warn!(
                        replica = queue.endpoint.id(),
                        lost = queue.operations.len(),
                        "Burst task did not complete: {reason}"
                    );
                    results.extend(queue.operations.into_iter().map(|operation| {
                        task_failed_with(&queue.endpoint, operation, reason.clone())
                    }));
                }
            }
        }
        results
    }
}

/// A spawned burst queue and the operations it was sent to issue.
struct PendingQueue {
    endpoint: ReplicaEndpoint,
    operations: Vec<Operation>,
    handle: JoinHandle<Vec<OperationResult>>,
}

/// A spawned step task and what it was sent to do.
struct Pending {
    endpoint: ReplicaEndpoint,
    operation: Operation,
    handle: JoinHandle<OperationResult>,
}

/// Await every task in order, converting join failures into results.
async fn join_all(pending: Vec<Pending>) -> Vec<OperationResult> {
    let mut results = Vec::with_capacity(pending.len());
    for task in pending {
        let result = match task.handle.await {
            Ok(result) => result,
            Err(e) => task_failed(&task.endpoint, task.operation, e),
        };
        results.push(result);
    }
    results
}

fn task_failed(
    endpoint: &ReplicaEndpoint,
    operation: Operation,
    err: tokio::task::JoinError,
) -> OperationResult {
    tracing::warn!(replica = endpoint.id(), "Task did not complete: {err}");
    task_failed_with(endpoint, operation, err.to_string())
}

fn task_failed_with(
    endpoint: &ReplicaEndpoint,
    operation: Operation,
    reason: String,
) -> OperationResult {
    OperationResult {
        operation,
        replica: endpoint.id().to_string(),
        latency: Default::default(),
        outcome: Err(ReplicaError::TaskFailed {
            address: endpoint.id().to_string(),
            reason,
        }),
        read_error: None,
    }
}

/// Carry out one planned task against one replica.
pub async fn execute(
    client: &dyn ReplicaClient,
    endpoint: &ReplicaEndpoint,
    task: PlannedTask,
) -> OperationResult {
    match task {
        PlannedTask::Perform(operation) => client.perform(endpoint, operation).await,
        PlannedTask::RemoveObserved { pick } => {
            let snapshot = client.read(endpoint).await;
            let target = snapshot.value.as_set().and_then(|set| {
                let observed: Vec<&str> = set.into_iter().collect();
                policy::pick_observed(&observed, pick).map(str::to_string)
            });
            let operation = match target {
                Some(element) => Operation::Remove(element),
                None => {
                    tracing::debug!(
                        replica = endpoint.id(),
                        "Nothing observed to remove, skipping"
                    );
                    Operation::Noop
                }
            };
            let mut result = client.perform(endpoint, operation).await;
            result.read_error = snapshot.error;
            result
        }
    }
}
