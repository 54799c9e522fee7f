//! Scenario runner.
//!
//! A scenario drives one replica group through a fixed state machine:
//!
//! ```text
//! INIT -> STEPPING(1..=steps) -> SYNC_WAIT -> FINAL_POLL -> VERDICT -> DONE
//! ```
//!
//! Each step dispatches and joins one round of operations, sleeps for the
//! step delay and polls every replica for an informational verdict. After the
//! last step the runner waits out the settle delay, polls once more and
//! computes the authoritative verdict. Replica failures are absorbed below
//! this layer, so `DONE` is always reached.

use std::{fmt, sync::Arc, time::Duration};

use serde::Serialize;

use crate::{
    kind::CrdtKind,
    oracle::{ConvergenceOracle, ConvergenceVerdict},
    replica::{Checkpoint, OperationResult, ReplicaClient, ReplicaEndpoint},
    workload::WorkloadDriver,
};

pub mod observer;

pub use observer::{NullObserver, PhaseLog, ScenarioObserver};

/// Steps per scenario unless configured otherwise.
pub const DEFAULT_STEPS: usize = 5;

/// Pause between a step's join and its poll.
pub const DEFAULT_STEP_DELAY: Duration = Duration::from_secs(1);

/// The settle wait is this many step delays.
pub const DEFAULT_SETTLE_FACTOR: u32 = 3;

/// Everything a scenario needs, fixed at construction.
#[derive(Debug, Clone)]
pub struct ScenarioConfig {
    pub kind: CrdtKind,
    pub replicas: Vec<ReplicaEndpoint>,
    pub steps: usize,
    pub step_delay: Duration,
    pub settle_delay: Duration,
    /// Poll after every step; disable for pure write storms.
    pub poll_each_step: bool,
    pub seed: Option<u64>,
}

impl ScenarioConfig {
    /// A scenario over `replicas` with the default step count and delays.
    pub fn new(kind: CrdtKind, replicas: Vec<ReplicaEndpoint>) -> Self {
        Self {
            kind,
            replicas,
            steps: DEFAULT_STEPS,
            step_delay: DEFAULT_STEP_DELAY,
            settle_delay: DEFAULT_STEP_DELAY * DEFAULT_SETTLE_FACTOR,
            poll_each_step: true,
            seed: None,
        }
    }

    pub fn with_steps(mut self, steps: usize) -> Self {
        self.steps = steps;
        self
    }

    /// Set the step delay and derive the settle wait as `factor` step delays.
    pub fn with_delays(mut self, step_delay: Duration, settle_factor: u32) -> Self {
        self.step_delay = step_delay;
        self.settle_delay = step_delay * settle_factor;
        self
    }

    pub fn with_settle_delay(mut self, settle_delay: Duration) -> Self {
        self.settle_delay = settle_delay;
        self
    }

    pub fn with_step_polls(mut self, poll_each_step: bool) -> Self {
        self.poll_each_step = poll_each_step;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

/// Runner states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "phase", content = "step", rename_all = "kebab-case")]
pub enum Phase {
    Init,
    Stepping(usize),
    SyncWait,
    FinalPoll,
    Verdict,
    Done,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Init => f.write_str("INIT"),
            Phase::Stepping(i) => write!(f, "STEPPING({i})"),
            Phase::SyncWait => f.write_str("SYNC_WAIT"),
            Phase::FinalPoll => f.write_str("FINAL_POLL"),
            Phase::Verdict => f.write_str("VERDICT"),
            Phase::Done => f.write_str("DONE"),
        }
    }
}

/// Outcome of one step.
#[derive(Debug, Clone)]
pub struct StepReport {
    pub kind: CrdtKind,
    pub step: usize,
    pub results: Vec<OperationResult>,
    /// Informational; intermediate disagreement is expected.
    pub verdict: Option<ConvergenceVerdict>,
}

impl StepReport {
    pub fn failures(&self) -> usize {
        self.results.iter().filter(|r| r.has_failure()).count()
    }
}

/// Full record of a scenario run.
#[derive(Debug, Clone)]
pub struct ScenarioReport {
    pub kind: CrdtKind,
    pub steps: Vec<StepReport>,
    pub final_verdict: ConvergenceVerdict,
}

impl ScenarioReport {
    /// The authoritative pass/fail signal.
    pub fn converged(&self) -> bool {
        self.final_verdict.equal
    }

    /// Every operation result across all steps.
    pub fn results(&self) -> impl Iterator<Item = &OperationResult> {
        self.steps.iter().flat_map(|s| s.results.iter())
    }

    /// Number of operations that failed in transport or parsing, counting
    /// failed pre-reads.
    pub fn operation_failures(&self) -> usize {
        self.steps.iter().map(StepReport::failures).sum()
    }
}

/// Runs the step loop and final verdict for one replica group.
pub struct ScenarioRunner {
    config: ScenarioConfig,
    driver: WorkloadDriver,
    oracle: ConvergenceOracle,
    phase: Phase,
}

impl ScenarioRunner {
    pub fn new(config: ScenarioConfig, client: Arc<dyn ReplicaClient>) -> Self {
        Self {
            driver: WorkloadDriver::new(Arc::clone(&client), config.seed),
            oracle: ConvergenceOracle::new(client),
            config,
            phase: Phase::Init,
        }
    }

    pub fn config(&self) -> &ScenarioConfig {
        &self.config
    }

    /// Current state of the machine.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    fn enter(&mut self, phase: Phase, observer: &mut dyn ScenarioObserver) {
        tracing::debug!(kind = %self.config.kind, from = %self.phase, to = %phase, "Phase transition");
        self.phase = phase;
        observer.on_phase(self.config.kind, phase);
    }

    /// Run the scenario without an observer.
    pub async fn run(&mut self) -> ScenarioReport {
        self.run_observed(&mut NullObserver).await
    }

    /// Run the step loop, settle, and compute the final verdict.
    pub async fn run_observed(&mut self, observer: &mut dyn ScenarioObserver) -> ScenarioReport {
        let kind = self.config.kind;
        self.enter(Phase::Init, observer);
        tracing::info!(
            %kind,
            replicas = self.config.replicas.len(),
            steps = self.config.steps,
            "Starting scenario"
        );

        let mut steps = Vec::with_capacity(self.config.steps);
        for step in 1..=self.config.steps {
            self.enter(Phase::Stepping(step), observer);
            let results = self
                .driver
                .run_step(kind, &self.config.replicas, step)
                .await;

            sleep(self.config.step_delay).await;

            let verdict = if self.config.poll_each_step {
                let verdict = self
                    .oracle
                    .check(kind, &self.config.replicas, Checkpoint::Step(step))
                    .await;
                tracing::debug!(%kind, step, equal = verdict.equal, "Step poll");
                Some(verdict)
            } else {
                None
            };

            let report = StepReport {
                kind,
                step,
                results,
                verdict,
            };
            observer.on_step(&report);
            steps.push(report);
        }

        self.finish(steps, observer).await
    }

    /// Burst run: `ops_per_replica` back-to-back operations to
    /// every replica concurrently, then a single settle wait and verdict.
    pub async fn run_burst(
        &mut self,
        ops_per_replica: usize,
        observer: &mut dyn ScenarioObserver,
    ) -> ScenarioReport {
        let kind = self.config.kind;
        self.enter(Phase::Init, observer);
        tracing::info!(%kind, ops_per_replica, "Starting burst");

        self.enter(Phase::Stepping(1), observer);
        let results = self
            .driver
            .run_burst(kind, &self.config.replicas, ops_per_replica)
            .await;
        let report = StepReport {
            kind,
            step: 1,
            results,
            verdict: None,
        };
        observer.on_step(&report);

        self.finish(vec![report], observer).await
    }

    async fn finish(
        &mut self,
        steps: Vec<StepReport>,
        observer: &mut dyn ScenarioObserver,
    ) -> ScenarioReport {
        let kind = self.config.kind;

        self.enter(Phase::SyncWait, observer);
        sleep(self.config.settle_delay).await;

        self.enter(Phase::FinalPoll, observer);
        let snapshots = self
            .oracle
            .poll(&self.config.replicas, Checkpoint::Final)
            .await;

        self.enter(Phase::Verdict, observer);
        let final_verdict = crate::oracle::compute_verdict(kind, snapshots);
        if final_verdict.equal {
            tracing::info!(%kind, "Replicas converged");
        } else {
            tracing::warn!(
                %kind,
                missing = final_verdict.missing().count(),
                "Replicas did not converge"
            );
        }
        observer.on_verdict(&final_verdict);

        self.enter(Phase::Done, observer);
        ScenarioReport {
            kind,
            steps,
            final_verdict,
        }
    }
}

async fn sleep(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}
