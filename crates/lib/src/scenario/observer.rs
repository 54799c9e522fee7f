//! Hooks for reporting a scenario while it runs.

use crate::{kind::CrdtKind, oracle::ConvergenceVerdict};

use super::{Phase, StepReport};

/// Receives scenario progress as the runner produces it.
///
/// All methods default to doing nothing; implement the ones you need.
pub trait ScenarioObserver: Send {
    /// The runner entered `phase`.
    fn on_phase(&mut self, _kind: CrdtKind, _phase: Phase) {}

    /// A step's dispatch, join and informational poll finished.
    fn on_step(&mut self, _report: &StepReport) {}

    /// The authoritative verdict was computed.
    fn on_verdict(&mut self, _verdict: &ConvergenceVerdict) {}
}

/// Observer that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullObserver;

impl ScenarioObserver for NullObserver {}

/// Observer that records every phase it sees, in order.
#[derive(Debug, Default, Clone)]
pub struct PhaseLog {
    pub phases: Vec<Phase>,
}

impl ScenarioObserver for PhaseLog {
    fn on_phase(&mut self, _kind: CrdtKind, phase: Phase) {
        self.phases.push(phase);
    }
}
