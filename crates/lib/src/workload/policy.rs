//! Operation-selection policies, one per CRDT kind.
//!
//! Planning is synchronous and draws all of its randomness up front, so a
//! seeded generator reproduces the same operation mix regardless of how the
//! dispatched tasks interleave.

use rand::Rng;

use crate::{kind::CrdtKind, replica::Operation};

/// Probability that an observed-remove set task attempts a remove.
pub const OR_SET_REMOVE_PROBABILITY: f64 = 0.3;

/// Length of generated set elements.
pub const SET_ELEMENT_LEN: usize = 3;

/// Length of generated register values.
pub const REGISTER_VALUE_LEN: usize = 5;

/// Number of replicas that race on every register step.
pub const REGISTER_WRITERS: usize = 2;

const LETTERS: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";
const ALPHANUMERIC: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// The work one replica receives in one step.
#[derive(Debug, Clone, PartialEq)]
pub enum PlannedTask {
    /// Send a fixed operation.
    Perform(Operation),
    /// Read the replica, then remove the observed element selected by `pick`
    /// (a uniform draw in `[0, 1)`); degrade to a no-op if nothing is observed.
    RemoveObserved { pick: f64 },
}

impl PlannedTask {
    /// The operation this task sends, when it is known before dispatch.
    pub fn operation(&self) -> Option<Operation> {
        match self {
            PlannedTask::Perform(op) => Some(op.clone()),
            PlannedTask::RemoveObserved { .. } => None,
        }
    }
}

/// Plan one step: the replica index each task targets, and the task.
///
/// Every kind gives each replica one task, except the register, where only
/// the first [`REGISTER_WRITERS`] replicas write so that their writes race.
pub fn plan_step<R: Rng + ?Sized>(
    kind: CrdtKind,
    replica_count: usize,
    rng: &mut R,
) -> Vec<(usize, PlannedTask)> {
    let writers = match kind {
        CrdtKind::LwwRegister => replica_count.min(REGISTER_WRITERS),
        _ => replica_count,
    };
    (0..writers).map(|i| (i, plan_task(kind, rng))).collect()
}

/// Plan a single task for a replica of `kind`.
pub fn plan_task<R: Rng + ?Sized>(kind: CrdtKind, rng: &mut R) -> PlannedTask {
    match kind {
        CrdtKind::GCounter => PlannedTask::Perform(Operation::Increment),
        CrdtKind::PnCounter => PlannedTask::Perform(if rng.gen_bool(0.5) {
            Operation::Increment
        } else {
            Operation::Decrement
        }),
        CrdtKind::GSet => PlannedTask::Perform(Operation::Add(random_element(rng))),
        CrdtKind::OrSet => {
            if rng.gen_bool(OR_SET_REMOVE_PROBABILITY) {
                PlannedTask::RemoveObserved { pick: rng.r#gen() }
            } else {
                PlannedTask::Perform(Operation::Add(random_element(rng)))
            }
        }
        CrdtKind::LwwRegister => PlannedTask::Perform(Operation::Set(random_register_value(rng))),
    }
}

/// Select the element a [`PlannedTask::RemoveObserved`] targets among the
/// distinct observed elements, in sorted order.
pub fn pick_observed<'a>(observed: &[&'a str], pick: f64) -> Option<&'a str> {
    if observed.is_empty() {
        return None;
    }
    let index = ((pick * observed.len() as f64) as usize).min(observed.len() - 1);
    Some(observed[index])
}

/// A fresh short set element.
pub fn random_element<R: Rng + ?Sized>(rng: &mut R) -> String {
    random_string(rng, LETTERS, SET_ELEMENT_LEN)
}

/// A fresh register value.
pub fn random_register_value<R: Rng + ?Sized>(rng: &mut R) -> String {
    random_string(rng, ALPHANUMERIC, REGISTER_VALUE_LEN)
}

fn random_string<R: Rng + ?Sized>(rng: &mut R, charset: &[u8], len: usize) -> String {
    (0..len)
        .map(|_| charset[rng.gen_range(0..charset.len())] as char)
        .collect()
}
