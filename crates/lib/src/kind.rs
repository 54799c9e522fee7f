//! The CRDT variants the harness knows how to drive.
//!
//! A [`CrdtKind`] is fixed per replica group at configuration time. It selects
//! the operation policy, the HTTP contract and the equality used by the oracle;
//! nothing about a replica's type is ever inferred from what it returns.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// A CRDT type exposed by a group of replicas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CrdtKind {
    /// Grow-only counter: increment only.
    #[serde(alias = "gcounter")]
    GCounter,
    /// Positive/negative counter: increment and decrement.
    #[serde(alias = "pn_counter", alias = "pncounter")]
    PnCounter,
    /// Grow-only set: add only.
    #[serde(alias = "gset")]
    GSet,
    /// Observed-remove set: add and remove, add-wins.
    #[serde(alias = "orset")]
    OrSet,
    /// Last-writer-wins register holding a string.
    #[serde(alias = "lww")]
    LwwRegister,
}

/// The shape of the value a replica of a given kind exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueShape {
    Integer,
    Text,
    StringSet,
}

impl CrdtKind {
    /// Every kind, in the order scenarios run them.
    pub const ALL: [CrdtKind; 5] = [
        CrdtKind::GCounter,
        CrdtKind::PnCounter,
        CrdtKind::GSet,
        CrdtKind::OrSet,
        CrdtKind::LwwRegister,
    ];

    /// Stable identifier used in configuration files and on the command line.
    pub fn as_str(&self) -> &'static str {
        match self {
            CrdtKind::GCounter => "g-counter",
            CrdtKind::PnCounter => "pn-counter",
            CrdtKind::GSet => "g-set",
            CrdtKind::OrSet => "or-set",
            CrdtKind::LwwRegister => "lww-register",
        }
    }

    /// Position of this kind in [`CrdtKind::ALL`].
    pub(crate) fn index(self) -> usize {
        self as usize
    }

    /// What a successful read of this kind decodes to.
    pub fn shape(&self) -> ValueShape {
        match self {
            CrdtKind::GCounter | CrdtKind::PnCounter => ValueShape::Integer,
            CrdtKind::LwwRegister => ValueShape::Text,
            CrdtKind::GSet | CrdtKind::OrSet => ValueShape::StringSet,
        }
    }

    /// Whether convergence is judged with set equality.
    pub fn is_set(&self) -> bool {
        self.shape() == ValueShape::StringSet
    }
}

impl fmt::Display for CrdtKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown CRDT kind name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown CRDT kind '{0}'")]
pub struct UnknownKind(pub String);

impl FromStr for CrdtKind {
    type Err = UnknownKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('_', "-").as_str() {
            "g-counter" | "gcounter" => Ok(CrdtKind::GCounter),
            "pn-counter" | "pncounter" => Ok(CrdtKind::PnCounter),
            "g-set" | "gset" => Ok(CrdtKind::GSet),
            "or-set" | "orset" => Ok(CrdtKind::OrSet),
            "lww-register" | "lwwregister" | "lww" => Ok(CrdtKind::LwwRegister),
            _ => Err(UnknownKind(s.to_string())),
        }
    }
}
