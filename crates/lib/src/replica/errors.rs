//! Error types for replica I/O.
//!
//! Every failure a replica call can produce is captured as a [`ReplicaError`]
//! and classified as either a transport or a parse failure. These errors are
//! recorded in operation results and snapshots; they are never propagated out
//! of the workload driver or the oracle.

use thiserror::Error;

use crate::kind::CrdtKind;

/// The two failure classes a replica call can end in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// Connection refused, timeout, non-success status, or the call never ran.
    Transport,
    /// The response did not match the encoding configured for its type.
    Parse,
}

/// Errors that can occur while talking to a single replica.
#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum ReplicaError {
    /// The replica could not be reached.
    #[error("Failed to connect to {address}: {reason}")]
    ConnectionFailed { address: String, reason: String },

    /// The transport gave up waiting for the replica.
    #[error("Request to {address} timed out")]
    Timeout { address: String },

    /// The replica answered with a non-success HTTP status.
    #[error("Replica {address} returned status {status}")]
    Status { address: String, status: u16 },

    /// The response body did not decode under the configured encoding.
    #[error("Unexpected response from {address}: {reason}")]
    Decode { address: String, reason: String },

    /// The contract has no route for the requested operation.
    #[error("No '{operation}' route configured for {kind}")]
    Unsupported {
        kind: CrdtKind,
        operation: &'static str,
    },

    /// The task carrying the call panicked or was cancelled before completing.
    #[error("Task for {address} did not complete: {reason}")]
    TaskFailed { address: String, reason: String },
}

impl ReplicaError {
    /// Classify this error into the transport/parse taxonomy.
    pub fn class(&self) -> FailureClass {
        match self {
            ReplicaError::Decode { .. } => FailureClass::Parse,
            ReplicaError::ConnectionFailed { .. }
            | ReplicaError::Timeout { .. }
            | ReplicaError::Status { .. }
            | ReplicaError::Unsupported { .. }
            | ReplicaError::TaskFailed { .. } => FailureClass::Transport,
        }
    }

    /// Check if this is a transport failure.
    pub fn is_transport_failure(&self) -> bool {
        self.class() == FailureClass::Transport
    }

    /// Check if this is a parse failure.
    pub fn is_parse_failure(&self) -> bool {
        self.class() == FailureClass::Parse
    }

    /// Build a decode error for `address`.
    pub(crate) fn decode(address: &str, reason: impl Into<String>) -> Self {
        ReplicaError::Decode {
            address: address.to_string(),
            reason: reason.into(),
        }
    }

    /// Map a reqwest error into the transport taxonomy.
    pub(crate) fn from_reqwest(address: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ReplicaError::Timeout {
                address: address.to_string(),
            }
        } else if let Some(status) = err.status() {
            ReplicaError::Status {
                address: address.to_string(),
                status: status.as_u16(),
            }
        } else {
            ReplicaError::ConnectionFailed {
                address: address.to_string(),
                reason: err.to_string(),
            }
        }
    }
}

impl From<ReplicaError> for crate::Error {
    fn from(err: ReplicaError) -> Self {
        crate::Error::Replica(err)
    }
}
