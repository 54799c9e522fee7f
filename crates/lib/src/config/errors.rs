//! Error types for harness configuration.

use std::path::PathBuf;

use thiserror::Error;

use crate::kind::CrdtKind;

/// Errors that can occur while loading or validating configuration.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid JSON for the schema.
    #[error("Failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A replica group lists no replicas.
    #[error("Group {kind} has no replicas")]
    EmptyGroup { kind: CrdtKind },

    /// Two groups claim the same CRDT kind.
    #[error("Group {kind} is configured more than once")]
    DuplicateGroup { kind: CrdtKind },

    /// No group is configured for a requested kind.
    #[error("No replica group configured for {kind}")]
    MissingGroup { kind: CrdtKind },

    /// A replica base address does not parse as a URL.
    #[error("Invalid replica address '{address}': {reason}")]
    InvalidAddress { address: String, reason: String },

    /// A contract cannot drive its kind's workload.
    #[error("Contract for {kind} is unusable: {}", problems.join("; "))]
    InvalidContract { kind: CrdtKind, problems: Vec<String> },
}

impl ConfigError {
    /// Check if this error came from reading or parsing a file.
    pub fn is_file_error(&self) -> bool {
        matches!(self, ConfigError::Io { .. } | ConfigError::Parse { .. })
    }

    /// Check if this error came from validating the configuration's content.
    pub fn is_validation_error(&self) -> bool {
        !self.is_file_error()
    }
}

impl From<ConfigError> for crate::Error {
    fn from(err: ConfigError) -> Self {
        crate::Error::Config(err)
    }
}
