//! Error types for latency statistics.

use thiserror::Error;

/// Errors that can occur while summarising latency samples.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum MetricsError {
    /// Too few samples to resolve the requested quantiles.
    #[error("Need at least {required} latency samples, have {actual}")]
    InsufficientSamples { required: usize, actual: usize },
}

impl MetricsError {
    /// Check if this error is caused by a short sample set.
    pub fn is_insufficient_samples(&self) -> bool {
        matches!(self, MetricsError::InsufficientSamples { .. })
    }
}

impl From<MetricsError> for crate::Error {
    fn from(err: MetricsError) -> Self {
        crate::Error::Metrics(err)
    }
}
