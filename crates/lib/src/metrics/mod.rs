//! Sequential latency benchmarking.
//!
//! The collector keeps exactly one request outstanding: each sample is one
//! operation followed by one read of the same replica, timed together. It is
//! used for latency measurement only, never for convergence checks.

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use serde::Serialize;

use crate::{
    kind::CrdtKind,
    replica::{Operation, ReplicaClient, ReplicaEndpoint, Value},
};

pub mod errors;

pub use errors::MetricsError;

/// Number of equal-frequency groups the samples are cut into.
pub const QUANTILE_RESOLUTION: usize = 100;

/// Zero-based index of the 95th percentile among the quantile boundaries.
pub const P95_BOUNDARY: usize = 94;

/// Summary of one benchmark run against one replica.
#[derive(Debug, Clone, Serialize)]
pub struct BenchmarkReport {
    pub kind: CrdtKind,
    pub replica: String,
    pub ops: usize,
    /// Round trips where the operation or the read failed; not sampled.
    pub failures: usize,
    pub mean: Option<Duration>,
    #[serde(serialize_with = "serialize_p95")]
    pub p95: Result<Duration, MetricsError>,
    pub final_value: Value,
}

fn serialize_p95<S: serde::Serializer>(
    p95: &Result<Duration, MetricsError>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match p95 {
        Ok(d) => serializer.serialize_some(d),
        Err(_) => serializer.serialize_none(),
    }
}

/// Ordered successful round-trip durations.
#[derive(Debug, Clone, Default)]
pub struct LatencySamples {
    samples: Vec<Duration>,
}

impl LatencySamples {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, sample: Duration) {
        self.samples.push(sample);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn as_slice(&self) -> &[Duration] {
        &self.samples
    }

    /// Arithmetic mean, or `None` without samples.
    pub fn mean(&self) -> Option<Duration> {
        if self.samples.is_empty() {
            return None;
        }
        let total: u128 = self.samples.iter().map(Duration::as_nanos).sum();
        Some(nanos(total / self.samples.len() as u128))
    }

    /// The 95th percentile: boundary [`P95_BOUNDARY`] of [`QUANTILE_RESOLUTION`]-quantiles.
    pub fn p95(&self) -> Result<Duration, MetricsError> {
        Ok(quantiles(&self.samples, QUANTILE_RESOLUTION)?[P95_BOUNDARY])
    }
}

impl FromIterator<Duration> for LatencySamples {
    fn from_iter<I: IntoIterator<Item = Duration>>(iter: I) -> Self {
        Self {
            samples: iter.into_iter().collect(),
        }
    }
}

fn nanos(n: u128) -> Duration {
    Duration::from_nanos(u64::try_from(n).unwrap_or(u64::MAX))
}

/// Cut `samples` into `n` equal-frequency groups and return the `n - 1`
/// boundaries, interpolating between neighbouring ranks over `len + 1`
/// positions (the exclusive method).
///
/// Requires at least `n` samples so every boundary falls between two
/// observed values.
pub fn quantiles(samples: &[Duration], n: usize) -> Result<Vec<Duration>, MetricsError> {
    if n < 2 || samples.len() < n {
        return Err(MetricsError::InsufficientSamples {
            required: n.max(2),
            actual: samples.len(),
        });
    }

    let mut sorted: Vec<u128> = samples.iter().map(Duration::as_nanos).collect();
    sorted.sort_unstable();

    let m = sorted.len() + 1;
    let boundaries = (1..n)
        .map(|i| {
            let j = i * m / n;
            let delta = (i * m - j * n) as u128;
            let n = n as u128;
            nanos((sorted[j - 1] * (n - delta) + sorted[j] * delta) / n)
        })
        .collect();
    Ok(boundaries)
}

/// The operation issued for sample `i` of a benchmark against `kind`.
pub fn benchmark_operation(kind: CrdtKind, i: usize) -> Operation {
    match kind {
        CrdtKind::GCounter | CrdtKind::PnCounter => Operation::Increment,
        CrdtKind::GSet => Operation::Add(format!("e{i}")),
        CrdtKind::OrSet => Operation::Add(format!("x{i}")),
        CrdtKind::LwwRegister => Operation::Set(format!("v{i}")),
    }
}

/// Times sequential operation + read round trips.
pub struct MetricsCollector {
    client: Arc<dyn ReplicaClient>,
}

impl MetricsCollector {
    pub fn new(client: Arc<dyn ReplicaClient>) -> Self {
        Self { client }
    }

    /// Run `ops` sequential round trips against `endpoint`.
    pub async fn benchmark(&self, endpoint: &ReplicaEndpoint, ops: usize) -> BenchmarkReport {
        let kind = endpoint.kind;
        let mut samples = LatencySamples::new();
        let mut failures = 0;
        let mut final_value = Value::Missing;

        tracing::info!(%kind, replica = endpoint.id(), ops, "Benchmarking");
        for i in 0..ops {
            let start = Instant::now();
            let result = self
                .client
                .perform(endpoint, benchmark_operation(kind, i))
                .await;
            let snapshot = self.client.read(endpoint).await;
            let elapsed = start.elapsed();

            if result.is_success() && !snapshot.value.is_missing() {
                samples.record(elapsed);
            } else {
                failures += 1;
            }
            final_value = snapshot.value;
        }

        if ops == 0 {
            final_value = self.client.read(endpoint).await.value;
        }

        let p95 = samples.p95();
        if let Err(e) = &p95 {
            tracing::warn!(%kind, replica = endpoint.id(), "No p95 latency: {e}");
        }

        BenchmarkReport {
            kind,
            replica: endpoint.id().to_string(),
            ops,
            failures,
            mean: samples.mean(),
            p95,
            final_value,
        }
    }
}
