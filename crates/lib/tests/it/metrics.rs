use std::sync::Arc;

use converge::{
    CrdtKind, ReplicaEndpoint, Value,
    metrics::{MetricsCollector, MetricsError},
    replica::ContractProfile,
};

use crate::helpers::{MockCluster, Replication, dead_address};

#[tokio::test]
async fn test_benchmark_counter_with_p95() {
    let cluster = MockCluster::text(CrdtKind::GCounter, 1, Replication::Shared).await;
    let collector = MetricsCollector::new(Arc::new(cluster.client()));

    let report = collector.benchmark(&cluster.endpoints()[0], 100).await;

    assert_eq!(report.ops, 100);
    assert_eq!(report.failures, 0);
    assert_eq!(report.final_value, Value::Scalar(100));
    let mean = report.mean.unwrap();
    let p95 = report.p95.unwrap();
    assert!(p95 > std::time::Duration::ZERO);
    assert!(mean > std::time::Duration::ZERO);
}

#[tokio::test]
async fn test_benchmark_json_set_and_register() {
    let cluster =
        MockCluster::start(CrdtKind::GSet, ContractProfile::Json, 1, Replication::Shared).await;
    let collector = MetricsCollector::new(Arc::new(cluster.client()));
    let report = collector.benchmark(&cluster.endpoints()[0], 10).await;
    assert_eq!(report.final_value.as_set().unwrap().len(), 10);
    assert!(report.final_value.as_set().unwrap().contains("e9"));

    let cluster = MockCluster::text(CrdtKind::LwwRegister, 1, Replication::Shared).await;
    let collector = MetricsCollector::new(Arc::new(cluster.client()));
    let report = collector.benchmark(&cluster.endpoints()[0], 5).await;
    assert_eq!(report.final_value, Value::Text("v4".into()));
}

#[tokio::test]
async fn test_short_benchmark_has_mean_but_no_p95() {
    let cluster = MockCluster::text(CrdtKind::PnCounter, 1, Replication::Shared).await;
    let collector = MetricsCollector::new(Arc::new(cluster.client()));

    let report = collector.benchmark(&cluster.endpoints()[0], 20).await;

    assert!(report.mean.is_some());
    assert_eq!(
        report.p95,
        Err(MetricsError::InsufficientSamples {
            required: 100,
            actual: 20
        })
    );

    let json = serde_json::to_value(&report).unwrap();
    assert!(json["p95"].is_null());
    assert_eq!(json["kind"], "pn-counter");
}

#[tokio::test]
async fn test_benchmark_against_unreachable_replica() {
    let cluster = MockCluster::text(CrdtKind::OrSet, 1, Replication::Shared).await;
    let collector = MetricsCollector::new(Arc::new(cluster.client()));
    let endpoint = ReplicaEndpoint::parse(&dead_address().await, CrdtKind::OrSet).unwrap();

    let report = collector.benchmark(&endpoint, 3).await;

    assert_eq!(report.failures, 3);
    assert_eq!(report.mean, None);
    assert!(report.p95.is_err());
    assert!(report.final_value.is_missing());
}
