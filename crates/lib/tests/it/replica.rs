use std::time::Duration;

use axum::{Router, http::StatusCode, routing::get};
use converge::{
    CrdtKind, HttpReplicaClient, Operation, ReplicaClient, ReplicaEndpoint, Value,
    replica::{ContractProfile, FailureClass, ReplicaError},
};

use crate::helpers::{MockCluster, Replication, dead_address, serve};

fn set(items: &[&str]) -> Value {
    Value::SetOf(items.iter().map(|s| s.to_string()).collect())
}

#[tokio::test]
async fn test_text_counters() {
    let cluster = MockCluster::text(CrdtKind::GCounter, 2, Replication::Shared).await;
    let client = cluster.client();
    let endpoints = cluster.endpoints();

    for _ in 0..3 {
        let result = client.perform(&endpoints[0], Operation::Increment).await;
        assert!(result.is_success(), "{:?}", result.outcome);
    }
    assert_eq!(client.read(&endpoints[1]).await.value, Value::Scalar(3));

    let cluster = MockCluster::text(CrdtKind::PnCounter, 1, Replication::Shared).await;
    let client = cluster.client();
    let endpoint = &cluster.endpoints()[0];
    for op in [Operation::Increment, Operation::Increment, Operation::Decrement] {
        assert!(client.perform(endpoint, op).await.is_success());
    }
    assert_eq!(client.read(endpoint).await.value, Value::Scalar(1));
}

#[tokio::test]
async fn test_text_sets_and_register() {
    let cluster = MockCluster::text(CrdtKind::OrSet, 1, Replication::Shared).await;
    let client = cluster.client();
    let endpoint = &cluster.endpoints()[0];
    for op in [
        Operation::Add("abc".into()),
        Operation::Add("xyz".into()),
        Operation::Remove("abc".into()),
    ] {
        assert!(client.perform(endpoint, op).await.is_success());
    }
    assert_eq!(client.read(endpoint).await.value, set(&["xyz"]));

    let cluster = MockCluster::text(CrdtKind::GSet, 1, Replication::Shared).await;
    let client = cluster.client();
    let endpoint = &cluster.endpoints()[0];
    assert_eq!(client.read(endpoint).await.value, set(&[]));
    client.perform(endpoint, Operation::Add("qrs".into())).await;
    assert_eq!(client.read(endpoint).await.value, set(&["qrs"]));

    let cluster = MockCluster::text(CrdtKind::LwwRegister, 1, Replication::Shared).await;
    let client = cluster.client();
    let endpoint = &cluster.endpoints()[0];
    client.perform(endpoint, Operation::Set("a1b2c".into())).await;
    client.perform(endpoint, Operation::Set("z9y8x".into())).await;
    assert_eq!(client.read(endpoint).await.value, Value::Text("z9y8x".into()));
}

#[tokio::test]
async fn test_json_profile() {
    let cluster =
        MockCluster::start(CrdtKind::PnCounter, ContractProfile::Json, 1, Replication::Shared)
            .await;
    let client = cluster.client();
    let endpoint = &cluster.endpoints()[0];
    for op in [Operation::Decrement, Operation::Decrement, Operation::Increment] {
        assert!(client.perform(endpoint, op).await.is_success());
    }
    assert_eq!(client.read(endpoint).await.value, Value::Scalar(-1));

    let cluster =
        MockCluster::start(CrdtKind::OrSet, ContractProfile::Json, 1, Replication::Shared).await;
    let client = cluster.client();
    let endpoint = &cluster.endpoints()[0];
    client.perform(endpoint, Operation::Add("x1".into())).await;
    client.perform(endpoint, Operation::Add("x2".into())).await;
    client.perform(endpoint, Operation::Remove("x1".into())).await;
    assert_eq!(client.read(endpoint).await.value, set(&["x2"]));

    let cluster =
        MockCluster::start(CrdtKind::LwwRegister, ContractProfile::Json, 1, Replication::Shared)
            .await;
    let client = cluster.client();
    let endpoint = &cluster.endpoints()[0];
    client.perform(endpoint, Operation::Set("v7".into())).await;
    assert_eq!(client.read(endpoint).await.value, Value::Text("v7".into()));
}

#[tokio::test]
async fn test_undecodable_response_is_parse_failure() {
    let router = Router::new().route("/value", get(|| async { "garbage without a label" }));
    let (url, _server) = serve(router).await;
    let endpoint = ReplicaEndpoint::parse(&url, CrdtKind::GCounter).unwrap();
    let client = HttpReplicaClient::new(Duration::from_secs(2)).unwrap();

    let snapshot = client.read(&endpoint).await;
    assert_eq!(snapshot.value, Value::Missing);
    let error = snapshot.error.unwrap();
    assert_eq!(error.class(), FailureClass::Parse);
    assert!(error.is_parse_failure());
}

#[tokio::test]
async fn test_error_status_is_transport_failure() {
    let router = Router::new()
        .route("/value", get(|| async { StatusCode::INTERNAL_SERVER_ERROR }))
        .route("/increment", get(|| async { StatusCode::SERVICE_UNAVAILABLE }));
    let (url, _server) = serve(router).await;
    let endpoint = ReplicaEndpoint::parse(&url, CrdtKind::GCounter).unwrap();
    let client = HttpReplicaClient::new(Duration::from_secs(2)).unwrap();

    let result = client.perform(&endpoint, Operation::Increment).await;
    assert!(matches!(
        result.outcome,
        Err(ReplicaError::Status { status: 503, .. })
    ));
    assert_eq!(result.failure(), Some(FailureClass::Transport));

    let snapshot = client.read(&endpoint).await;
    assert!(snapshot.value.is_missing());
    assert!(snapshot.error.unwrap().is_transport_failure());
}

#[tokio::test]
async fn test_slow_replica_times_out() {
    let router = Router::new().route(
        "/value",
        get(|| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            "Value: 1"
        }),
    );
    let (url, _server) = serve(router).await;
    let endpoint = ReplicaEndpoint::parse(&url, CrdtKind::GCounter).unwrap();
    let client = HttpReplicaClient::new(Duration::from_millis(200)).unwrap();

    let snapshot = client.read(&endpoint).await;
    assert!(snapshot.value.is_missing());
    assert!(matches!(snapshot.error, Some(ReplicaError::Timeout { .. })));
}

#[tokio::test]
async fn test_unreachable_replica() {
    let endpoint = ReplicaEndpoint::parse(&dead_address().await, CrdtKind::LwwRegister).unwrap();
    let client = HttpReplicaClient::new(Duration::from_secs(2)).unwrap();

    let result = client.perform(&endpoint, Operation::Set("abcde".into())).await;
    assert_eq!(result.failure(), Some(FailureClass::Transport));
    assert_eq!(result.replica, endpoint.id());

    let snapshot = client.read(&endpoint).await;
    assert!(snapshot.value.is_missing());
}
