//! HTTP replica client built on reqwest.

use std::time::Duration;

use async_trait::async_trait;

use super::{
    Method, Operation, Payload, ReplicaClient, ReplicaContract, ReplicaEndpoint, ReplicaError,
    Route, Value, decode::decode,
};
use crate::kind::CrdtKind;

/// Default per-request timeout enforced by the underlying client.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// [`ReplicaClient`] speaking each CRDT type's HTTP contract.
///
/// Contracts are fixed per [`CrdtKind`] when the client is built. Kinds
/// without an explicit contract use [`ReplicaContract::text`].
#[derive(Debug, Clone)]
pub struct HttpReplicaClient {
    client: reqwest::Client,
    /// Indexed by kind, in [`CrdtKind::ALL`] order.
    contracts: [ReplicaContract; CrdtKind::ALL.len()],
}

impl HttpReplicaClient {
    /// Create a client with the given request timeout.
    pub fn new(timeout: Duration) -> crate::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            contracts: CrdtKind::ALL.map(ReplicaContract::text),
        })
    }

    /// Use `contract` for every replica of `kind`.
    pub fn with_contract(mut self, kind: CrdtKind, contract: ReplicaContract) -> Self {
        self.contracts[kind.index()] = contract;
        self
    }

    /// The contract in force for `kind`.
    pub fn contract(&self, kind: CrdtKind) -> &ReplicaContract {
        &self.contracts[kind.index()]
    }

    fn request(
        &self,
        endpoint: &ReplicaEndpoint,
        route: &Route,
        argument: Option<&str>,
    ) -> reqwest::RequestBuilder {
        let url = endpoint.url_for(&route.path);
        let builder = match route.method {
            Method::Get => self.client.get(&url),
            Method::Post => self.client.post(&url),
        };
        match (&route.payload, argument) {
            (Payload::Query { param }, Some(arg)) => builder.query(&[(param.as_str(), arg)]),
            (Payload::Json { field }, Some(arg)) => {
                builder.json(&serde_json::json!({ field.as_str(): arg }))
            }
            (Payload::Count { field, amount }, _) => {
                builder.json(&serde_json::json!({ field.as_str(): amount }))
            }
            _ => builder,
        }
    }

    async fn execute(
        &self,
        endpoint: &ReplicaEndpoint,
        request: reqwest::RequestBuilder,
    ) -> Result<String, ReplicaError> {
        let address = endpoint.id();
        let response = request
            .send()
            .await
            .map_err(|e| ReplicaError::from_reqwest(address, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ReplicaError::Status {
                address: address.to_string(),
                status: status.as_u16(),
            });
        }

        response
            .text()
            .await
            .map_err(|e| ReplicaError::from_reqwest(address, e))
    }
}

#[async_trait]
impl ReplicaClient for HttpReplicaClient {
    async fn send(
        &self,
        endpoint: &ReplicaEndpoint,
        operation: &Operation,
    ) -> Result<(), ReplicaError> {
        let contract = self.contract(endpoint.kind);
        let route = contract
            .route_for(operation)
            .ok_or(ReplicaError::Unsupported {
                kind: endpoint.kind,
                operation: operation.name(),
            })?;
        let request = self.request(endpoint, route, operation.argument());
        self.execute(endpoint, request).await.map(|_| ())
    }

    async fn fetch(&self, endpoint: &ReplicaEndpoint) -> Result<Value, ReplicaError> {
        let contract = self.contract(endpoint.kind);
        let request = self.request(endpoint, &contract.read, None);
        let body = self.execute(endpoint, request).await?;
        decode(endpoint.kind.shape(), &contract.encoding, endpoint.id(), &body)
    }
}
