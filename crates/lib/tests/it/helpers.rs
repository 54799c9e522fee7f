//! In-process mock replicas.
//!
//! Each mock replica is an axum server on an ephemeral local port speaking
//! one CRDT kind's text or JSON contract. A [`MockCluster`] groups replicas of
//! one kind and decides how writes travel between them.

use std::{
    collections::BTreeSet,
    sync::{
        Arc, Mutex,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use axum::{
    Json, Router,
    extract::{Query, State},
    routing::{get, post},
};
use converge::{
    CrdtKind, HttpReplicaClient, ReplicaEndpoint,
    replica::{ContractProfile, ReplicaContract},
};
use serde::Deserialize;
use serde_json::json;
use tokio::{net::TcpListener, task::JoinHandle};

/// How writes accepted by one replica reach the others.
#[derive(Debug, Clone, Copy)]
pub enum Replication {
    /// Every replica serves the same state.
    Shared,
    /// Replicas never exchange writes.
    Isolated,
    /// Writes reach peers after a fixed delay.
    Lagged(Duration),
}

#[derive(Debug, Clone)]
enum Update {
    Count(i64),
    Insert(String),
    Delete(String),
    Assign(u64, String),
}

#[derive(Debug, Default)]
struct ReplicaState {
    counter: i64,
    elements: BTreeSet<String>,
    register: Option<(u64, String)>,
}

impl ReplicaState {
    fn apply(&mut self, update: &Update) {
        match update {
            Update::Count(n) => self.counter += n,
            Update::Insert(e) => {
                self.elements.insert(e.clone());
            }
            Update::Delete(e) => {
                self.elements.remove(e);
            }
            Update::Assign(ts, value) => {
                if self.register.as_ref().is_none_or(|(current, _)| ts >= current) {
                    self.register = Some((*ts, value.clone()));
                }
            }
        }
    }

    fn register(&self) -> &str {
        self.register.as_ref().map(|(_, v)| v.as_str()).unwrap_or("")
    }
}

struct Cluster {
    kind: CrdtKind,
    replication: Replication,
    states: Vec<Mutex<ReplicaState>>,
    clock: AtomicU64,
    /// The highest-stamped register write accepted anywhere.
    latest: Mutex<Option<(u64, String)>>,
}

impl Cluster {
    fn slot(&self, index: usize) -> usize {
        match self.replication {
            Replication::Shared => 0,
            _ => index,
        }
    }

    fn tick(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn submit(self: &Arc<Self>, index: usize, update: Update) {
        let origin = self.slot(index);
        if let Update::Assign(ts, value) = &update {
            let mut latest = self.latest.lock().unwrap();
            if latest.as_ref().is_none_or(|(current, _)| ts > current) {
                *latest = Some((*ts, value.clone()));
            }
        }
        self.states[origin].lock().unwrap().apply(&update);

        if let Replication::Lagged(delay) = self.replication {
            for peer in (0..self.states.len()).filter(|p| *p != origin) {
                let cluster = Arc::clone(self);
                let update = update.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    cluster.states[peer].lock().unwrap().apply(&update);
                });
            }
        }
    }

    fn with_state<T>(&self, index: usize, f: impl FnOnce(&ReplicaState) -> T) -> T {
        f(&self.states[self.slot(index)].lock().unwrap())
    }
}

#[derive(Clone)]
struct Replica {
    index: usize,
    cluster: Arc<Cluster>,
}

impl Replica {
    fn submit(&self, update: Update) -> &'static str {
        self.cluster.submit(self.index, update);
        "OK"
    }

    fn elements(&self) -> Vec<String> {
        self.cluster
            .with_state(self.index, |s| s.elements.iter().cloned().collect())
    }
}

#[derive(Deserialize)]
struct ValueParam {
    value: String,
}

#[derive(Deserialize)]
struct CountBody {
    n: i64,
}

#[derive(Deserialize)]
struct ElementBody {
    element: String,
}

#[derive(Deserialize)]
struct ValueBody {
    value: String,
}

fn text_router(replica: Replica) -> Router {
    Router::new()
        .route(
            "/increment",
            get(|State(r): State<Replica>| async move { r.submit(Update::Count(1)) }),
        )
        .route(
            "/inc",
            post(|State(r): State<Replica>| async move { r.submit(Update::Count(1)) }),
        )
        .route(
            "/dec",
            post(|State(r): State<Replica>| async move { r.submit(Update::Count(-1)) }),
        )
        .route(
            "/add",
            post(
                |State(r): State<Replica>, Query(p): Query<ValueParam>| async move {
                    r.submit(Update::Insert(p.value))
                },
            ),
        )
        .route(
            "/remove",
            post(
                |State(r): State<Replica>, Query(p): Query<ValueParam>| async move {
                    r.submit(Update::Delete(p.value))
                },
            ),
        )
        .route(
            "/set",
            post(
                |State(r): State<Replica>, Query(p): Query<ValueParam>| async move {
                    let ts = r.cluster.tick();
                    r.submit(Update::Assign(ts, p.value))
                },
            ),
        )
        .route(
            "/value",
            get(|State(r): State<Replica>| async move {
                r.cluster.with_state(r.index, |s| match r.cluster.kind {
                    CrdtKind::LwwRegister => format!("Value: {}", s.register()),
                    _ => format!("Value: {}", s.counter),
                })
            }),
        )
        .route(
            "/state",
            get(|State(r): State<Replica>| async move { Json(r.elements()) }),
        )
        .route(
            "/values",
            get(|State(r): State<Replica>| async move { Json(r.elements()) }),
        )
        .with_state(replica)
}

fn json_router(replica: Replica) -> Router {
    Router::new()
        .route(
            "/increment",
            post(
                |State(r): State<Replica>, Json(body): Json<CountBody>| async move {
                    r.submit(Update::Count(body.n))
                },
            ),
        )
        .route(
            "/add",
            post(
                |State(r): State<Replica>, Json(body): Json<ElementBody>| async move {
                    r.submit(Update::Insert(body.element))
                },
            ),
        )
        .route(
            "/remove",
            post(
                |State(r): State<Replica>, Json(body): Json<ElementBody>| async move {
                    r.submit(Update::Delete(body.element))
                },
            ),
        )
        .route(
            "/set",
            post(
                |State(r): State<Replica>, Json(body): Json<ValueBody>| async move {
                    let ts = r.cluster.tick();
                    r.submit(Update::Assign(ts, body.value))
                },
            ),
        )
        .route(
            "/value",
            get(|State(r): State<Replica>| async move {
                let value = r.cluster.with_state(r.index, |s| match r.cluster.kind {
                    CrdtKind::LwwRegister => json!({ "value": s.register() }),
                    _ => json!({ "value": s.counter }),
                });
                Json(value)
            }),
        )
        .route(
            "/elements",
            get(|State(r): State<Replica>| async move {
                Json(json!({ "elements": r.elements() }))
            }),
        )
        .with_state(replica)
}

/// Serve `router` on an ephemeral local port and return its base URL.
pub async fn serve(router: Router) -> (String, JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    (format!("http://{addr}"), handle)
}

/// A base URL nothing listens on.
pub async fn dead_address() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

/// A group of mock replicas serving one CRDT kind.
pub struct MockCluster {
    pub kind: CrdtKind,
    pub profile: ContractProfile,
    pub urls: Vec<String>,
    servers: Vec<JoinHandle<()>>,
    cluster: Arc<Cluster>,
}

impl MockCluster {
    pub async fn start(
        kind: CrdtKind,
        profile: ContractProfile,
        replicas: usize,
        replication: Replication,
    ) -> Self {
        let cluster = Arc::new(Cluster {
            kind,
            replication,
            states: (0..replicas).map(|_| Mutex::default()).collect(),
            clock: AtomicU64::new(0),
            latest: Mutex::default(),
        });

        let mut urls = Vec::with_capacity(replicas);
        let mut servers = Vec::with_capacity(replicas);
        for index in 0..replicas {
            let replica = Replica {
                index,
                cluster: Arc::clone(&cluster),
            };
            let router = match profile {
                ContractProfile::Text => text_router(replica),
                ContractProfile::Json => json_router(replica),
            };
            let (url, handle) = serve(router).await;
            urls.push(url);
            servers.push(handle);
        }

        Self {
            kind,
            profile,
            urls,
            servers,
            cluster,
        }
    }

    /// Text-contract replicas.
    pub async fn text(kind: CrdtKind, replicas: usize, replication: Replication) -> Self {
        Self::start(kind, ContractProfile::Text, replicas, replication).await
    }

    pub fn endpoints(&self) -> Vec<ReplicaEndpoint> {
        self.urls
            .iter()
            .map(|url| ReplicaEndpoint::parse(url, self.kind).unwrap())
            .collect()
    }

    /// The register value carrying the highest clock stamp, if any was set.
    pub fn latest_write(&self) -> Option<String> {
        self.cluster
            .latest
            .lock()
            .unwrap()
            .as_ref()
            .map(|(_, value)| value.clone())
    }

    /// An HTTP client configured for this cluster's contract.
    pub fn client(&self) -> HttpReplicaClient {
        HttpReplicaClient::new(Duration::from_secs(2))
            .unwrap()
            .with_contract(
                self.kind,
                ReplicaContract::for_profile(self.kind, self.profile),
            )
    }
}

impl Drop for MockCluster {
    fn drop(&mut self) {
        for server in &self.servers {
            server.abort();
        }
    }
}
