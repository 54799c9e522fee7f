//! Per-type HTTP contracts.
//!
//! A [`ReplicaContract`] is the dispatch table for one CRDT type: the method,
//! path and payload encoding for every operation the type supports, plus the
//! route and encoding used to read state back. Contracts are chosen once, at
//! configuration time, from a [`ContractProfile`] and optional overrides.

use serde::{Deserialize, Serialize};

use super::Operation;
use crate::kind::{CrdtKind, ValueShape};

/// HTTP method used by a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
}

/// How an operation's argument travels to the replica.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Payload {
    /// No argument is sent.
    Empty,
    /// The argument is sent as `?param=value`.
    Query { param: String },
    /// The argument is sent as `{"field": value}`.
    Json { field: String },
    /// A fixed signed count is sent as `{"field": amount}`.
    Count { field: String, amount: i64 },
}

/// Method, path and payload for one operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    pub method: Method,
    pub path: String,
    #[serde(default = "empty_payload")]
    pub payload: Payload,
}

fn empty_payload() -> Payload {
    Payload::Empty
}

impl Route {
    pub fn get(path: &str) -> Self {
        Self {
            method: Method::Get,
            path: path.to_string(),
            payload: Payload::Empty,
        }
    }

    pub fn post(path: &str) -> Self {
        Self {
            method: Method::Post,
            path: path.to_string(),
            payload: Payload::Empty,
        }
    }

    pub fn with_query(mut self, param: &str) -> Self {
        self.payload = Payload::Query {
            param: param.to_string(),
        };
        self
    }

    pub fn with_json(mut self, field: &str) -> Self {
        self.payload = Payload::Json {
            field: field.to_string(),
        };
        self
    }

    pub fn with_count(mut self, field: &str, amount: i64) -> Self {
        self.payload = Payload::Count {
            field: field.to_string(),
            amount,
        };
        self
    }
}

/// How a read response body is encoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ResponseEncoding {
    /// Plain text `Label: value`, split on the last colon.
    LabeledText,
    /// A JSON object whose `field` holds the value.
    JsonField { field: String },
    /// A bare JSON array of strings.
    JsonArray,
}

/// The two contract families the harness ships with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ContractProfile {
    /// Query-parameter writes and `Label: value` reads.
    #[default]
    Text,
    /// JSON-body writes and JSON-object reads.
    Json,
}

/// The complete HTTP dispatch table for one CRDT type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplicaContract {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub increment: Option<Route>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decrement: Option<Route>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub add: Option<Route>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remove: Option<Route>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub set: Option<Route>,
    pub read: Route,
    pub encoding: ResponseEncoding,
}

impl ReplicaContract {
    fn read_only(read: Route, encoding: ResponseEncoding) -> Self {
        Self {
            increment: None,
            decrement: None,
            add: None,
            remove: None,
            set: None,
            read,
            encoding,
        }
    }

    /// Built-in contract for `kind` under `profile`.
    pub fn for_profile(kind: CrdtKind, profile: ContractProfile) -> Self {
        match profile {
            ContractProfile::Text => Self::text(kind),
            ContractProfile::Json => Self::json(kind),
        }
    }

    /// Contract of the plain-text services: query-parameter writes,
    /// `Value: N` reads for counters and registers, JSON arrays for sets.
    pub fn text(kind: CrdtKind) -> Self {
        match kind {
            CrdtKind::GCounter => Self {
                increment: Some(Route::get("/increment")),
                ..Self::read_only(Route::get("/value"), ResponseEncoding::LabeledText)
            },
            CrdtKind::PnCounter => Self {
                increment: Some(Route::post("/inc")),
                decrement: Some(Route::post("/dec")),
                ..Self::read_only(Route::get("/value"), ResponseEncoding::LabeledText)
            },
            CrdtKind::GSet => Self {
                add: Some(Route::post("/add").with_query("value")),
                ..Self::read_only(Route::get("/state"), ResponseEncoding::JsonArray)
            },
            // `/state` on these services exposes the tag map including
            // tombstoned elements; `/values` is the observable set.
            CrdtKind::OrSet => Self {
                add: Some(Route::post("/add").with_query("value")),
                remove: Some(Route::post("/remove").with_query("value")),
                ..Self::read_only(Route::get("/values"), ResponseEncoding::JsonArray)
            },
            CrdtKind::LwwRegister => Self {
                set: Some(Route::post("/set").with_query("value")),
                ..Self::read_only(Route::get("/value"), ResponseEncoding::LabeledText)
            },
        }
    }

    /// Contract of the JSON services: JSON-body writes, JSON-object reads.
    pub fn json(kind: CrdtKind) -> Self {
        let value_field = || ResponseEncoding::JsonField {
            field: "value".to_string(),
        };
        let elements_field = || ResponseEncoding::JsonField {
            field: "elements".to_string(),
        };
        match kind {
            CrdtKind::GCounter => Self {
                increment: Some(Route::post("/increment").with_count("n", 1)),
                ..Self::read_only(Route::get("/value"), value_field())
            },
            CrdtKind::PnCounter => Self {
                increment: Some(Route::post("/increment").with_count("n", 1)),
                decrement: Some(Route::post("/increment").with_count("n", -1)),
                ..Self::read_only(Route::get("/value"), value_field())
            },
            CrdtKind::GSet => Self {
                add: Some(Route::post("/add").with_json("element")),
                ..Self::read_only(Route::get("/elements"), elements_field())
            },
            CrdtKind::OrSet => Self {
                add: Some(Route::post("/add").with_json("element")),
                remove: Some(Route::post("/remove").with_json("element")),
                ..Self::read_only(Route::get("/elements"), elements_field())
            },
            CrdtKind::LwwRegister => Self {
                set: Some(Route::post("/set").with_json("value")),
                ..Self::read_only(Route::get("/value"), value_field())
            },
        }
    }

    /// Route for `operation`, if the contract has one.
    pub fn route_for(&self, operation: &Operation) -> Option<&Route> {
        match operation {
            Operation::Increment => self.increment.as_ref(),
            Operation::Decrement => self.decrement.as_ref(),
            Operation::Add(_) => self.add.as_ref(),
            Operation::Remove(_) => self.remove.as_ref(),
            Operation::Set(_) => self.set.as_ref(),
            Operation::Noop => None,
        }
    }

    /// Operations the workload policy for `kind` issues.
    pub fn required_operations(kind: CrdtKind) -> &'static [&'static str] {
        match kind {
            CrdtKind::GCounter => &["increment"],
            CrdtKind::PnCounter => &["increment", "decrement"],
            CrdtKind::GSet => &["add"],
            CrdtKind::OrSet => &["add", "remove"],
            CrdtKind::LwwRegister => &["set"],
        }
    }

    /// Names of routes `kind` needs that this contract lacks, plus a
    /// description of any encoding that cannot carry `kind`'s value shape.
    pub fn problems(&self, kind: CrdtKind) -> Vec<String> {
        let mut problems: Vec<String> = Self::required_operations(kind)
            .iter()
            .filter(|name| {
                let route = match **name {
                    "increment" => &self.increment,
                    "decrement" => &self.decrement,
                    "add" => &self.add,
                    "remove" => &self.remove,
                    _ => &self.set,
                };
                route.is_none()
            })
            .map(|name| format!("missing '{name}' route"))
            .collect();

        let encoding_fits = match (&self.encoding, kind.shape()) {
            (ResponseEncoding::LabeledText, ValueShape::StringSet) => false,
            (ResponseEncoding::JsonArray, ValueShape::Integer | ValueShape::Text) => false,
            _ => true,
        };
        if !encoding_fits {
            problems.push(format!("{:?} cannot encode a {kind} value", self.encoding));
        }
        problems
    }
}
