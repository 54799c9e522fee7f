//! Response decoding.
//!
//! The encoding is always taken from the contract and the value shape from the
//! CRDT kind. A body that does not fit both is a parse failure.

use serde_json::Value as Json;

use super::{ReplicaError, ResponseEncoding, Value};
use crate::kind::ValueShape;

/// Decode a read response body into a typed value.
pub fn decode(
    shape: ValueShape,
    encoding: &ResponseEncoding,
    address: &str,
    body: &str,
) -> Result<Value, ReplicaError> {
    match encoding {
        ResponseEncoding::LabeledText => decode_labeled(shape, address, body),
        ResponseEncoding::JsonField { field } => {
            let json = parse_json(address, body)?;
            let inner = json.get(field.as_str()).ok_or_else(|| {
                ReplicaError::decode(address, format!("missing field '{field}'"))
            })?;
            from_json(shape, address, inner)
        }
        ResponseEncoding::JsonArray => {
            let json = parse_json(address, body)?;
            if shape != ValueShape::StringSet {
                return Err(ReplicaError::decode(
                    address,
                    "bare JSON arrays only carry sets",
                ));
            }
            from_json(shape, address, &json)
        }
    }
}

/// Split `Label: value` on its last colon and return the trimmed remainder.
pub fn labeled_remainder(body: &str) -> Option<&str> {
    body.trim().rsplit_once(':').map(|(_, rest)| rest.trim())
}

fn decode_labeled(shape: ValueShape, address: &str, body: &str) -> Result<Value, ReplicaError> {
    let rest = labeled_remainder(body)
        .ok_or_else(|| ReplicaError::decode(address, format!("no label in {:?}", body.trim())))?;
    match shape {
        ValueShape::Integer => rest
            .parse::<i64>()
            .map(Value::Scalar)
            .map_err(|e| ReplicaError::decode(address, format!("{rest:?} is not an integer: {e}"))),
        ValueShape::Text => Ok(Value::Text(rest.to_string())),
        ValueShape::StringSet => Err(ReplicaError::decode(
            address,
            "labeled text cannot carry a set",
        )),
    }
}

fn parse_json(address: &str, body: &str) -> Result<Json, ReplicaError> {
    serde_json::from_str(body)
        .map_err(|e| ReplicaError::decode(address, format!("invalid JSON: {e}")))
}

fn from_json(shape: ValueShape, address: &str, json: &Json) -> Result<Value, ReplicaError> {
    match shape {
        ValueShape::Integer => json
            .as_i64()
            .map(Value::Scalar)
            .ok_or_else(|| ReplicaError::decode(address, format!("{json} is not an integer"))),
        ValueShape::Text => json
            .as_str()
            .map(|s| Value::Text(s.to_string()))
            .ok_or_else(|| ReplicaError::decode(address, format!("{json} is not a string"))),
        ValueShape::StringSet => match json {
            // Go encodes a nil slice as `null`.
            Json::Null => Ok(Value::SetOf(Vec::new())),
            Json::Array(items) => items
                .iter()
                .map(|item| {
                    item.as_str().map(str::to_string).ok_or_else(|| {
                        ReplicaError::decode(address, format!("set element {item} is not a string"))
                    })
                })
                .collect::<Result<Vec<_>, _>>()
                .map(Value::SetOf),
            other => Err(ReplicaError::decode(
                address,
                format!("{other} is not an array"),
            )),
        },
    }
}
