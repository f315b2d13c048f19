//! Firestore typed value encoding.
//!
//! The Firestore REST API wraps every value in a single-key object naming
//! its type (`{"stringValue": "x"}`, `{"mapValue": {"fields": {..}}}`).
//! These functions convert between that form and plain JSON.

use serde_json::{Map, Number, Value};
use thiserror::Error;

/// Errors decoding a Firestore document.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    /// A value object did not carry exactly one known type key.
    #[error("unrecognized Firestore value: {0}")]
    UnknownValue(String),

    /// An `integerValue` was not a decimal string.
    #[error("invalid integerValue: {0}")]
    BadInteger(String),

    /// A `doubleValue` was not a number.
    #[error("invalid doubleValue: {0}")]
    BadDouble(String),

    /// A document had no `name`.
    #[error("document has no name")]
    MissingName,

    /// The top-level value to encode was not an object.
    #[error("document body must be a JSON object")]
    NotAnObject,
}

/// Encode a JSON object as a Firestore `fields` map.
///
/// # Errors
///
/// Returns [`CodecError::NotAnObject`] if `body` is not an object.
pub fn encode_fields(body: &Value) -> Result<Map<String, Value>, CodecError> {
    match body {
        Value::Object(map) => Ok(map
            .iter()
            .map(|(key, value)| (key.clone(), encode_value(value)))
            .collect()),
        _ => Err(CodecError::NotAnObject),
    }
}

/// Encode one JSON value.
#[must_use]
pub fn encode_value(value: &Value) -> Value {
    let mut wrapped = Map::new();
    match value {
        Value::Null => {
            wrapped.insert("nullValue".into(), Value::Null);
        }
        Value::Bool(b) => {
            wrapped.insert("booleanValue".into(), Value::Bool(*b));
        }
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                wrapped.insert("integerValue".into(), Value::String(i.to_string()));
            } else {
                wrapped.insert("doubleValue".into(), Value::Number(n.clone()));
            }
        }
        Value::String(s) => {
            wrapped.insert("stringValue".into(), Value::String(s.clone()));
        }
        Value::Array(items) => {
            let values = items.iter().map(encode_value).collect();
            let mut array = Map::new();
            array.insert("values".into(), Value::Array(values));
            wrapped.insert("arrayValue".into(), Value::Object(array));
        }
        Value::Object(_) => {
            let mut map = Map::new();
            // encode_fields only fails on non-objects
            let fields = encode_fields(value).unwrap_or_default();
            map.insert("fields".into(), Value::Object(fields));
            wrapped.insert("mapValue".into(), Value::Object(map));
        }
    }
    Value::Object(wrapped)
}

/// Decode a Firestore `fields` map into a JSON object.
///
/// # Errors
///
/// Returns an error if any value is malformed.
pub fn decode_fields(fields: &Map<String, Value>) -> Result<Value, CodecError> {
    let mut out = Map::new();
    for (key, value) in fields {
        out.insert(key.clone(), decode_value(value)?);
    }
    Ok(Value::Object(out))
}

/// Decode one Firestore value.
///
/// # Errors
///
/// Returns an error if the value has no recognized type key or its
/// payload has the wrong shape.
pub fn decode_value(value: &Value) -> Result<Value, CodecError> {
    let Some((kind, inner)) = value.as_object().and_then(|map| map.iter().next()) else {
        return Err(CodecError::UnknownValue(value.to_string()));
    };

    match kind.as_str() {
        "nullValue" => Ok(Value::Null),
        "booleanValue" | "stringValue" | "timestampValue" | "referenceValue"
        | "geoPointValue" => Ok(inner.clone()),
        "integerValue" => {
            let parsed = match inner {
                Value::String(s) => s.parse::<i64>().ok(),
                Value::Number(n) => n.as_i64(),
                _ => None,
            };
            parsed
                .map(|i| Value::Number(i.into()))
                .ok_or_else(|| CodecError::BadInteger(inner.to_string()))
        }
        "doubleValue" => match inner {
            Value::Number(_) => Ok(inner.clone()),
            Value::String(s) => s
                .parse::<f64>()
                .ok()
                .and_then(Number::from_f64)
                .map(Value::Number)
                .ok_or_else(|| CodecError::BadDouble(s.clone())),
            _ => Err(CodecError::BadDouble(inner.to_string())),
        },
        "arrayValue" => {
            let values = inner
                .get("values")
                .and_then(Value::as_array)
                .map(|items| items.iter().map(decode_value).collect::<Result<Vec<_>, _>>())
                .transpose()?
                .unwrap_or_default();
            Ok(Value::Array(values))
        }
        "mapValue" => match inner.get("fields").and_then(Value::as_object) {
            Some(fields) => decode_fields(fields),
            None => Ok(Value::Object(Map::new())),
        },
        _ => Err(CodecError::UnknownValue(value.to_string())),
    }
}

/// Split a Firestore document into its id and decoded body.
///
/// # Errors
///
/// Returns an error if the document has no name or a malformed field.
pub fn decode_document(document: &Value) -> Result<(String, Value), CodecError> {
    let name = document
        .get("name")
        .and_then(Value::as_str)
        .ok_or(CodecError::MissingName)?;
    let id = document_id(name).to_string();
    let body = match document.get("fields").and_then(Value::as_object) {
        Some(fields) => decode_fields(fields)?,
        None => Value::Object(Map::new()),
    };
    Ok((id, body))
}

/// The last path segment of a document resource name.
#[must_use]
pub fn document_id(name: &str) -> &str {
    name.rsplit('/').next().unwrap_or(name)
}
