// SPDX-License-Identifier: MIT OR Apache-2.0
//! Typed values captured by an HLP parse.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A raw JSON lexeme, exactly as it appeared in the input.
///
/// The engine never re-serialises captured JSON; downstream consumers decide
/// whether and how to parse it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JsonString(pub String);

impl fmt::Display for JsonString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A value captured by a decoder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Plain text.
    Str(String),
    /// Signed integer.
    Int(i64),
    /// Unsigned integer (calendar components).
    UInt(u64),
    /// Floating point.
    Float(f64),
    /// Raw JSON lexeme.
    Json(JsonString),
}

impl Value {
    /// Borrow as text, if this is a [`Value::Str`].
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Read as a signed integer, if this is a [`Value::Int`].
    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Read as an unsigned integer, if this is a [`Value::UInt`].
    #[must_use]
    pub fn as_uint(&self) -> Option<u64> {
        match self {
            Value::UInt(n) => Some(*n),
            _ => None,
        }
    }

    /// Read as a float, if this is a [`Value::Float`].
    #[must_use]
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(n) => Some(*n),
            _ => None,
        }
    }

    /// Borrow the raw JSON lexeme, if this is a [`Value::Json`].
    #[must_use]
    pub fn as_json(&self) -> Option<&str> {
        match self {
            Value::Json(j) => Some(&j.0),
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_owned())
    }
}

impl From<Value> for serde_json::Value {
    fn from(value: Value) -> Self {
        match value {
            Value::Str(s) => serde_json::Value::String(s),
            Value::Int(n) => serde_json::Value::Number(n.into()),
            Value::UInt(n) => serde_json::Value::Number(n.into()),
            Value::Float(f) => serde_json::Number::from_f64(f)
                .map_or(serde_json::Value::Null, serde_json::Value::Number),
            // The lexeme was validated when captured.
            Value::Json(j) => {
                serde_json::from_str(&j.0).unwrap_or(serde_json::Value::String(j.0))
            }
        }
    }
}

/// The result of a successful parse: capture key → typed value.
///
/// Composite decoders contribute dotted sub-keys (`_url.scheme`,
/// `_ts.year`). The map is ordered so parse output is deterministic.
pub type FieldMap = BTreeMap<String, Value>;
