// SPDX-License-Identifier: MIT OR Apache-2.0
//! JSON value decoding.
//!
//! Parses exactly one JSON value at the cursor with a streaming
//! deserialiser, so trailing input is untouched. The raw lexeme is captured
//! as-is; the decoded value is only used to check the accepted top-level
//! type.

use super::{Decoded, DecodeFail};
use crate::value::{JsonString, Value};

/// Accepted top-level JSON type for a `json` capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonKind {
    /// `{…}` (the default).
    Object,
    /// `[…]`.
    Array,
    /// `"…"`.
    String,
    /// A number literal.
    Number,
    /// `true` / `false`.
    Bool,
    /// `null`.
    Null,
    /// Any value.
    Any,
}

impl JsonKind {
    /// Map a template argument to a kind.
    pub(crate) fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "object" => Some(Self::Object),
            "array" => Some(Self::Array),
            "string" => Some(Self::String),
            "number" => Some(Self::Number),
            "bool" => Some(Self::Bool),
            "null" => Some(Self::Null),
            "any" => Some(Self::Any),
            _ => None,
        }
    }

    fn accepts(self, value: &serde_json::Value) -> bool {
        match self {
            Self::Object => value.is_object(),
            Self::Array => value.is_array(),
            Self::String => value.is_string(),
            Self::Number => value.is_number(),
            Self::Bool => value.is_boolean(),
            Self::Null => value.is_null(),
            Self::Any => true,
        }
    }
}

pub(crate) fn decode(input: &str, cursor: usize, kind: JsonKind) -> Result<Decoded, DecodeFail> {
    let rest = &input[cursor..];
    let mut stream = serde_json::Deserializer::from_str(rest).into_iter::<serde_json::Value>();

    let value = match stream.next() {
        Some(Ok(value)) => value,
        Some(Err(err)) => return Err(DecodeFail::new(format!("malformed JSON: {err}"))),
        None => return Err(DecodeFail::new("expected a JSON value, found nothing")),
    };
    if !kind.accepts(&value) {
        return Err(DecodeFail::new(format!(
            "JSON value is not of the accepted type {kind:?}"
        )));
    }

    // byte_offset covers any whitespace the stream skipped before the value.
    let lexeme = rest[..stream.byte_offset()].trim_start();
    Ok(Decoded::one(
        Value::Json(JsonString(lexeme.to_owned())),
        cursor + stream.byte_offset(),
    ))
}
