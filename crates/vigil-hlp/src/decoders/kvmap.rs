// SPDX-License-Identifier: MIT OR Apache-2.0
//! Key-value map decoding.
//!
//! Reads `KEY<sep>VALUE(<delim>KEY<sep>VALUE)*` until the remaining input
//! starts with the next template literal or is exhausted. An empty key, an
//! empty value, or a pair without the separator fails the whole capture.
//! The result is emitted as a raw JSON object in first-seen key order.

use super::{Decoded, DecodeFail};
use crate::value::{JsonString, Value};

pub(crate) fn decode(
    input: &str,
    cursor: usize,
    stop: Option<&str>,
    sep: &str,
    delim: &str,
) -> Result<Decoded, DecodeFail> {
    let stop_byte = stop.and_then(|lit| lit.as_bytes().first()).copied();
    let mut pairs: Vec<(String, String)> = Vec::new();
    let mut pos = cursor;

    loop {
        let rest = &input[pos..];
        let Some(sep_idx) = rest.find(sep) else {
            return Err(DecodeFail::new("pair without separator"));
        };
        let key = &rest[..sep_idx];
        if key.is_empty() {
            return Err(DecodeFail::new("empty key"));
        }
        if key.contains(delim) {
            // The separator found belongs to a later pair; this chunk has none.
            return Err(DecodeFail::new("pair without separator"));
        }

        let value_area = &rest[sep_idx + sep.len()..];
        let mut value_end = value_area.len();
        if let Some(idx) = value_area.find(delim) {
            value_end = value_end.min(idx);
        }
        if let Some(b) = stop_byte {
            if let Some(idx) = value_area.bytes().position(|c| c == b) {
                value_end = value_end.min(idx);
            }
        }
        let value = &value_area[..value_end];
        if value.is_empty() {
            return Err(DecodeFail::new("empty value"));
        }
        pairs.push((key.to_owned(), value.to_owned()));
        pos += sep_idx + sep.len() + value_end;

        let after = &input[pos..];
        if after.is_empty() {
            break;
        }
        if let Some(lit) = stop {
            if after.starts_with(lit) {
                break;
            }
        }
        if let Some(tail) = after.strip_prefix(delim) {
            pos = input.len() - tail.len();
        } else {
            return Err(DecodeFail::new("expected pair delimiter"));
        }
    }

    if pairs.is_empty() {
        return Err(DecodeFail::new("no pairs found"));
    }

    // Assembled by hand so insertion order survives; serde_json::Value
    // handles the string escaping.
    let body: Vec<String> = pairs
        .iter()
        .map(|(k, v)| {
            format!(
                "{}:{}",
                serde_json::Value::String(k.clone()),
                serde_json::Value::String(v.clone())
            )
        })
        .collect();
    let object = format!("{{{}}}", body.join(","));

    Ok(Decoded::one(Value::Json(JsonString(object)), pos))
}
