// SPDX-License-Identifier: MIT OR Apache-2.0
//! Delimited-string decoding.
//!
//! The captured value excludes the delimiters; both delimiters are consumed
//! from the input.

use super::{Decoded, DecodeFail};
use crate::value::Value;

pub(crate) fn decode(
    input: &str,
    cursor: usize,
    start: &str,
    end: &str,
) -> Result<Decoded, DecodeFail> {
    let rest = &input[cursor..];
    let Some(after_start) = rest.strip_prefix(start) else {
        return Err(DecodeFail::new(format!("expected opening {start:?}")));
    };
    let Some(close) = after_start.find(end) else {
        return Err(DecodeFail::new(format!("missing closing {end:?}")));
    };

    let value = &after_start[..close];
    let consumed = start.len() + close + end.len();
    Ok(Decoded::one(Value::from(value), cursor + consumed))
}
