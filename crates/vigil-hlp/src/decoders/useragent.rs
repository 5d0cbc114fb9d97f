// SPDX-License-Identifier: MIT OR Apache-2.0
//! User-agent decoding: free text up to the surrounding literal, or up to a
//! closing bracket or quote when nothing follows in the template. Emitted
//! under the `original` sub-key.

use super::{Decoded, DecodeFail, scan_token};
use crate::value::Value;

pub(crate) fn decode(
    input: &str,
    cursor: usize,
    stop: Option<&str>,
) -> Result<Decoded, DecodeFail> {
    let (token, end) = match stop {
        Some(_) => scan_token(input, cursor, stop),
        None => {
            let rest = &input[cursor..];
            let cut = rest
                .bytes()
                .position(|b| b == b']' || b == b'"')
                .unwrap_or(rest.len());
            (&rest[..cut], cursor + cut)
        }
    };

    Ok(Decoded::Fields {
        fields: vec![(Some("original"), Value::from(token))],
        end,
    })
}
