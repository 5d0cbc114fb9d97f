// SPDX-License-Identifier: MIT OR Apache-2.0
//! IP address decoding.
//!
//! Accepts IPv4 dotted-quad or IPv6 (including `::` compression). A token
//! that is not an address is consumed without emitting a field; the
//! surrounding parse continues. Note the token still ends at the next
//! template literal's first byte, so an IPv6 literal in front of a `':'`
//! literal is cut short — the documented wire-framing limitation.

use super::{Decoded, DecodeFail, scan_token};
use crate::value::Value;
use std::net::IpAddr;

pub(crate) fn decode(
    input: &str,
    cursor: usize,
    stop: Option<&str>,
) -> Result<Decoded, DecodeFail> {
    let (token, end) = scan_token(input, cursor, stop);
    if token.parse::<IpAddr>().is_ok() {
        Ok(Decoded::one(Value::from(token), end))
    } else {
        Ok(Decoded::Silent { end })
    }
}
