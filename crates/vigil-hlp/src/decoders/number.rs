// SPDX-License-Identifier: MIT OR Apache-2.0
//! Signed integer / plain float decoding.
//!
//! Accepts a decimal integer fitting in 64 bits, or a float with digits on
//! both sides of a single `'.'`. Scientific notation, overflow and
//! leading-dot forms are rejected.

use super::{Decoded, DecodeFail, scan_token};
use crate::value::Value;

pub(crate) fn decode(
    input: &str,
    cursor: usize,
    stop: Option<&str>,
) -> Result<Decoded, DecodeFail> {
    let (token, end) = scan_token(input, cursor, stop);
    if token.is_empty() {
        return Err(DecodeFail::new("expected a number, found nothing"));
    }

    if let Ok(n) = token.parse::<i64>() {
        return Ok(Decoded::one(Value::Int(n), end));
    }

    if is_plain_float(token) {
        if let Ok(f) = token.parse::<f64>() {
            if f.is_finite() {
                return Ok(Decoded::one(Value::Float(f), end));
            }
        }
    }

    Err(DecodeFail::new(format!("{token:?} is not a number")))
}

/// `[-]digits '.' digits` and nothing else.
fn is_plain_float(token: &str) -> bool {
    let unsigned = token.strip_prefix('-').unwrap_or(token);
    let Some((whole, frac)) = unsigned.split_once('.') else {
        return false;
    };
    !whole.is_empty()
        && !frac.is_empty()
        && whole.bytes().all(|b| b.is_ascii_digit())
        && frac.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(input: &str) -> Result<Decoded, DecodeFail> {
        decode(input, 0, None)
    }

    #[test]
    fn parses_signed_integers() {
        match run("125").unwrap() {
            Decoded::Fields { fields, end } => {
                assert_eq!(fields[0].1, Value::Int(125));
                assert_eq!(end, 3);
            }
            other => panic!("unexpected outcome {other:?}"),
        }
        match run("-125").unwrap() {
            Decoded::Fields { fields, .. } => assert_eq!(fields[0].1, Value::Int(-125)),
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[test]
    fn parses_plain_floats() {
        match run("125.256").unwrap() {
            Decoded::Fields { fields, .. } => assert_eq!(fields[0].1, Value::Float(125.256)),
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[test]
    fn rejects_scientific_notation() {
        assert!(run("10E2").is_err());
        assert!(run("10E63").is_err());
        assert!(run("1e-3").is_err());
    }

    #[test]
    fn rejects_overflow() {
        assert!(run("9223372036854775808").is_err());
    }

    #[test]
    fn rejects_malformed_floats() {
        assert!(run(".125").is_err());
        assert!(run(".125.256").is_err());
        assert!(run("125.").is_err());
        assert!(run("1.2.3").is_err());
    }
}
