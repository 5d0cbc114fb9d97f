// SPDX-License-Identifier: MIT OR Apache-2.0
//! Semantic decoders and their dispatch.
//!
//! Every decoder consumes input starting at the cursor and either emits
//! typed fields, consumes its token silently (the lenient family: `ip`,
//! `domain`, `timestamp`), or fails the segment. Decoders never consume the
//! literal that follows them; the shared [`scan_token`] helper stops at the
//! first byte of the next literal.

use crate::template::TemplateError;
use crate::value::Value;

mod domain;
mod filepath;
mod ip;
mod json;
mod kvmap;
mod number;
mod quoted;
mod timestamp;
mod url;
mod useragent;

pub use json::JsonKind;
pub use timestamp::TimeFormat;

// ---------------------------------------------------------------------------
// Decode outcome plumbing
// ---------------------------------------------------------------------------

/// A field produced by a decoder: optional sub-key (dotted onto the capture
/// name) and the value.
pub(crate) type Emitted = (Option<&'static str>, Value);

/// Successful decoder outcome.
#[derive(Debug)]
pub(crate) enum Decoded {
    /// Fields to emit and the cursor after the consumed bytes.
    Fields {
        /// Emitted sub-key/value pairs.
        fields: Vec<Emitted>,
        /// New cursor position.
        end: usize,
    },
    /// Token consumed, nothing emitted; the parse continues.
    Silent {
        /// New cursor position.
        end: usize,
    },
}

impl Decoded {
    pub(crate) fn one(value: Value, end: usize) -> Self {
        Decoded::Fields {
            fields: vec![(None, value)],
            end,
        }
    }
}

/// A failed decode: the segment (and, unless optional, the parse) fails.
#[derive(Debug)]
pub(crate) struct DecodeFail {
    /// Human-readable reason, surfaced in [`crate::ParseError`].
    pub reason: String,
}

impl DecodeFail {
    pub(crate) fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Consume bytes up to the first byte of `stop` (the next template literal)
/// or to the end of input. Returns the token and the cursor after it.
pub(crate) fn scan_token<'a>(input: &'a str, cursor: usize, stop: Option<&str>) -> (&'a str, usize) {
    let rest = &input[cursor..];
    let end = stop
        .and_then(|lit| lit.as_bytes().first())
        .and_then(|&b| rest.bytes().position(|c| c == b))
        .unwrap_or(rest.len());
    (&rest[..end], cursor + end)
}

// ---------------------------------------------------------------------------
// Decoder
// ---------------------------------------------------------------------------

/// A compiled decoder, one per capture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoder {
    /// Consume to the next literal; emit a string.
    Keyword,
    /// Consume everything to end of input, trailing literals included.
    ToEnd,
    /// Signed 64-bit integer or plain fractional float.
    Number,
    /// Delimited text between a start and an end token.
    Quoted {
        /// Opening token.
        start: String,
        /// Closing token.
        end: String,
    },
    /// IPv4 dotted-quad or IPv6.
    Ip,
    /// URL split into components.
    Url,
    /// FQDN split with the two-label TLD rule.
    Domain {
        /// Require both a subdomain and a TLD.
        fqdn: bool,
    },
    /// File path split into drive/folder/name/extension.
    FilePath {
        /// Force `/`-only separators, no drive detection.
        unix: bool,
    },
    /// Browser user-agent text.
    UserAgent,
    /// One JSON value of the accepted top-level type.
    Json {
        /// Accepted top-level type.
        kind: JsonKind,
    },
    /// `KEY<sep>VALUE` pairs separated by a pair delimiter.
    KvMap {
        /// Key/value separator.
        sep: String,
        /// Pair delimiter.
        delim: String,
    },
    /// Timestamp in a named format, or auto-detected.
    Timestamp {
        /// Named format; `None` tries the built-in list in order.
        format: Option<TimeFormat>,
    },
}

impl Decoder {
    /// Build a decoder from its template type string and positional
    /// arguments, validating arity and argument values.
    pub(crate) fn resolve(
        name: &str,
        args: &[&str],
        offset: usize,
    ) -> Result<Self, TemplateError> {
        let no_args = |decoder: Decoder| {
            if args.is_empty() {
                Ok(decoder)
            } else {
                Err(TemplateError::InvalidArgs {
                    name: name.to_owned(),
                    reason: "takes no arguments".to_owned(),
                })
            }
        };

        match name {
            "keyword" => no_args(Decoder::Keyword),
            "toend" => no_args(Decoder::ToEnd),
            "number" => no_args(Decoder::Number),
            "ip" => no_args(Decoder::Ip),
            "url" => no_args(Decoder::Url),
            "useragent" => no_args(Decoder::UserAgent),
            "quoted" => match args {
                [] => Ok(Decoder::Quoted {
                    start: "\"".to_owned(),
                    end: "\"".to_owned(),
                }),
                [both] => Ok(Decoder::Quoted {
                    start: (*both).to_owned(),
                    end: (*both).to_owned(),
                }),
                [start, end] => Ok(Decoder::Quoted {
                    start: (*start).to_owned(),
                    end: (*end).to_owned(),
                }),
                _ => Err(TemplateError::InvalidArgs {
                    name: name.to_owned(),
                    reason: "takes at most two delimiter arguments".to_owned(),
                }),
            },
            "domain" => match args {
                [] => Ok(Decoder::Domain { fqdn: false }),
                ["FQDN"] => Ok(Decoder::Domain { fqdn: true }),
                _ => Err(TemplateError::InvalidArgs {
                    name: name.to_owned(),
                    reason: "accepts only the FQDN argument".to_owned(),
                }),
            },
            "filepath" => match args {
                [] => Ok(Decoder::FilePath { unix: false }),
                ["UNIX"] => Ok(Decoder::FilePath { unix: true }),
                _ => Err(TemplateError::InvalidArgs {
                    name: name.to_owned(),
                    reason: "accepts only the UNIX argument".to_owned(),
                }),
            },
            "json" => match args {
                [] => Ok(Decoder::Json {
                    kind: JsonKind::Object,
                }),
                [kind] => JsonKind::from_arg(kind)
                    .map(|kind| Decoder::Json { kind })
                    .ok_or_else(|| TemplateError::InvalidArgs {
                        name: name.to_owned(),
                        reason: format!("unknown top-level type {kind:?}"),
                    }),
                _ => Err(TemplateError::InvalidArgs {
                    name: name.to_owned(),
                    reason: "takes at most one top-level type argument".to_owned(),
                }),
            },
            "kv_map" => match args {
                [sep, delim] if !sep.is_empty() && !delim.is_empty() => Ok(Decoder::KvMap {
                    sep: (*sep).to_owned(),
                    delim: (*delim).to_owned(),
                }),
                _ => Err(TemplateError::InvalidArgs {
                    name: name.to_owned(),
                    reason: "requires a separator and a pair delimiter".to_owned(),
                }),
            },
            "timestamp" => match args {
                [] => Ok(Decoder::Timestamp { format: None }),
                [fmt] => TimeFormat::from_name(fmt)
                    .map(|format| Decoder::Timestamp {
                        format: Some(format),
                    })
                    .ok_or_else(|| TemplateError::InvalidArgs {
                        name: name.to_owned(),
                        reason: format!("unknown format {fmt:?}"),
                    }),
                _ => Err(TemplateError::InvalidArgs {
                    name: name.to_owned(),
                    reason: "takes at most one format argument".to_owned(),
                }),
            },
            unknown => Err(TemplateError::UnknownDecoder {
                name: unknown.to_owned(),
                offset,
            }),
        }
    }

    /// Run this decoder at `cursor`; `stop` is the next template literal.
    pub(crate) fn decode(
        &self,
        input: &str,
        cursor: usize,
        stop: Option<&str>,
    ) -> Result<Decoded, DecodeFail> {
        match self {
            Decoder::Keyword => {
                let (token, end) = scan_token(input, cursor, stop);
                Ok(Decoded::one(Value::from(token), end))
            }
            Decoder::ToEnd => {
                let token = &input[cursor..];
                Ok(Decoded::one(Value::from(token), input.len()))
            }
            Decoder::Number => number::decode(input, cursor, stop),
            Decoder::Quoted { start, end } => quoted::decode(input, cursor, start, end),
            Decoder::Ip => ip::decode(input, cursor, stop),
            Decoder::Url => url::decode(input, cursor, stop),
            Decoder::Domain { fqdn } => domain::decode(input, cursor, stop, *fqdn),
            Decoder::FilePath { unix } => filepath::decode(input, cursor, stop, *unix),
            Decoder::UserAgent => useragent::decode(input, cursor, stop),
            Decoder::Json { kind } => json::decode(input, cursor, *kind),
            Decoder::KvMap { sep, delim } => kvmap::decode(input, cursor, stop, sep, delim),
            Decoder::Timestamp { format } => timestamp::decode(input, cursor, stop, *format),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scan_token_stops_at_next_literal_byte() {
        let (token, end) = scan_token("abc def", 0, Some(" def"));
        assert_eq!(token, "abc");
        assert_eq!(end, 3);
    }

    #[test]
    fn scan_token_without_stop_takes_everything() {
        let (token, end) = scan_token("abc def", 4, None);
        assert_eq!(token, "def");
        assert_eq!(end, 7);
    }

    #[test]
    fn scan_token_missing_stop_byte_takes_rest() {
        let (token, end) = scan_token("abcdef", 0, Some(" tail"));
        assert_eq!(token, "abcdef");
        assert_eq!(end, 6);
    }

    #[test]
    fn arity_is_validated() {
        assert!(Decoder::resolve("ip", &["x"], 0).is_err());
        assert!(Decoder::resolve("kv_map", &["="], 0).is_err());
        assert!(Decoder::resolve("kv_map", &["=", " "], 0).is_ok());
        assert!(Decoder::resolve("json", &["object", "extra"], 0).is_err());
        assert!(Decoder::resolve("json", &["wrongType"], 0).is_err());
        assert!(Decoder::resolve("timestamp", &["NOSUCH"], 0).is_err());
        assert!(Decoder::resolve("quoted", &["'", "'", "'"], 0).is_err());
    }
}
