// SPDX-License-Identifier: MIT OR Apache-2.0
//! Template execution: walking segments left to right over an input.

use crate::decoders::Decoded;
use crate::template::{Segment, Template};
use crate::value::FieldMap;

/// A failed parse, with the byte offset where matching stopped.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("parse failed at offset {offset}: {reason}")]
pub struct ParseError {
    /// Byte offset in the input where the failing segment started.
    pub offset: usize,
    /// What went wrong.
    pub reason: String,
}

impl Template {
    /// Run the template against `input`.
    ///
    /// Literals must match byte-for-byte; captures invoke their decoder at
    /// the cursor. The first failing segment fails the whole parse — no
    /// partial field map is returned. Trailing input after the final
    /// segment is accepted.
    pub fn parse(&self, input: &str) -> Result<FieldMap, ParseError> {
        let mut out = FieldMap::new();
        let mut cursor = 0usize;

        for (idx, segment) in self.segments.iter().enumerate() {
            match segment {
                Segment::Literal(lit) => {
                    if input[cursor..].starts_with(lit.as_str()) {
                        cursor += lit.len();
                    } else {
                        return Err(ParseError {
                            offset: cursor,
                            reason: format!("literal {lit:?} does not match"),
                        });
                    }
                }
                Segment::Capture(capture) => {
                    let stop = match self.segments.get(idx + 1) {
                        Some(Segment::Literal(lit)) => Some(lit.as_str()),
                        _ => None,
                    };
                    match capture.decoder.decode(input, cursor, stop) {
                        Ok(Decoded::Fields { fields, end }) => {
                            if let Some(name) = &capture.name {
                                for (sub, value) in fields {
                                    let key = match sub {
                                        None => name.clone(),
                                        Some(sub) => format!("{name}.{sub}"),
                                    };
                                    out.insert(key, value);
                                }
                            }
                            cursor = end;
                        }
                        Ok(Decoded::Silent { end }) => cursor = end,
                        Err(fail) if capture.optional => {
                            tracing::trace!(reason = %fail.reason, "optional capture skipped");
                        }
                        Err(fail) => {
                            return Err(ParseError {
                                offset: cursor,
                                reason: fail.reason,
                            });
                        }
                    }
                    // `toend` consumed the rest of the input, trailing
                    // literals included; the walk ends here.
                    if capture.decoder == crate::decoders::Decoder::ToEnd {
                        return Ok(out);
                    }
                }
            }
        }

        Ok(out)
    }
}
