// SPDX-License-Identifier: MIT OR Apache-2.0
//! Template compilation: lexing an HLP expression into segments.
//!
//! ```text
//! segment    := literal | capture
//! literal    := (any byte except '<' | '\<')+
//! capture    := '<' ['?'] [name] ['/' type ('/' arg)*] '>'
//! name       := [A-Za-z0-9_.]*
//! ```
//!
//! `'\'` escapes the next byte inside a literal. Malformed templates —
//! unterminated captures, dangling escapes, bad capture names, unknown
//! decoders, bad decoder arguments — are rejected here, at compile time.

use crate::decoders::Decoder;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors raised while compiling an HLP template expression.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TemplateError {
    /// The template has no segments at all.
    #[error("empty template")]
    Empty,

    /// A `'<'` was never closed by `'>'`.
    #[error("unterminated capture starting at offset {offset}")]
    UnterminatedCapture {
        /// Offset of the opening `'<'`.
        offset: usize,
    },

    /// The template ends in a lone `'\'`.
    #[error("dangling escape at end of template")]
    DanglingEscape,

    /// A capture name contains a byte outside `[A-Za-z0-9_.]`.
    #[error("invalid character {found:?} in capture name at offset {offset}")]
    InvalidName {
        /// The offending character.
        found: char,
        /// Offset of the offending character.
        offset: usize,
    },

    /// The decoder type is not one of the known decoders.
    #[error("unknown decoder {name:?} at offset {offset}")]
    UnknownDecoder {
        /// The unrecognised type string.
        name: String,
        /// Offset of the capture it appeared in.
        offset: usize,
    },

    /// The decoder was given arguments it does not accept.
    #[error("invalid arguments for decoder {name:?}: {reason}")]
    InvalidArgs {
        /// Decoder type name.
        name: String,
        /// What was wrong.
        reason: String,
    },
}

// ---------------------------------------------------------------------------
// Segments
// ---------------------------------------------------------------------------

/// One named capture in a template.
#[derive(Debug, Clone, PartialEq)]
pub struct Capture {
    /// Key the captured value is emitted under; `None` for anonymous
    /// captures (`<>` / `</type>`), which decode but emit nothing.
    pub name: Option<String>,
    /// `<?…>` captures are skipped on decode failure instead of failing
    /// the parse.
    pub optional: bool,
    /// The decoder that interprets the input at this position.
    pub decoder: Decoder,
}

/// A compiled template segment.
#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    /// Bytes that must match the input exactly (escapes already resolved).
    Literal(String),
    /// A capture.
    Capture(Capture),
}

/// A compiled HLP template, ready to run against inputs.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    pub(crate) segments: Vec<Segment>,
}

impl Template {
    /// Compile `expr` into a template.
    pub fn compile(expr: &str) -> Result<Self, TemplateError> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = expr.char_indices();

        while let Some((offset, ch)) = chars.next() {
            match ch {
                '\\' => match chars.next() {
                    Some((_, escaped)) => literal.push(escaped),
                    None => return Err(TemplateError::DanglingEscape),
                },
                '<' => {
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    let mut body = String::new();
                    let mut closed = false;
                    for (_, c) in chars.by_ref() {
                        if c == '>' {
                            closed = true;
                            break;
                        }
                        body.push(c);
                    }
                    if !closed {
                        return Err(TemplateError::UnterminatedCapture { offset });
                    }
                    segments.push(Segment::Capture(parse_capture(&body, offset)?));
                }
                other => literal.push(other),
            }
        }
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }
        if segments.is_empty() {
            return Err(TemplateError::Empty);
        }

        tracing::debug!(segments = segments.len(), "compiled hlp template");
        Ok(Self { segments })
    }

    /// The compiled segments, in template order.
    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }
}

/// Parse the inside of `<…>`: `['?'] [name] ['/' type ('/' arg)*]`.
fn parse_capture(body: &str, offset: usize) -> Result<Capture, TemplateError> {
    let (optional, body) = match body.strip_prefix('?') {
        Some(rest) => (true, rest),
        None => (false, body),
    };

    let mut parts = body.split('/');
    let name_part = parts.next().unwrap_or_default();
    for (i, ch) in name_part.char_indices() {
        if !(ch.is_ascii_alphanumeric() || ch == '_' || ch == '.') {
            return Err(TemplateError::InvalidName {
                found: ch,
                offset: offset + 1 + i,
            });
        }
    }

    let rest: Vec<&str> = parts.collect();
    let decoder = match rest.split_first() {
        None => Decoder::Keyword,
        Some((ty, args)) => Decoder::resolve(ty, args, offset)?,
    };

    let name = if name_part.is_empty() {
        None
    } else {
        Some(name_part.to_owned())
    };
    Ok(Capture {
        name,
        optional,
        decoder,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lexes_literals_and_captures() {
        let t = Template::compile("a <one> b <_two/number> c").unwrap();
        assert_eq!(t.segments().len(), 5);
        match &t.segments()[1] {
            Segment::Capture(c) => {
                assert_eq!(c.name.as_deref(), Some("one"));
                assert!(!c.optional);
            }
            other => panic!("expected capture, got {other:?}"),
        }
    }

    #[test]
    fn escape_resolves_to_plain_bytes() {
        let t = Template::compile(r"a \< b \\ c").unwrap();
        match &t.segments()[0] {
            Segment::Literal(l) => assert_eq!(l, r"a < b \ c"),
            other => panic!("expected literal, got {other:?}"),
        }
    }

    #[test]
    fn optional_marker_and_anonymous_names() {
        let t = Template::compile("<?maybe/ip><//>x").unwrap_err();
        // "//" yields an empty type string — unknown decoder.
        assert!(matches!(t, TemplateError::UnknownDecoder { .. }));

        let t = Template::compile("<?maybe/ip><>x").unwrap();
        match &t.segments()[0] {
            Segment::Capture(c) => assert!(c.optional),
            other => panic!("expected capture, got {other:?}"),
        }
        match &t.segments()[1] {
            Segment::Capture(c) => assert!(c.name.is_none()),
            other => panic!("expected capture, got {other:?}"),
        }
    }

    #[test]
    fn dotted_names_are_accepted() {
        let t = Template::compile("<source.address> - <http.version>").unwrap();
        match &t.segments()[0] {
            Segment::Capture(c) => assert_eq!(c.name.as_deref(), Some("source.address")),
            other => panic!("expected capture, got {other:?}"),
        }
    }

    #[test]
    fn unterminated_capture_is_rejected() {
        assert_eq!(
            Template::compile("invalid capture <source.ip between strings"),
            Err(TemplateError::UnterminatedCapture { offset: 16 })
        );
    }

    #[test]
    fn dangling_escape_is_rejected() {
        assert_eq!(
            Template::compile(r"oops \"),
            Err(TemplateError::DanglingEscape)
        );
    }

    #[test]
    fn invalid_name_byte_is_rejected() {
        assert!(matches!(
            Template::compile("<bad name>"),
            Err(TemplateError::InvalidName { found: ' ', .. })
        ));
    }

    #[test]
    fn unknown_decoder_is_rejected() {
        assert!(matches!(
            Template::compile("<_x/nosuch>"),
            Err(TemplateError::UnknownDecoder { .. })
        ));
        assert!(matches!(
            Template::compile("<_x/nosuch/arg>"),
            Err(TemplateError::UnknownDecoder { .. })
        ));
    }

    #[test]
    fn empty_template_is_rejected() {
        assert_eq!(Template::compile(""), Err(TemplateError::Empty));
    }
}
