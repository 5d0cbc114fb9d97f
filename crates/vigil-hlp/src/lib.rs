// SPDX-License-Identifier: MIT OR Apache-2.0
//! HLP — a declarative log-parser language for the Vigil engine.
//!
//! An HLP expression mixes literal text with `<name/type/args…>` captures:
//!
//! ```
//! use vigil_hlp::{Value, compile};
//!
//! let template = compile("<_ip/ip> - <code/number>").unwrap();
//! let fields = template.parse("127.0.0.1 - 200").unwrap();
//! assert_eq!(fields["_ip"], Value::from("127.0.0.1"));
//! assert_eq!(fields["code"], Value::Int(200));
//! ```
//!
//! Compilation is strict — unknown decoders and malformed captures fail with
//! a [`TemplateError`] — while execution is a deterministic left-to-right
//! walk producing a [`FieldMap`]. Composite decoders (URL, domain, filepath,
//! timestamp) expand into dotted sub-keys such as `_url.scheme` and
//! `_ts.year`.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod decoders;
mod runner;
mod template;
mod value;

pub use decoders::{Decoder, JsonKind, TimeFormat};
pub use runner::ParseError;
pub use template::{Capture, Segment, Template, TemplateError};
pub use value::{FieldMap, JsonString, Value};

/// Compile an HLP expression into a runnable [`Template`].
pub fn compile(expr: &str) -> Result<Template, TemplateError> {
    Template::compile(expr)
}
