// SPDX-License-Identifier: MIT OR Apache-2.0
//! Event document model and wire framing for the Vigil engine.
//!
//! Collectors deliver raw events framed as `<queue>:<location>:<log>` where
//! `queue` is a single decimal digit, `location` runs to the next unescaped
//! `':'`, and `log` is everything after it. [`Event::from_wire`] parses that
//! framing; the resulting [`Event`] is the unit of work that routers and
//! testers hand to policies.

#![deny(unsafe_code)]
#![warn(missing_docs)]

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors produced while decoding the collector wire framing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    /// The input was empty.
    #[error("empty event")]
    Empty,

    /// The first byte is not a decimal digit.
    #[error("queue identifier must be a single decimal digit, found {found:?}")]
    InvalidQueue {
        /// The byte found in queue position.
        found: char,
    },

    /// The `':'` after the queue digit is missing.
    #[error("expected ':' after the queue identifier at offset {position}")]
    MissingQueueDelimiter {
        /// Byte offset where the delimiter was expected.
        position: usize,
    },

    /// The `':'` terminating the location is missing.
    #[error("unterminated location, expected ':' before offset {position}")]
    UnterminatedLocation {
        /// Byte offset where scanning stopped (end of input).
        position: usize,
    },
}

// ---------------------------------------------------------------------------
// Event
// ---------------------------------------------------------------------------

/// A single event travelling through the engine.
///
/// `queue`, `location` and `original` are fixed at ingestion time; `fields`
/// is the JSON object that policies enrich while the event moves through a
/// routing pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Collector queue the event arrived on.
    pub queue: u8,
    /// Origin of the event (agent route, file path, socket name).
    pub location: String,
    /// The raw log text, untouched.
    pub original: String,
    /// Enrichment document written by policies. Always a JSON object.
    pub fields: serde_json::Value,
}

impl Event {
    /// Create an event from already-split framing components.
    pub fn new(queue: u8, location: impl Into<String>, original: impl Into<String>) -> Self {
        Self {
            queue,
            location: location.into(),
            original: original.into(),
            fields: serde_json::Value::Object(serde_json::Map::new()),
        }
    }

    /// Parse the collector framing `<queue-digit>:<location>:<log>`.
    ///
    /// A `'\'` inside the location escapes the following byte, so locations
    /// may contain literal colons. The log portion is taken verbatim and may
    /// be empty; missing delimiters are a [`ProtocolError`].
    pub fn from_wire(raw: &str) -> Result<Self, ProtocolError> {
        if raw.is_empty() {
            return Err(ProtocolError::Empty);
        }

        let bytes = raw.as_bytes();
        let queue = match bytes[0] {
            d @ b'0'..=b'9' => d - b'0',
            other => {
                return Err(ProtocolError::InvalidQueue {
                    found: other as char,
                });
            }
        };
        if bytes.get(1) != Some(&b':') {
            return Err(ProtocolError::MissingQueueDelimiter { position: 1 });
        }

        let mut location = Vec::new();
        let mut idx = 2;
        loop {
            match bytes.get(idx) {
                None => return Err(ProtocolError::UnterminatedLocation { position: idx }),
                Some(b'\\') if idx + 1 < bytes.len() => {
                    location.push(bytes[idx + 1]);
                    idx += 2;
                }
                Some(b':') => break,
                Some(&b) => {
                    location.push(b);
                    idx += 1;
                }
            }
        }

        // Escapes only ever drop ASCII backslashes, so the collected bytes
        // are still valid UTF-8.
        let location = String::from_utf8_lossy(&location).into_owned();
        Ok(Self::new(queue, location, &raw[idx + 1..]))
    }

    /// Combined JSON view of the event, as policies and testers see it.
    pub fn to_document(&self) -> serde_json::Value {
        serde_json::json!({
            "queue": self.queue,
            "location": self.location,
            "event": { "original": self.original },
            "fields": self.fields,
        })
    }

    /// Set one enrichment field, replacing any previous value under `key`.
    pub fn set_field(&mut self, key: &str, value: serde_json::Value) {
        if let serde_json::Value::Object(map) = &mut self.fields {
            map.insert(key.to_owned(), value);
        }
    }

    /// Read one enrichment field.
    #[must_use]
    pub fn field(&self, key: &str) -> Option<&serde_json::Value> {
        self.fields.as_object().and_then(|map| map.get(key))
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.queue, self.location, self.original)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_framing() {
        let ev = Event::from_wire("3:/some/route:payload text").unwrap();
        assert_eq!(ev.queue, 3);
        assert_eq!(ev.location, "/some/route");
        assert_eq!(ev.original, "payload text");
    }

    #[test]
    fn log_keeps_every_remaining_byte() {
        let ev = Event::from_wire("1:any:Some : random -> ([)] log ").unwrap();
        assert_eq!(ev.original, "Some : random -> ([)] log ");
    }

    #[test]
    fn escaped_colon_stays_in_location() {
        let ev = Event::from_wire(r"5:C\:\\agent:log").unwrap();
        assert_eq!(ev.location, r"C:\agent");
        assert_eq!(ev.original, "log");
    }

    #[test]
    fn empty_log_is_accepted() {
        let ev = Event::from_wire("9:here:").unwrap();
        assert_eq!(ev.original, "");
    }

    #[test]
    fn empty_input_is_rejected() {
        assert_eq!(Event::from_wire(""), Err(ProtocolError::Empty));
    }

    #[test]
    fn non_digit_queue_is_rejected() {
        assert_eq!(
            Event::from_wire("message:1:any"),
            Err(ProtocolError::InvalidQueue { found: 'm' })
        );
    }

    #[test]
    fn missing_queue_delimiter_is_rejected() {
        assert_eq!(
            Event::from_wire("3/route:log"),
            Err(ProtocolError::MissingQueueDelimiter { position: 1 })
        );
        assert_eq!(
            Event::from_wire("3"),
            Err(ProtocolError::MissingQueueDelimiter { position: 1 })
        );
    }

    #[test]
    fn unterminated_location_is_rejected() {
        assert_eq!(
            Event::from_wire("3:no-second-colon"),
            Err(ProtocolError::UnterminatedLocation { position: 17 })
        );
    }

    #[test]
    fn enrichment_fields_round_trip() {
        let mut ev = Event::new(1, "loc", "raw");
        ev.set_field("srcip", serde_json::json!("10.0.0.1"));
        assert_eq!(ev.field("srcip"), Some(&serde_json::json!("10.0.0.1")));
        assert!(ev.field("absent").is_none());

        let doc = ev.to_document();
        assert_eq!(doc["event"]["original"], "raw");
        assert_eq!(doc["fields"]["srcip"], "10.0.0.1");
    }
}
