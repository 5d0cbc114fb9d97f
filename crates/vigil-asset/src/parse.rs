// SPDX-License-Identifier: MIT OR Apache-2.0
//! An HLP-backed parse policy.
//!
//! A [`ParsePolicy`] holds an ordered list of compiled HLP templates; the
//! first one that parses the raw log wins, and its captured fields merge
//! into the event's enrichment document. No template matching is a user
//! error, surfaced like any other policy failure.

use crate::{AssetError, Policy, TraceSink};
use vigil_event::Event;
use vigil_hlp::{Template, TemplateError};

/// A policy that parses `event.original` with the first matching template.
pub struct ParsePolicy {
    name: String,
    templates: Vec<Template>,
}

impl ParsePolicy {
    /// Compile `exprs` into a parse policy named `name`.
    ///
    /// Any malformed expression fails the whole policy at build time.
    pub fn compile<S: AsRef<str>>(name: impl Into<String>, exprs: &[S]) -> Result<Self, AssetError> {
        let name = name.into();
        let templates = exprs
            .iter()
            .map(|expr| Template::compile(expr.as_ref()))
            .collect::<Result<Vec<_>, TemplateError>>()
            .map_err(|err| AssetError::Invalid {
                name: name.clone(),
                reason: err.to_string(),
            })?;
        if templates.is_empty() {
            return Err(AssetError::Invalid {
                name,
                reason: "a parse policy needs at least one template".to_owned(),
            });
        }
        Ok(Self { name, templates })
    }
}

impl Policy for ParsePolicy {
    fn evaluate(&self, event: &mut Event, sink: &mut TraceSink) -> Result<(), AssetError> {
        for (idx, template) in self.templates.iter().enumerate() {
            match template.parse(&event.original) {
                Ok(fields) => {
                    sink.emit(&self.name, &format!("template #{idx} matched"));
                    for (key, value) in fields {
                        event.set_field(&key, value.into());
                    }
                    return Ok(());
                }
                Err(err) => {
                    sink.emit(&self.name, &format!("template #{idx}: {err}"));
                }
            }
        }
        Err(AssetError::Evaluation {
            asset: self.name.clone(),
            reason: "no parse template matched the event".to_owned(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TraceLevel;
    use std::collections::BTreeSet;

    #[test]
    fn first_matching_template_wins() {
        let policy = ParsePolicy::compile(
            "decoder/syslog/0",
            &["sshd: <action> for <user> from <_ip/ip>", "sshd: <message/toend>"],
        )
        .unwrap();

        let mut event = Event::new(1, "auth", "sshd: accepted for root from 10.0.0.7");
        policy.evaluate(&mut event, &mut TraceSink::disabled()).unwrap();
        assert_eq!(event.field("action"), Some(&serde_json::json!("accepted")));
        assert_eq!(event.field("user"), Some(&serde_json::json!("root")));
        assert_eq!(event.field("_ip"), Some(&serde_json::json!("10.0.0.7")));

        // The catch-all second template picks up everything else.
        let mut event = Event::new(1, "auth", "sshd: key exchange failed");
        policy.evaluate(&mut event, &mut TraceSink::disabled()).unwrap();
        assert_eq!(
            event.field("message"),
            Some(&serde_json::json!("key exchange failed"))
        );
    }

    #[test]
    fn typed_captures_become_typed_json() {
        let policy =
            ParsePolicy::compile("decoder/http/0", &["<verb> <code/number> <ratio/number>"])
                .unwrap();
        let mut event = Event::new(1, "web", "GET 200 0.75");
        policy.evaluate(&mut event, &mut TraceSink::disabled()).unwrap();
        assert_eq!(event.field("code"), Some(&serde_json::json!(200)));
        assert_eq!(event.field("ratio"), Some(&serde_json::json!(0.75)));
    }

    #[test]
    fn no_match_is_a_user_error_with_traces() {
        let policy = ParsePolicy::compile("decoder/strict/0", &["exact prefix <rest/toend>"]).unwrap();
        let mut event = Event::new(1, "loc", "something else entirely");
        let mut sink = TraceSink::new(TraceLevel::All, BTreeSet::new());
        let err = policy.evaluate(&mut event, &mut sink).unwrap_err();
        assert!(matches!(err, AssetError::Evaluation { .. }));
        let lines = sink.into_lines();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with("[decoder/strict/0] template #0"));
    }

    #[test]
    fn malformed_templates_fail_the_build() {
        assert!(matches!(
            ParsePolicy::compile("decoder/bad/0", &["<unclosed"]),
            Err(AssetError::Invalid { .. })
        ));
        let empty: [&str; 0] = [];
        assert!(ParsePolicy::compile("decoder/empty/0", &empty).is_err());
    }
}
