// SPDX-License-Identifier: MIT OR Apache-2.0
//! Mock builder and scripted assets for tests.
//!
//! [`MockBuilder`] lives next to the production contract so routers,
//! testers, and orchestrators can be exercised without a real asset
//! catalog.

use crate::{AssetBuilder, AssetError, Filter, Policy, TraceSink};
use std::collections::{BTreeMap, BTreeSet};
use vigil_event::Event;

// ---------------------------------------------------------------------------
// Scripted assets
// ---------------------------------------------------------------------------

/// A policy that stamps the event with its own name, emits one trace line
/// per referenced asset, and optionally fails.
#[derive(Debug, Clone)]
pub struct ScriptedPolicy {
    name: String,
    assets: BTreeSet<String>,
    fail: bool,
}

impl Policy for ScriptedPolicy {
    fn evaluate(&self, event: &mut Event, sink: &mut TraceSink) -> Result<(), AssetError> {
        if self.fail {
            return Err(AssetError::Evaluation {
                asset: self.name.clone(),
                reason: "scripted failure".to_owned(),
            });
        }
        for asset in &self.assets {
            sink.emit(asset, "applied");
        }
        event.set_field("policy", serde_json::json!(self.name));
        Ok(())
    }
}

/// A filter with a fixed verdict.
#[derive(Debug, Clone, Copy)]
pub struct AlwaysFilter(pub bool);

impl Filter for AlwaysFilter {
    fn matches(&self, _event: &Event) -> bool {
        self.0
    }
}

/// Matches events whose raw log contains a needle.
#[derive(Debug, Clone)]
pub struct SubstringFilter {
    needle: String,
}

impl SubstringFilter {
    /// A filter matching logs that contain `needle`.
    #[must_use]
    pub fn new(needle: impl Into<String>) -> Self {
        Self {
            needle: needle.into(),
        }
    }
}

impl Filter for SubstringFilter {
    fn matches(&self, event: &Event) -> bool {
        event.original.contains(&self.needle)
    }
}

// ---------------------------------------------------------------------------
// MockBuilder
// ---------------------------------------------------------------------------

/// A programmable [`AssetBuilder`] for tests.
///
/// Unconfigured names build successfully: the policy is a
/// [`ScriptedPolicy`] referencing itself, the filter matches everything.
#[derive(Debug, Default, Clone)]
pub struct MockBuilder {
    fail_builds: BTreeSet<String>,
    eval_failures: BTreeSet<String>,
    filter_needles: BTreeMap<String, String>,
    assets: BTreeMap<String, BTreeSet<String>>,
}

impl MockBuilder {
    /// A builder where every name succeeds.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make building `name` fail.
    #[must_use]
    pub fn failing_build(mut self, name: impl Into<String>) -> Self {
        self.fail_builds.insert(name.into());
        self
    }

    /// Make the policy `name` fail at evaluation time.
    #[must_use]
    pub fn failing_evaluation(mut self, name: impl Into<String>) -> Self {
        self.eval_failures.insert(name.into());
        self
    }

    /// Make the filter `name` match only logs containing `needle`.
    #[must_use]
    pub fn filter_matching(mut self, name: impl Into<String>, needle: impl Into<String>) -> Self {
        self.filter_needles.insert(name.into(), needle.into());
        self
    }

    /// Declare the assets referenced by the policy `name`.
    #[must_use]
    pub fn with_assets<I, S>(mut self, name: impl Into<String>, assets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.assets
            .insert(name.into(), assets.into_iter().map(Into::into).collect());
        self
    }

    fn check_buildable(&self, name: &str) -> Result<(), AssetError> {
        if name.is_empty() {
            return Err(AssetError::NotFound {
                name: name.to_owned(),
            });
        }
        if self.fail_builds.contains(name) {
            return Err(AssetError::Invalid {
                name: name.to_owned(),
                reason: "scripted build failure".to_owned(),
            });
        }
        Ok(())
    }
}

impl AssetBuilder for MockBuilder {
    fn build_policy(&self, name: &str) -> Result<Box<dyn Policy>, AssetError> {
        self.check_buildable(name)?;
        Ok(Box::new(ScriptedPolicy {
            name: name.to_owned(),
            assets: self
                .assets
                .get(name)
                .cloned()
                .unwrap_or_else(|| BTreeSet::from([name.to_owned()])),
            fail: self.eval_failures.contains(name),
        }))
    }

    fn build_filter(&self, name: &str) -> Result<Box<dyn Filter>, AssetError> {
        self.check_buildable(name)?;
        match self.filter_needles.get(name) {
            Some(needle) => Ok(Box::new(SubstringFilter::new(needle.clone()))),
            None => Ok(Box::new(AlwaysFilter(true))),
        }
    }

    fn assets_of(&self, name: &str) -> Result<BTreeSet<String>, AssetError> {
        self.check_buildable(name)?;
        Ok(self
            .assets
            .get(name)
            .cloned()
            .unwrap_or_else(|| BTreeSet::from([name.to_owned()])))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TraceLevel;

    #[test]
    fn default_builds_succeed() {
        let builder = MockBuilder::new();
        assert!(builder.build_policy("policy/test/0").is_ok());
        assert!(builder.build_filter("filter/test/0").is_ok());
        assert_eq!(
            builder.assets_of("policy/test/0").unwrap(),
            BTreeSet::from(["policy/test/0".to_owned()])
        );
    }

    #[test]
    fn scripted_build_failures() {
        let builder = MockBuilder::new().failing_build("policy/bad/0");
        assert!(matches!(
            builder.build_policy("policy/bad/0"),
            Err(AssetError::Invalid { .. })
        ));
        assert!(builder.build_policy("policy/good/0").is_ok());
    }

    #[test]
    fn scripted_policy_stamps_and_traces() {
        let builder = MockBuilder::new().with_assets("policy/test/0", ["decoder/a", "decoder/b"]);
        let policy = builder.build_policy("policy/test/0").unwrap();

        let mut event = Event::new(1, "loc", "raw log");
        let mut sink = TraceSink::new(TraceLevel::All, BTreeSet::new());
        policy.evaluate(&mut event, &mut sink).unwrap();

        assert_eq!(event.field("policy"), Some(&serde_json::json!("policy/test/0")));
        assert_eq!(
            sink.into_lines(),
            vec!["[decoder/a] applied", "[decoder/b] applied"]
        );
    }

    #[test]
    fn scripted_evaluation_failure() {
        let builder = MockBuilder::new().failing_evaluation("policy/fails/0");
        let policy = builder.build_policy("policy/fails/0").unwrap();
        let mut event = Event::new(1, "loc", "raw");
        let err = policy
            .evaluate(&mut event, &mut TraceSink::disabled())
            .unwrap_err();
        assert!(matches!(err, AssetError::Evaluation { .. }));
    }

    #[test]
    fn substring_filter_inspects_the_log() {
        let builder = MockBuilder::new().filter_matching("filter/ssh/0", "sshd");
        let filter = builder.build_filter("filter/ssh/0").unwrap();
        assert!(filter.matches(&Event::new(1, "loc", "sshd: accepted password")));
        assert!(!filter.matches(&Event::new(1, "loc", "cron: job started")));
    }
}
