// SPDX-License-Identifier: MIT OR Apache-2.0
//! The sandbox tester: named policies run against injected events with
//! trace capture, without touching production routing.

use crate::entry::{EntryState, RouterError, TestEntry, TestEntryPost};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::debug;
use vigil_asset::{AssetBuilder, Policy, TraceLevel, TraceSink};
use vigil_event::Event;

// ---------------------------------------------------------------------------
// Options and output
// ---------------------------------------------------------------------------

/// Options for one sandbox run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestOptions {
    /// Tester entry to run.
    pub entry: String,
    /// How much tracing to collect.
    #[serde(default)]
    pub trace_level: TraceLevel,
    /// Restrict collected traces to these assets; empty admits all.
    #[serde(default)]
    pub asset_filter: BTreeSet<String>,
}

impl TestOptions {
    /// Options running `entry` with no tracing.
    pub fn new(entry: impl Into<String>) -> Self {
        Self {
            entry: entry.into(),
            trace_level: TraceLevel::None,
            asset_filter: BTreeSet::new(),
        }
    }

    /// Same options at a different trace level.
    #[must_use]
    pub fn with_level(mut self, level: TraceLevel) -> Self {
        self.trace_level = level;
        self
    }

    /// Same options restricted to the given assets.
    #[must_use]
    pub fn with_asset_filter<I, S>(mut self, assets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.asset_filter = assets.into_iter().map(Into::into).collect();
        self
    }
}

/// Result of a sandbox run: the transformed event plus collected traces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestOutput {
    /// The event after policy evaluation.
    pub event: Event,
    /// Trace lines, in emission order.
    pub traces: Vec<String>,
}

// ---------------------------------------------------------------------------
// Tester
// ---------------------------------------------------------------------------

struct TestSlot {
    meta: TestEntry,
    policy: Box<dyn Policy>,
}

/// Holds tester entries and executes sandbox runs against them.
pub struct Tester {
    builder: Arc<dyn AssetBuilder>,
    slots: Vec<TestSlot>,
}

impl Tester {
    /// An empty tester building its policies with `builder`.
    pub fn new(builder: Arc<dyn AssetBuilder>) -> Self {
        Self {
            builder,
            slots: Vec::new(),
        }
    }

    /// Add a new entry in the disabled state. Rejects duplicate names.
    pub fn add_entry(&mut self, post: TestEntryPost) -> Result<(), RouterError> {
        if self.slots.iter().any(|s| s.meta.post.name == post.name) {
            return Err(RouterError::DuplicateName { name: post.name });
        }
        let policy = self.builder.build_policy(&post.policy)?;
        debug!(entry = %post.name, "tester entry added");
        self.slots.push(TestSlot {
            meta: TestEntry {
                post,
                state: EntryState::Disabled,
                last_trace: None,
            },
            policy,
        });
        Ok(())
    }

    /// Remove the named entry.
    pub fn remove_entry(&mut self, name: &str) -> Result<(), RouterError> {
        let idx = self.index_of(name)?;
        self.slots.remove(idx);
        debug!(entry = %name, "tester entry removed");
        Ok(())
    }

    /// Snapshot of the named entry.
    pub fn get_entry(&self, name: &str) -> Result<TestEntry, RouterError> {
        Ok(self.slots[self.index_of(name)?].meta.clone())
    }

    /// Transition the named entry to enabled.
    pub fn enable_entry(&mut self, name: &str) -> Result<(), RouterError> {
        let idx = self.index_of(name)?;
        self.slots[idx].meta.state = EntryState::Enabled;
        Ok(())
    }

    /// Rebuild the named entry's policy; on failure the old policy stays.
    pub fn rebuild_entry(&mut self, name: &str) -> Result<(), RouterError> {
        let idx = self.index_of(name)?;
        let policy = self.builder.build_policy(&self.slots[idx].meta.post.policy)?;
        self.slots[idx].policy = policy;
        debug!(entry = %name, "tester entry rebuilt");
        Ok(())
    }

    /// Snapshot of every entry, in insertion order.
    pub fn entries(&self) -> Vec<TestEntry> {
        self.slots.iter().map(|s| s.meta.clone()).collect()
    }

    /// The assets referenced by the named entry's policy.
    pub fn get_assets(&self, name: &str) -> Result<BTreeSet<String>, RouterError> {
        let idx = self.index_of(name)?;
        Ok(self.builder.assets_of(&self.slots[idx].meta.post.policy)?)
    }

    /// Run `event` through the named entry's policy, collecting traces per
    /// `options`. Updates the entry's `last_trace`.
    pub fn ingest(&mut self, event: Event, options: &TestOptions) -> Result<TestOutput, RouterError> {
        let idx = self.index_of(&options.entry)?;
        let slot = &mut self.slots[idx];
        if slot.meta.state != EntryState::Enabled {
            return Err(RouterError::Disabled {
                name: options.entry.clone(),
            });
        }

        let mut event = event;
        let mut sink = TraceSink::new(options.trace_level, options.asset_filter.clone());
        slot.policy.evaluate(&mut event, &mut sink)?;

        let traces = sink.into_lines();
        slot.meta.last_trace = if traces.is_empty() {
            None
        } else {
            Some(traces.join("\n"))
        };
        debug!(entry = %options.entry, traces = traces.len(), "sandbox run finished");
        Ok(TestOutput { event, traces })
    }

    fn index_of(&self, name: &str) -> Result<usize, RouterError> {
        self.slots
            .iter()
            .position(|s| s.meta.post.name == name)
            .ok_or_else(|| RouterError::NotFound {
                name: name.to_owned(),
            })
    }
}
