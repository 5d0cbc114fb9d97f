// SPDX-License-Identifier: MIT OR Apache-2.0
//! Policy, filter, and builder contracts for the Vigil engine.
//!
//! Policies and filters are opaque callables produced by an external asset
//! builder from named definitions. Routers hold one policy + one filter per
//! entry; testers hold a policy and a [`TraceSink`] that collects the trace
//! lines a policy emits while evaluating.
//!
//! Builders produce cheap, independently constructed instances: every worker
//! gets its own copies, so no mutable policy state is ever shared across
//! threads.

#![deny(unsafe_code)]
#![warn(missing_docs)]

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use vigil_event::Event;

pub mod mock;
pub mod parse;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors surfaced by the asset builder or by policy evaluation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AssetError {
    /// The named asset does not exist in the catalog.
    #[error("asset {name:?} not found")]
    NotFound {
        /// Requested asset name.
        name: String,
    },

    /// The asset definition could not be built into a callable.
    #[error("asset {name:?} is invalid: {reason}")]
    Invalid {
        /// Asset name.
        name: String,
        /// Builder diagnostic.
        reason: String,
    },

    /// The policy returned a user error while evaluating an event.
    #[error("evaluation failed in {asset:?}: {reason}")]
    Evaluation {
        /// Asset that raised the error.
        asset: String,
        /// What the policy reported.
        reason: String,
    },
}

// ---------------------------------------------------------------------------
// Trace collection
// ---------------------------------------------------------------------------

/// How much tracing a sandbox run collects.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraceLevel {
    /// Collect nothing.
    #[default]
    None,
    /// Record only the names of assets that fired.
    AssetOnly,
    /// Record full trace lines.
    All,
}

/// Collects trace lines emitted by a policy, scoped by asset name.
///
/// An optional asset filter restricts collection to the named assets; an
/// empty filter admits every asset.
#[derive(Debug, Default)]
pub struct TraceSink {
    level: TraceLevel,
    filter: BTreeSet<String>,
    lines: Vec<String>,
}

impl TraceSink {
    /// A sink collecting at `level`, restricted to `filter` (empty = all).
    #[must_use]
    pub fn new(level: TraceLevel, filter: BTreeSet<String>) -> Self {
        Self {
            level,
            filter,
            lines: Vec::new(),
        }
    }

    /// A sink that drops everything; used on the production path.
    #[must_use]
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Record one trace line attributed to `asset`.
    pub fn emit(&mut self, asset: &str, line: &str) {
        if !self.filter.is_empty() && !self.filter.contains(asset) {
            return;
        }
        match self.level {
            TraceLevel::None => {}
            TraceLevel::AssetOnly => {
                if self.lines.last().is_none_or(|l| l != asset) {
                    self.lines.push(asset.to_owned());
                }
            }
            TraceLevel::All => self.lines.push(format!("[{asset}] {line}")),
        }
    }

    /// The collected lines, in emission order.
    #[must_use]
    pub fn into_lines(self) -> Vec<String> {
        self.lines
    }
}

// ---------------------------------------------------------------------------
// Contracts
// ---------------------------------------------------------------------------

/// A callable that transforms an event, optionally emitting traces.
pub trait Policy: Send {
    /// Evaluate `event`, writing any trace output into `sink`.
    fn evaluate(&self, event: &mut Event, sink: &mut TraceSink) -> Result<(), AssetError>;
}

/// A predicate over events.
pub trait Filter: Send {
    /// Whether `event` matches.
    fn matches(&self, event: &Event) -> bool;
}

/// Builds callables from named asset definitions.
///
/// One builder is shared by every worker; the instances it produces are not.
pub trait AssetBuilder: Send + Sync {
    /// Build the policy named `name`.
    fn build_policy(&self, name: &str) -> Result<Box<dyn Policy>, AssetError>;

    /// Build the filter named `name`.
    fn build_filter(&self, name: &str) -> Result<Box<dyn Filter>, AssetError>;

    /// The set of asset names the named policy references.
    fn assets_of(&self, name: &str) -> Result<BTreeSet<String>, AssetError>;
}
