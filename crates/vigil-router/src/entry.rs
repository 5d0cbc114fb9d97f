// SPDX-License-Identifier: MIT OR Apache-2.0
//! Entry model shared by the router and the tester.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use vigil_asset::AssetError;

/// Highest priority value an entry may use; 0 is reserved and invalid.
pub const MAX_PRIORITY: u32 = 1_000;

/// Lifecycle state of an entry. Entries start disabled and are enabled by
/// the orchestrator once every worker holds them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum EntryState {
    /// Present but not participating in dispatch.
    #[default]
    Disabled,
    /// Participating in dispatch.
    Enabled,
}

/// A request to create a production routing entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct EntryPost {
    /// Unique entry name.
    pub name: String,
    /// Policy asset evaluated when the entry matches.
    pub policy: String,
    /// Filter asset deciding whether the entry matches.
    pub filter: String,
    /// Dispatch priority in `1..=MAX_PRIORITY`; lower wins.
    pub priority: u32,
}

impl EntryPost {
    /// Convenience constructor for literals.
    pub fn new(
        name: impl Into<String>,
        policy: impl Into<String>,
        filter: impl Into<String>,
        priority: u32,
    ) -> Self {
        Self {
            name: name.into(),
            policy: policy.into(),
            filter: filter.into(),
            priority,
        }
    }
}

/// Snapshot of a production entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Entry {
    /// The entry definition.
    #[serde(flatten)]
    pub post: EntryPost,
    /// Current lifecycle state.
    pub state: EntryState,
}

/// A request to create a tester entry. No filter, no priority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct TestEntryPost {
    /// Unique entry name.
    pub name: String,
    /// Policy asset evaluated by sandbox runs.
    pub policy: String,
}

impl TestEntryPost {
    /// Convenience constructor for literals.
    pub fn new(name: impl Into<String>, policy: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            policy: policy.into(),
        }
    }
}

/// Snapshot of a tester entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct TestEntry {
    /// The entry definition.
    #[serde(flatten)]
    pub post: TestEntryPost,
    /// Current lifecycle state.
    pub state: EntryState,
    /// Trace output of the most recent sandbox run, if any.
    pub last_trace: Option<String>,
}

/// Errors returned by router and tester operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RouterError {
    /// An entry with the same name already exists.
    #[error("an entry named {name:?} already exists")]
    DuplicateName {
        /// Conflicting name.
        name: String,
    },

    /// The priority is already held by an enabled entry.
    #[error("priority {priority} is already held by {holder:?}")]
    PriorityTaken {
        /// Requested priority.
        priority: u32,
        /// Entry currently holding it.
        holder: String,
    },

    /// The priority is zero or above [`MAX_PRIORITY`].
    #[error("priority {priority} is outside 1..={MAX_PRIORITY}")]
    InvalidPriority {
        /// Requested priority.
        priority: u32,
    },

    /// No entry with the given name.
    #[error("no entry named {name:?}")]
    NotFound {
        /// Requested name.
        name: String,
    },

    /// The entry exists but is disabled.
    #[error("entry {name:?} is disabled")]
    Disabled {
        /// Entry name.
        name: String,
    },

    /// The asset builder or a policy evaluation failed.
    #[error(transparent)]
    Asset(#[from] AssetError),

    /// No enabled entry's filter matched the event.
    #[error("no route matched the event")]
    NoMatch,
}
