// SPDX-License-Identifier: MIT OR Apache-2.0
//! Per-worker routing for the Vigil engine.
//!
//! Each worker pipeline owns one [`Router`] — production dispatch by
//! priority and filter predicate to a policy — and one [`Tester`] — sandbox
//! execution of policies with trace capture. Entries are created disabled
//! and enabled by the orchestrator once every worker replica holds them.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod entry;
mod production;
mod testing;

pub use entry::{Entry, EntryPost, EntryState, MAX_PRIORITY, RouterError, TestEntry, TestEntryPost};
pub use production::Router;
pub use testing::{TestOptions, TestOutput, Tester};
