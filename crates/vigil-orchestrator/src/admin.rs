// SPDX-License-Identifier: MIT OR Apache-2.0
//! The admin request/reply protocol applied identically on every worker.

use std::collections::BTreeSet;
use vigil_router::{
    Entry, EntryPost, Router, TestEntry, TestEntryPost, Tester,
};

use crate::error::EngineError;

/// One administrative operation, tagged by target (router or tester).
///
/// The orchestrator broadcasts these so worker replicas observe the same
/// admin sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminRequest {
    /// Add a production entry.
    RouterAdd(EntryPost),
    /// Remove a production entry.
    RouterRemove(String),
    /// Snapshot a production entry.
    RouterGet(String),
    /// Enable a production entry.
    RouterEnable(String),
    /// Rebuild a production entry's callables.
    RouterRebuild(String),
    /// Move a production entry to a new priority.
    RouterChangePriority(String, u32),
    /// Snapshot every production entry.
    RouterEntries,
    /// Add a tester entry.
    TesterAdd(TestEntryPost),
    /// Remove a tester entry.
    TesterRemove(String),
    /// Snapshot a tester entry.
    TesterGet(String),
    /// Enable a tester entry.
    TesterEnable(String),
    /// Rebuild a tester entry's policy.
    TesterRebuild(String),
    /// Snapshot every tester entry.
    TesterEntries,
    /// Assets referenced by a tester entry's policy.
    TesterAssets(String),
}

impl AdminRequest {
    /// Stable operation name, for logs and scripted mock failures.
    #[must_use]
    pub fn op(&self) -> &'static str {
        match self {
            Self::RouterAdd(_) => "router_add",
            Self::RouterRemove(_) => "router_remove",
            Self::RouterGet(_) => "router_get",
            Self::RouterEnable(_) => "router_enable",
            Self::RouterRebuild(_) => "router_rebuild",
            Self::RouterChangePriority(_, _) => "router_change_priority",
            Self::RouterEntries => "router_entries",
            Self::TesterAdd(_) => "tester_add",
            Self::TesterRemove(_) => "tester_remove",
            Self::TesterGet(_) => "tester_get",
            Self::TesterEnable(_) => "tester_enable",
            Self::TesterRebuild(_) => "tester_rebuild",
            Self::TesterEntries => "tester_entries",
            Self::TesterAssets(_) => "tester_assets",
        }
    }
}

/// Reply to an [`AdminRequest`].
#[derive(Debug, Clone, PartialEq)]
pub enum AdminReply {
    /// Operation succeeded with no payload.
    Unit,
    /// A production entry snapshot.
    RouterEntry(Entry),
    /// All production entries.
    RouterEntries(Vec<Entry>),
    /// A tester entry snapshot.
    TesterEntry(TestEntry),
    /// All tester entries.
    TesterEntries(Vec<TestEntry>),
    /// Asset names.
    Assets(BTreeSet<String>),
}

/// Apply one admin request to a worker's router + tester pair.
pub(crate) fn apply(
    router: &mut Router,
    tester: &mut Tester,
    request: AdminRequest,
) -> Result<AdminReply, EngineError> {
    let reply = match request {
        AdminRequest::RouterAdd(post) => {
            router.add_entry(post)?;
            AdminReply::Unit
        }
        AdminRequest::RouterRemove(name) => {
            router.remove_entry(&name)?;
            AdminReply::Unit
        }
        AdminRequest::RouterGet(name) => AdminReply::RouterEntry(router.get_entry(&name)?),
        AdminRequest::RouterEnable(name) => {
            router.enable_entry(&name)?;
            AdminReply::Unit
        }
        AdminRequest::RouterRebuild(name) => {
            router.rebuild_entry(&name)?;
            AdminReply::Unit
        }
        AdminRequest::RouterChangePriority(name, priority) => {
            router.change_priority(&name, priority)?;
            AdminReply::Unit
        }
        AdminRequest::RouterEntries => AdminReply::RouterEntries(router.entries()),
        AdminRequest::TesterAdd(post) => {
            tester.add_entry(post)?;
            AdminReply::Unit
        }
        AdminRequest::TesterRemove(name) => {
            tester.remove_entry(&name)?;
            AdminReply::Unit
        }
        AdminRequest::TesterGet(name) => AdminReply::TesterEntry(tester.get_entry(&name)?),
        AdminRequest::TesterEnable(name) => {
            tester.enable_entry(&name)?;
            AdminReply::Unit
        }
        AdminRequest::TesterRebuild(name) => {
            tester.rebuild_entry(&name)?;
            AdminReply::Unit
        }
        AdminRequest::TesterEntries => AdminReply::TesterEntries(tester.entries()),
        AdminRequest::TesterAssets(name) => AdminReply::Assets(tester.get_assets(&name)?),
    };
    Ok(reply)
}
