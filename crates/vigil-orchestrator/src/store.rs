// SPDX-License-Identifier: MIT OR Apache-2.0
//! Configuration store abstraction and the persisted state document.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Mutex;
use vigil_router::{Entry, TestEntry};

/// Errors from the configuration store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The backend rejected or lost the operation.
    #[error("store backend failure: {reason}")]
    Backend {
        /// Backend diagnostic.
        reason: String,
    },
}

/// Internal-document store consumed by the orchestrator.
///
/// Writes are serialized behind the orchestrator; the store only has to
/// guarantee read-your-writes for a single writer.
pub trait Store: Send + Sync {
    /// Create or replace the document under `key`. Idempotent.
    fn upsert_internal_doc(&self, key: &str, doc: &serde_json::Value) -> Result<(), StoreError>;

    /// Fetch the document under `key`, if present.
    fn get_internal_doc(&self, key: &str) -> Result<Option<serde_json::Value>, StoreError>;
}

/// The single persisted document: both entry tables of the worker pool.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct StateDoc {
    /// Production router entries, in priority order.
    pub router: Vec<Entry>,
    /// Tester entries, in insertion order.
    pub tester: Vec<TestEntry>,
}

/// In-memory [`Store`], the production default for embedded use.
#[derive(Debug, Default)]
pub struct MemStore {
    docs: Mutex<BTreeMap<String, serde_json::Value>>,
}

impl MemStore {
    /// An empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Store for MemStore {
    fn upsert_internal_doc(&self, key: &str, doc: &serde_json::Value) -> Result<(), StoreError> {
        crate::lock(&self.docs).insert(key.to_owned(), doc.clone());
        Ok(())
    }

    fn get_internal_doc(&self, key: &str) -> Result<Option<serde_json::Value>, StoreError> {
        Ok(crate::lock(&self.docs).get(key).cloned())
    }
}
