// SPDX-License-Identifier: MIT OR Apache-2.0
//! Mock worker and store for orchestrator tests.
//!
//! [`MockWorker`] applies admin requests synchronously to a real router +
//! tester pair (built over [`vigil_asset::mock::MockBuilder`]), records the
//! admin sequence, and can be scripted to fail specific operations.
//! [`MockStore`] counts upserts and can be switched into a failing mode.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use vigil_asset::mock::MockBuilder;
use vigil_event::Event;
use vigil_router::{Router, TestOptions, Tester};

use crate::admin::{AdminReply, AdminRequest, apply};
use crate::error::EngineError;
use crate::store::{MemStore, Store, StoreError};
use crate::worker::{TestFuture, Worker};

// ---------------------------------------------------------------------------
// MockWorker
// ---------------------------------------------------------------------------

struct MockInner {
    router: Router,
    tester: Tester,
    admin_log: Vec<&'static str>,
    events: Vec<Event>,
}

/// A [`Worker`] replica without a thread: requests apply on the caller's
/// stack, which keeps orchestrator tests deterministic.
pub struct MockWorker {
    inner: Mutex<MockInner>,
    fail_ops: BTreeSet<&'static str>,
    started: AtomicBool,
    stopped: AtomicBool,
}

impl Default for MockWorker {
    fn default() -> Self {
        Self::new(MockBuilder::new())
    }
}

impl MockWorker {
    /// A mock worker whose callables come from `builder`.
    #[must_use]
    pub fn new(builder: MockBuilder) -> Self {
        let builder = Arc::new(builder);
        Self {
            inner: Mutex::new(MockInner {
                router: Router::new(builder.clone()),
                tester: Tester::new(builder),
                admin_log: Vec::new(),
                events: Vec::new(),
            }),
            fail_ops: BTreeSet::new(),
            started: AtomicBool::new(false),
            stopped: AtomicBool::new(false),
        }
    }

    /// Script the named admin operation (see [`AdminRequest::op`]) to fail.
    #[must_use]
    pub fn failing_op(mut self, op: &'static str) -> Self {
        self.fail_ops.insert(op);
        self
    }

    /// Whether `start` was called.
    pub fn was_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    /// Whether `stop` was called.
    pub fn was_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    /// The operations applied so far, in order.
    pub fn admin_ops(&self) -> Vec<&'static str> {
        crate::lock(&self.inner).admin_log.clone()
    }

    /// Production events received so far.
    pub fn events(&self) -> Vec<Event> {
        crate::lock(&self.inner).events.clone()
    }
}

impl Worker for MockWorker {
    fn start(&self) -> Result<(), EngineError> {
        self.started.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }

    fn admin(&self, request: AdminRequest) -> Result<AdminReply, EngineError> {
        let op = request.op();
        if self.fail_ops.contains(op) {
            return Err(EngineError::internal(format!("scripted failure in {op}")));
        }
        let mut inner = crate::lock(&self.inner);
        inner.admin_log.push(op);
        let MockInner { router, tester, .. } = &mut *inner;
        apply(router, tester, request)
    }

    fn post_event(&self, event: Event) -> Result<(), EngineError> {
        let mut inner = crate::lock(&self.inner);
        let mut routed = event.clone();
        if let Err(err) = inner.router.ingest(&mut routed) {
            tracing::debug!(%err, "mock worker dropped event");
        }
        inner.events.push(event);
        Ok(())
    }

    fn post_test(&self, event: Event, options: TestOptions) -> Result<TestFuture, EngineError> {
        let (tx, rx) = crossbeam_channel::bounded(1);
        let result = crate::lock(&self.inner)
            .tester
            .ingest(event, &options)
            .map_err(EngineError::from);
        let _ = tx.send(result);
        Ok(TestFuture::new(rx))
    }

    fn pending(&self) -> usize {
        0
    }
}

// ---------------------------------------------------------------------------
// MockStore
// ---------------------------------------------------------------------------

/// A [`Store`] with scripted failures and an upsert counter.
#[derive(Debug, Default)]
pub struct MockStore {
    inner: MemStore,
    failing: AtomicBool,
    upserts: AtomicUsize,
}

impl MockStore {
    /// A working mock store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Switch upserts into the failing mode (or back).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of successful upserts.
    pub fn upserts(&self) -> usize {
        self.upserts.load(Ordering::SeqCst)
    }
}

impl Store for MockStore {
    fn upsert_internal_doc(&self, key: &str, doc: &serde_json::Value) -> Result<(), StoreError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::Backend {
                reason: "scripted store failure".to_owned(),
            });
        }
        self.inner.upsert_internal_doc(key, doc)?;
        self.upserts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn get_internal_doc(&self, key: &str) -> Result<Option<serde_json::Value>, StoreError> {
        self.inner.get_internal_doc(key)
    }
}
