// SPDX-License-Identifier: MIT OR Apache-2.0
//! The orchestrator: admin fan-out over the worker pool, event
//! multiplexing, and state persistence.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, error, info, warn};

use vigil_asset::TraceLevel;
use vigil_event::Event;
use vigil_router::{Entry, EntryPost, EntryState, TestEntry, TestEntryPost, TestOptions, TestOutput};

use crate::admin::{AdminReply, AdminRequest};
use crate::error::EngineError;
use crate::store::{StateDoc, Store};
use crate::worker::{TestFuture, Worker};

/// Store key the orchestrator persists its state document under.
pub const DEFAULT_STATE_KEY: &str = "router/state/0";

/// Default sandbox-run timeout.
pub const DEFAULT_TEST_TIMEOUT: Duration = Duration::from_millis(1000);

/// Coordinates a pool of interchangeable workers.
///
/// Admin calls validate on the caller's thread, broadcast to every worker
/// (with compensating rollback on partial failure), and persist the
/// resulting state. Events dispatch to the worker with the shortest inbox.
pub struct Orchestrator {
    workers: Vec<Box<dyn Worker>>,
    store: Arc<dyn Store>,
    state_key: String,
    test_timeout: Duration,
    started: AtomicBool,
    diverged: AtomicBool,
}

impl Orchestrator {
    /// An orchestrator over the given worker replicas and store.
    pub fn new(workers: Vec<Box<dyn Worker>>, store: Arc<dyn Store>) -> Self {
        Self {
            workers,
            store,
            state_key: DEFAULT_STATE_KEY.to_owned(),
            test_timeout: DEFAULT_TEST_TIMEOUT,
            started: AtomicBool::new(false),
            diverged: AtomicBool::new(false),
        }
    }

    /// Override the sandbox-run timeout.
    #[must_use]
    pub fn with_test_timeout(mut self, timeout: Duration) -> Self {
        self.test_timeout = timeout;
        self
    }

    /// Override the store key for the persisted state document.
    #[must_use]
    pub fn with_state_key(mut self, key: impl Into<String>) -> Self {
        self.state_key = key.into();
        self
    }

    /// The configured sandbox-run timeout.
    pub fn test_timeout(&self) -> Duration {
        self.test_timeout
    }

    /// Whether a failed rollback left the pool in a diverged state.
    pub fn is_diverged(&self) -> bool {
        self.diverged.load(Ordering::SeqCst)
    }

    // -- lifecycle ----------------------------------------------------------

    /// Start every worker and replay the persisted state document.
    pub fn start(&self) -> Result<(), EngineError> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(EngineError::internal("orchestrator already started"));
        }
        for worker in &self.workers {
            worker.start()?;
        }
        self.restore();
        info!(workers = self.workers.len(), "orchestrator started");
        Ok(())
    }

    /// Persist the final state and stop every worker.
    ///
    /// In-flight work drains; pending test futures complete with a
    /// cancellation error; subsequent submissions are refused.
    pub fn stop(&self) {
        if !self.started.swap(false, Ordering::SeqCst) {
            return;
        }
        if let Err(err) = self.persist() {
            warn!(%err, "failed to persist state during shutdown");
        }
        for worker in &self.workers {
            worker.stop();
        }
        info!("orchestrator stopped");
    }

    // -- router admin -------------------------------------------------------

    /// Create a production entry on every worker, enable it, and persist.
    pub fn post_entry(&self, entry: EntryPost) -> Result<(), EngineError> {
        self.ensure_admin()?;
        require_named(&entry.name, "entry name")?;
        require_named(&entry.policy, "policy name")?;
        require_named(&entry.filter, "filter name")?;
        if entry.priority == 0 {
            return Err(EngineError::validation("priority 0 is reserved"));
        }

        let name = entry.name.clone();
        if let Err((applied, err)) = self.fan_out(&AdminRequest::RouterAdd(entry)) {
            self.rollback(applied, AdminRequest::RouterRemove(name))?;
            return Err(err);
        }
        if let Err((_, err)) = self.fan_out(&AdminRequest::RouterEnable(name.clone())) {
            self.rollback(self.workers.len(), AdminRequest::RouterRemove(name))?;
            return Err(err);
        }
        self.persist()
    }

    /// Remove a production entry from every worker and persist.
    pub fn delete_entry(&self, name: &str) -> Result<(), EngineError> {
        self.ensure_admin()?;
        require_named(name, "entry name")?;
        self.fan_out(&AdminRequest::RouterRemove(name.to_owned()))
            .map_err(|(_, err)| err)?;
        self.persist()
    }

    /// Snapshot a production entry (any worker; they agree).
    pub fn get_entry(&self, name: &str) -> Result<Entry, EngineError> {
        self.ensure_admin()?;
        require_named(name, "entry name")?;
        match self.first_worker()?.admin(AdminRequest::RouterGet(name.to_owned()))? {
            AdminReply::RouterEntry(entry) => Ok(entry),
            other => Err(unexpected_reply("router_get", &other)),
        }
    }

    /// Rebuild a production entry on every worker, re-enable it, persist.
    pub fn reload_entry(&self, name: &str) -> Result<(), EngineError> {
        self.ensure_admin()?;
        require_named(name, "entry name")?;
        self.fan_out(&AdminRequest::RouterRebuild(name.to_owned()))
            .map_err(|(_, err)| err)?;
        self.fan_out(&AdminRequest::RouterEnable(name.to_owned()))
            .map_err(|(_, err)| err)?;
        self.persist()
    }

    /// Move a production entry to a new priority on every worker, persist.
    pub fn change_entry_priority(&self, name: &str, priority: u32) -> Result<(), EngineError> {
        self.ensure_admin()?;
        require_named(name, "entry name")?;
        self.fan_out(&AdminRequest::RouterChangePriority(name.to_owned(), priority))
            .map_err(|(_, err)| err)?;
        self.persist()
    }

    /// Ordered snapshot of the production entries (any worker).
    pub fn get_entries(&self) -> Result<Vec<Entry>, EngineError> {
        self.ensure_admin()?;
        match self.first_worker()?.admin(AdminRequest::RouterEntries)? {
            AdminReply::RouterEntries(entries) => Ok(entries),
            other => Err(unexpected_reply("router_entries", &other)),
        }
    }

    // -- tester admin -------------------------------------------------------

    /// Create a tester entry on every worker, enable it, and persist.
    pub fn post_test_entry(&self, entry: TestEntryPost) -> Result<(), EngineError> {
        self.ensure_admin()?;
        require_named(&entry.name, "entry name")?;
        require_named(&entry.policy, "policy name")?;

        let name = entry.name.clone();
        if let Err((applied, err)) = self.fan_out(&AdminRequest::TesterAdd(entry)) {
            self.rollback(applied, AdminRequest::TesterRemove(name))?;
            return Err(err);
        }
        if let Err((_, err)) = self.fan_out(&AdminRequest::TesterEnable(name.clone())) {
            self.rollback(self.workers.len(), AdminRequest::TesterRemove(name))?;
            return Err(err);
        }
        self.persist()
    }

    /// Remove a tester entry from every worker and persist.
    pub fn delete_test_entry(&self, name: &str) -> Result<(), EngineError> {
        self.ensure_admin()?;
        require_named(name, "entry name")?;
        self.fan_out(&AdminRequest::TesterRemove(name.to_owned()))
            .map_err(|(_, err)| err)?;
        self.persist()
    }

    /// Snapshot a tester entry (any worker).
    pub fn get_test_entry(&self, name: &str) -> Result<TestEntry, EngineError> {
        self.ensure_admin()?;
        require_named(name, "entry name")?;
        match self.first_worker()?.admin(AdminRequest::TesterGet(name.to_owned()))? {
            AdminReply::TesterEntry(entry) => Ok(entry),
            other => Err(unexpected_reply("tester_get", &other)),
        }
    }

    /// Rebuild a tester entry on every worker, re-enable it, persist.
    pub fn reload_test_entry(&self, name: &str) -> Result<(), EngineError> {
        self.ensure_admin()?;
        require_named(name, "entry name")?;
        self.fan_out(&AdminRequest::TesterRebuild(name.to_owned()))
            .map_err(|(_, err)| err)?;
        self.fan_out(&AdminRequest::TesterEnable(name.to_owned()))
            .map_err(|(_, err)| err)?;
        self.persist()
    }

    /// Snapshot of the tester entries (any worker).
    pub fn get_test_entries(&self) -> Result<Vec<TestEntry>, EngineError> {
        self.ensure_admin()?;
        match self.first_worker()?.admin(AdminRequest::TesterEntries)? {
            AdminReply::TesterEntries(entries) => Ok(entries),
            other => Err(unexpected_reply("tester_entries", &other)),
        }
    }

    /// Assets referenced by a tester entry's policy (any worker).
    pub fn get_assets(&self, name: &str) -> Result<std::collections::BTreeSet<String>, EngineError> {
        self.ensure_admin()?;
        require_named(name, "entry name")?;
        match self.first_worker()?.admin(AdminRequest::TesterAssets(name.to_owned()))? {
            AdminReply::Assets(assets) => Ok(assets),
            other => Err(unexpected_reply("tester_assets", &other)),
        }
    }

    // -- event ingestion ----------------------------------------------------

    /// Parse raw collector framing and dispatch the event to the
    /// least-busy worker. Returns as soon as the event is queued.
    pub fn post_str_event(&self, raw: &str) -> Result<(), EngineError> {
        let event = Event::from_wire(raw)?;
        self.ensure_started()?;
        let worker = self.least_busy()?;
        debug!(queue = event.queue, location = %event.location, "event dispatched");
        worker.post_event(event)
    }

    /// Queue a sandbox run and return its completion future.
    ///
    /// The framing is parsed first, then the options are validated; a
    /// request that is broken both ways surfaces the protocol error. The
    /// future is bounded by the configured test timeout when waited on via
    /// [`Orchestrator::run_test`].
    pub fn ingest_test(&self, raw: &str, options: TestOptions) -> Result<TestFuture, EngineError> {
        let event = Event::from_wire(raw)?;
        require_named(&options.entry, "tester entry name")?;
        if options.trace_level == TraceLevel::None && !options.asset_filter.is_empty() {
            return Err(EngineError::validation(
                "an asset filter requires a trace level above none",
            ));
        }
        self.ensure_started()?;
        self.least_busy()?.post_test(event, options)
    }

    /// [`Orchestrator::ingest_test`] + wait with the configured timeout.
    pub fn run_test(&self, raw: &str, options: TestOptions) -> Result<TestOutput, EngineError> {
        self.ingest_test(raw, options)?.wait(self.test_timeout)
    }

    // -- internals ----------------------------------------------------------

    fn ensure_admin(&self) -> Result<(), EngineError> {
        if self.is_diverged() {
            return Err(EngineError::Diverged);
        }
        Ok(())
    }

    fn ensure_started(&self) -> Result<(), EngineError> {
        if self.started.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(EngineError::Stopped)
        }
    }

    fn first_worker(&self) -> Result<&dyn Worker, EngineError> {
        self.workers
            .first()
            .map(AsRef::as_ref)
            .ok_or_else(|| EngineError::internal("orchestrator has no workers"))
    }

    fn least_busy(&self) -> Result<&dyn Worker, EngineError> {
        self.workers
            .iter()
            .min_by_key(|w| w.pending())
            .map(AsRef::as_ref)
            .ok_or_else(|| EngineError::internal("orchestrator has no workers"))
    }

    /// Broadcast `request`; on the first failure, report how many workers
    /// had already applied it.
    fn fan_out(&self, request: &AdminRequest) -> Result<(), (usize, EngineError)> {
        for (idx, worker) in self.workers.iter().enumerate() {
            if let Err(err) = worker.admin(request.clone()) {
                warn!(op = request.op(), worker = idx, %err, "admin fan-out failed");
                return Err((idx, err));
            }
        }
        Ok(())
    }

    /// Apply the compensating `inverse` on the first `applied` workers. A
    /// compensation failure marks divergence and locks the admin surface.
    fn rollback(&self, applied: usize, inverse: AdminRequest) -> Result<(), EngineError> {
        for (idx, worker) in self.workers[..applied].iter().enumerate() {
            if let Err(err) = worker.admin(inverse.clone()) {
                self.diverged.store(true, Ordering::SeqCst);
                error!(
                    op = inverse.op(),
                    worker = idx,
                    %err,
                    "rollback compensation failed; workers diverged"
                );
                return Err(EngineError::Diverged);
            }
        }
        Ok(())
    }

    /// Write the pool's common state to the store.
    fn persist(&self) -> Result<(), EngineError> {
        let worker = self.first_worker()?;
        let router = match worker.admin(AdminRequest::RouterEntries)? {
            AdminReply::RouterEntries(entries) => entries,
            other => return Err(unexpected_reply("router_entries", &other)),
        };
        let tester = match worker.admin(AdminRequest::TesterEntries)? {
            AdminReply::TesterEntries(entries) => entries,
            other => return Err(unexpected_reply("tester_entries", &other)),
        };
        let doc = serde_json::to_value(StateDoc { router, tester })
            .map_err(|err| EngineError::internal(format!("state serialisation: {err}")))?;
        self.store.upsert_internal_doc(&self.state_key, &doc)?;
        debug!(key = %self.state_key, "state persisted");
        Ok(())
    }

    /// Best-effort replay of a previously persisted state document.
    fn restore(&self) {
        let doc = match self.store.get_internal_doc(&self.state_key) {
            Ok(Some(doc)) => doc,
            Ok(None) => return,
            Err(err) => {
                warn!(%err, "could not read persisted state");
                return;
            }
        };
        let state: StateDoc = match serde_json::from_value(doc) {
            Ok(state) => state,
            Err(err) => {
                warn!(%err, "persisted state document is unreadable, skipping restore");
                return;
            }
        };

        for entry in state.router {
            let name = entry.post.name.clone();
            let enabled = entry.state == EntryState::Enabled;
            if self.fan_out(&AdminRequest::RouterAdd(entry.post)).is_err() {
                warn!(entry = %name, "router entry skipped during restore");
                continue;
            }
            if enabled && self.fan_out(&AdminRequest::RouterEnable(name.clone())).is_err() {
                warn!(entry = %name, "router entry restored disabled");
            }
        }
        for entry in state.tester {
            let name = entry.post.name.clone();
            let enabled = entry.state == EntryState::Enabled;
            if self.fan_out(&AdminRequest::TesterAdd(entry.post)).is_err() {
                warn!(entry = %name, "tester entry skipped during restore");
                continue;
            }
            if enabled && self.fan_out(&AdminRequest::TesterEnable(name.clone())).is_err() {
                warn!(entry = %name, "tester entry restored disabled");
            }
        }
        info!("persisted state restored");
    }
}

fn require_named(value: &str, what: &str) -> Result<(), EngineError> {
    if value.is_empty() {
        Err(EngineError::validation(format!("{what} must not be empty")))
    } else {
        Ok(())
    }
}

fn unexpected_reply(op: &str, reply: &AdminReply) -> EngineError {
    EngineError::internal(format!("unexpected reply to {op}: {reply:?}"))
}
