// SPDX-License-Identifier: MIT OR Apache-2.0
//! Worker pipelines: one router + one tester confined to a dedicated OS
//! thread, fed through a FIFO channel.

use crossbeam_channel::{Receiver, Sender, unbounded};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, warn};

use vigil_asset::AssetBuilder;
use vigil_event::Event;
use vigil_router::{Router, TestOptions, TestOutput, Tester};

use crate::admin::{AdminReply, AdminRequest, apply};
use crate::error::EngineError;

// ---------------------------------------------------------------------------
// Worker contract
// ---------------------------------------------------------------------------

/// One interchangeable pipeline replica.
///
/// The orchestrator guarantees every worker observes the same admin
/// sequence; a worker only has to apply requests in arrival order.
pub trait Worker: Send + Sync {
    /// Start processing work items.
    fn start(&self) -> Result<(), EngineError>;

    /// Drain in-flight work, refuse new submissions, and shut down.
    fn stop(&self);

    /// Apply one admin request and wait for the result.
    fn admin(&self, request: AdminRequest) -> Result<AdminReply, EngineError>;

    /// Queue one production event; the result of routing is not reported
    /// back to the caller.
    fn post_event(&self, event: Event) -> Result<(), EngineError>;

    /// Queue one sandbox run; the returned future completes when the
    /// worker thread has evaluated it.
    fn post_test(&self, event: Event, options: TestOptions) -> Result<TestFuture, EngineError>;

    /// Number of queued work items, used for least-busy dispatch.
    fn pending(&self) -> usize;
}

impl<W: Worker> Worker for Arc<W> {
    fn start(&self) -> Result<(), EngineError> {
        (**self).start()
    }
    fn stop(&self) {
        (**self).stop();
    }
    fn admin(&self, request: AdminRequest) -> Result<AdminReply, EngineError> {
        (**self).admin(request)
    }
    fn post_event(&self, event: Event) -> Result<(), EngineError> {
        (**self).post_event(event)
    }
    fn post_test(&self, event: Event, options: TestOptions) -> Result<TestFuture, EngineError> {
        (**self).post_test(event, options)
    }
    fn pending(&self) -> usize {
        (**self).pending()
    }
}

/// Completion handle for a sandbox run.
#[derive(Debug)]
pub struct TestFuture {
    rx: Receiver<Result<TestOutput, EngineError>>,
}

impl TestFuture {
    pub(crate) fn new(rx: Receiver<Result<TestOutput, EngineError>>) -> Self {
        Self { rx }
    }

    /// Wait up to `timeout` for the run to complete.
    ///
    /// On timeout the evaluation may still be running on the worker; its
    /// result is discarded.
    pub fn wait(self, timeout: Duration) -> Result<TestOutput, EngineError> {
        match self.rx.recv_timeout(timeout) {
            Ok(result) => result,
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => Err(EngineError::Timeout),
            Err(crossbeam_channel::RecvTimeoutError::Disconnected) => Err(EngineError::Cancelled),
        }
    }
}

// ---------------------------------------------------------------------------
// Production worker
// ---------------------------------------------------------------------------

enum WorkItem {
    Admin(AdminRequest, Sender<Result<AdminReply, EngineError>>),
    Event(Event),
    Test(Event, TestOptions, Sender<Result<TestOutput, EngineError>>),
    Shutdown,
}

const STATE_CREATED: u8 = 0;
const STATE_RUNNING: u8 = 1;
const STATE_STOPPED: u8 = 2;

/// The production [`Worker`]: spawns one OS thread owning a [`Router`] and
/// a [`Tester`], processing its FIFO strictly in arrival order.
pub struct EngineWorker {
    id: usize,
    builder: Arc<dyn AssetBuilder>,
    tx: Sender<WorkItem>,
    rx: Mutex<Option<Receiver<WorkItem>>>,
    handle: Mutex<Option<JoinHandle<()>>>,
    state: AtomicU8,
}

impl EngineWorker {
    /// A stopped worker with the given id; `start` spawns its thread.
    pub fn new(id: usize, builder: Arc<dyn AssetBuilder>) -> Self {
        let (tx, rx) = unbounded();
        Self {
            id,
            builder,
            tx,
            rx: Mutex::new(Some(rx)),
            handle: Mutex::new(None),
            state: AtomicU8::new(STATE_CREATED),
        }
    }

    fn ensure_running(&self) -> Result<(), EngineError> {
        if self.state.load(Ordering::SeqCst) == STATE_RUNNING {
            Ok(())
        } else {
            Err(EngineError::Stopped)
        }
    }

    fn run(id: usize, mut router: Router, mut tester: Tester, rx: Receiver<WorkItem>) {
        debug!(worker = id, "worker thread started");
        while let Ok(item) = rx.recv() {
            match item {
                WorkItem::Admin(request, reply) => {
                    let op = request.op();
                    let result = apply(&mut router, &mut tester, request);
                    if let Err(err) = &result {
                        debug!(worker = id, op, %err, "admin request failed");
                    }
                    let _ = reply.send(result);
                }
                WorkItem::Event(mut event) => match router.ingest(&mut event) {
                    Ok(()) => debug!(worker = id, "event routed"),
                    Err(err) => warn!(worker = id, %err, "event dropped"),
                },
                WorkItem::Test(event, options, reply) => {
                    let result = tester.ingest(event, &options).map_err(EngineError::from);
                    let _ = reply.send(result);
                }
                WorkItem::Shutdown => break,
            }
        }
        debug!(worker = id, "worker thread stopped");
    }
}

impl Worker for EngineWorker {
    fn start(&self) -> Result<(), EngineError> {
        let Some(rx) = crate::lock(&self.rx).take() else {
            return Err(EngineError::internal("worker already started"));
        };
        let id = self.id;
        let router = Router::new(Arc::clone(&self.builder));
        let tester = Tester::new(Arc::clone(&self.builder));
        let handle = std::thread::Builder::new()
            .name(format!("vigil-worker-{id}"))
            .spawn(move || Self::run(id, router, tester, rx))
            .map_err(|err| EngineError::internal(format!("spawn worker {id}: {err}")))?;
        *crate::lock(&self.handle) = Some(handle);
        self.state.store(STATE_RUNNING, Ordering::SeqCst);
        Ok(())
    }

    fn stop(&self) {
        if self.state.swap(STATE_STOPPED, Ordering::SeqCst) != STATE_RUNNING {
            return;
        }
        // Items already queued drain before the sentinel is reached.
        let _ = self.tx.send(WorkItem::Shutdown);
        if let Some(handle) = crate::lock(&self.handle).take() {
            if handle.join().is_err() {
                warn!(worker = self.id, "worker thread panicked");
            }
        }
    }

    fn admin(&self, request: AdminRequest) -> Result<AdminReply, EngineError> {
        self.ensure_running()?;
        let (reply_tx, reply_rx) = crossbeam_channel::bounded(1);
        self.tx
            .send(WorkItem::Admin(request, reply_tx))
            .map_err(|_| EngineError::Cancelled)?;
        reply_rx.recv().map_err(|_| EngineError::Cancelled)?
    }

    fn post_event(&self, event: Event) -> Result<(), EngineError> {
        self.ensure_running()?;
        self.tx
            .send(WorkItem::Event(event))
            .map_err(|_| EngineError::Cancelled)
    }

    fn post_test(&self, event: Event, options: TestOptions) -> Result<TestFuture, EngineError> {
        self.ensure_running()?;
        let (reply_tx, reply_rx) = crossbeam_channel::bounded(1);
        self.tx
            .send(WorkItem::Test(event, options, reply_tx))
            .map_err(|_| EngineError::Cancelled)?;
        Ok(TestFuture::new(reply_rx))
    }

    fn pending(&self) -> usize {
        self.tx.len()
    }
}

impl Drop for EngineWorker {
    fn drop(&mut self) {
        self.stop();
    }
}
