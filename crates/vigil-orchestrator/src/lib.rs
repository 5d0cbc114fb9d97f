// SPDX-License-Identifier: MIT OR Apache-2.0
//! Worker pool and admin orchestration for the Vigil engine.
//!
//! An [`Orchestrator`] owns a vector of interchangeable [`Worker`]
//! replicas, each running one router + one tester on a dedicated OS thread
//! behind a FIFO. Admin calls broadcast to every worker with compensating
//! rollback; production events go to exactly one worker; sandbox runs
//! return a [`TestFuture`] bounded by the configured timeout. The common
//! worker state persists as a single document in a [`Store`].
//!
//! Mock implementations of the worker and store contracts live in
//! [`mock`], next to the production ones, so orchestration logic is
//! testable without threads or a real catalog.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod admin;
mod error;
pub mod mock;
mod orchestrator;
mod store;
mod worker;

pub use admin::{AdminReply, AdminRequest};
pub use error::EngineError;
pub use orchestrator::{DEFAULT_STATE_KEY, DEFAULT_TEST_TIMEOUT, Orchestrator};
pub use store::{MemStore, StateDoc, Store, StoreError};
pub use worker::{EngineWorker, TestFuture, Worker};

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Lock a mutex, recovering the guard if a holder panicked.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
