// SPDX-License-Identifier: MIT OR Apache-2.0
//! Vigil — the event-processing core of a security log ingestion engine.
//!
//! This umbrella crate re-exports the member crates and provides
//! [`build_engine`], which wires an orchestrator over a pool of production
//! workers from an [`EngineConfig`].
//!
//! - [`vigil_hlp`] — the HLP template language and semantic decoders;
//! - [`vigil_event`] — the event model and collector wire framing;
//! - [`vigil_asset`] — policy/filter/builder contracts;
//! - [`vigil_router`] — the per-worker router and tester;
//! - [`vigil_orchestrator`] — workers, orchestrator, and store;
//! - [`vigil_config`] — engine configuration.

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub use vigil_asset as asset;
pub use vigil_config as config;
pub use vigil_event as event;
pub use vigil_hlp as hlp;
pub use vigil_orchestrator as orchestrator;
pub use vigil_router as router;

use std::sync::Arc;
use vigil_asset::AssetBuilder;
use vigil_config::EngineConfig;
use vigil_orchestrator::{EngineWorker, Orchestrator, Store, Worker};

/// Build an orchestrator over `config.workers` production workers, all
/// sharing `builder` for their callables and `store` for persistence.
///
/// The returned orchestrator is not yet started.
pub fn build_engine(
    config: &EngineConfig,
    builder: Arc<dyn AssetBuilder>,
    store: Arc<dyn Store>,
) -> Orchestrator {
    let workers: Vec<Box<dyn Worker>> = (0..config.workers)
        .map(|id| Box::new(EngineWorker::new(id, Arc::clone(&builder))) as Box<dyn Worker>)
        .collect();
    Orchestrator::new(workers, store)
        .with_test_timeout(config.test_timeout())
        .with_state_key(config.state_doc_key.clone())
}
