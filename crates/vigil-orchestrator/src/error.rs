// SPDX-License-Identifier: MIT OR Apache-2.0
//! Engine-level error type.

use vigil_event::ProtocolError;
use vigil_router::RouterError;

use crate::store::StoreError;

/// Errors surfaced by orchestrator and worker operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    /// Request validation failed; no worker state was touched.
    #[error("invalid request: {reason}")]
    Validation {
        /// What was wrong.
        reason: String,
    },

    /// A router or tester operation failed inside a worker.
    #[error(transparent)]
    Router(#[from] RouterError),

    /// The raw event framing could not be parsed.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The configuration store failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A sandbox run did not complete within the configured timeout.
    #[error("test run timed out")]
    Timeout,

    /// The worker went away before completing the request.
    #[error("request cancelled: worker stopped")]
    Cancelled,

    /// A rollback compensation failed; workers may disagree. The
    /// orchestrator refuses further admin calls until restarted.
    #[error("configuration drift detected, admin surface locked")]
    Diverged,

    /// The engine is not running (not started yet, or already stopped).
    #[error("engine is not running")]
    Stopped,

    /// An unexpected internal failure.
    #[error("internal error: {reason}")]
    Internal {
        /// Diagnostic detail.
        reason: String,
    },
}

impl EngineError {
    /// Shorthand for a validation error.
    pub fn validation(reason: impl Into<String>) -> Self {
        Self::Validation {
            reason: reason.into(),
        }
    }

    /// Shorthand for an internal error.
    pub fn internal(reason: impl Into<String>) -> Self {
        Self::Internal {
            reason: reason.into(),
        }
    }
}
