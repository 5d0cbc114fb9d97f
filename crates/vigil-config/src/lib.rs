// SPDX-License-Identifier: MIT OR Apache-2.0
//! Configuration loading and validation for the Vigil engine.
//!
//! [`EngineConfig`] carries the runtime knobs of the event-processing core:
//! worker-pool size, sandbox-run timeout, and the store key for the
//! persisted state document. Configs load from TOML, validate
//! semantically, and can report advisory [`ConfigWarning`]s.

#![deny(unsafe_code)]
#![warn(missing_docs)]

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::Path;

// ---------------------------------------------------------------------------
// Errors and warnings
// ---------------------------------------------------------------------------

/// Errors that can occur during configuration loading or validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read config {path}: {reason}")]
    Io {
        /// Path that was requested.
        path: String,
        /// OS-level detail.
        reason: String,
    },

    /// The file could not be parsed as valid TOML.
    #[error("failed to parse config: {reason}")]
    Parse {
        /// Parse error detail.
        reason: String,
    },

    /// Semantic validation failed (one or more problems).
    #[error("config validation failed: {reasons:?}")]
    Validation {
        /// Individual validation failure messages.
        reasons: Vec<String>,
    },
}

/// Advisory-level issues that do not prevent operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigWarning {
    /// A single worker gives no pipeline parallelism.
    SingleWorker,
    /// The sandbox timeout is unusually large.
    LargeTestTimeout {
        /// Configured timeout in milliseconds.
        millis: u64,
    },
}

impl std::fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigWarning::SingleWorker => {
                write!(f, "a single worker processes events strictly serially")
            }
            ConfigWarning::LargeTestTimeout { millis } => {
                write!(f, "test timeout of {millis}ms will hold callers for a long time")
            }
        }
    }
}

// ---------------------------------------------------------------------------
// EngineConfig
// ---------------------------------------------------------------------------

/// Runtime settings for one engine instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct EngineConfig {
    /// Number of worker pipelines.
    pub workers: usize,

    /// Sandbox-run timeout in milliseconds.
    pub test_timeout_ms: u64,

    /// Store key for the persisted state document.
    pub state_doc_key: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            test_timeout_ms: 1_000,
            state_doc_key: "router/state/0".to_owned(),
        }
    }
}

const MAX_TEST_TIMEOUT_WARN_MS: u64 = 60_000;

impl EngineConfig {
    /// Parse a TOML document and validate it.
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw).map_err(|err| ConfigError::Parse {
            reason: err.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load a TOML file and validate it.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|err| ConfigError::Io {
            path: path.display().to_string(),
            reason: err.to_string(),
        })?;
        Self::from_toml_str(&raw)
    }

    /// Semantic validation, accumulating every problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut reasons = Vec::new();
        if self.workers == 0 {
            reasons.push("workers must be at least 1".to_owned());
        }
        if self.test_timeout_ms == 0 {
            reasons.push("test_timeout_ms must be positive".to_owned());
        }
        if self.state_doc_key.is_empty() {
            reasons.push("state_doc_key must not be empty".to_owned());
        }
        if reasons.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation { reasons })
        }
    }

    /// Advisory warnings for a valid configuration.
    pub fn warnings(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();
        if self.workers == 1 {
            warnings.push(ConfigWarning::SingleWorker);
        }
        if self.test_timeout_ms > MAX_TEST_TIMEOUT_WARN_MS {
            warnings.push(ConfigWarning::LargeTestTimeout {
                millis: self.test_timeout_ms,
            });
        }
        warnings
    }

    /// The sandbox timeout as a [`std::time::Duration`].
    #[must_use]
    pub fn test_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.test_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = EngineConfig::default();
        config.validate().unwrap();
        assert!(config.warnings().is_empty());
    }

    #[test]
    fn parses_a_full_document() {
        let config = EngineConfig::from_toml_str(
            r#"
            workers = 8
            test_timeout_ms = 250
            state_doc_key = "router/state/primary"
            "#,
        )
        .unwrap();
        assert_eq!(config.workers, 8);
        assert_eq!(config.test_timeout(), std::time::Duration::from_millis(250));
        assert_eq!(config.state_doc_key, "router/state/primary");
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let config = EngineConfig::from_toml_str("workers = 2").unwrap();
        assert_eq!(config.workers, 2);
        assert_eq!(config.test_timeout_ms, 1_000);
    }

    #[test]
    fn invalid_values_are_collected() {
        let err = EngineConfig::from_toml_str(
            r#"
            workers = 0
            test_timeout_ms = 0
            state_doc_key = ""
            "#,
        )
        .unwrap_err();
        match err {
            ConfigError::Validation { reasons } => assert_eq!(reasons.len(), 3),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        assert!(matches!(
            EngineConfig::from_toml_str("workers = "),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn warnings_flag_odd_but_legal_settings() {
        let config = EngineConfig {
            workers: 1,
            test_timeout_ms: 120_000,
            ..EngineConfig::default()
        };
        let warnings = config.warnings();
        assert!(warnings.contains(&ConfigWarning::SingleWorker));
        assert!(
            warnings
                .iter()
                .any(|w| matches!(w, ConfigWarning::LargeTestTimeout { millis: 120_000 }))
        );
    }
}
