// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Runtime configuration via `blockflow.toml`.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::error::{FlowError, Result};

/// Tunables for a top block and the workers it drives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Size of a dedicated actor pool. `None` shares the process-wide pool.
    pub worker_threads: Option<usize>,
    /// Interval between completion checks in `wait()`.
    pub wait_poll_interval_ms: u64,
    /// Output buffer size in bytes when no hint was given.
    pub default_buffer_size: usize,
    /// Messages an actor processes before yielding its pool thread.
    pub mailbox_batch: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            worker_threads: None,
            wait_poll_interval_ms: 1,
            default_buffer_size: 4096,
            mailbox_batch: 64,
        }
    }
}

impl RuntimeConfig {
    /// Configuration file name.
    pub const FILE_NAME: &'static str = "blockflow.toml";

    /// Parse a configuration document.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| FlowError::Configuration(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a file. Errors if it is missing or invalid.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            FlowError::Configuration(format!("Failed to read {}: {}", path.display(), e))
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| {
            FlowError::Configuration(format!("Failed to parse {}: {}", path.display(), e))
        })?;
        config.validate()?;

        tracing::info!("Loaded runtime config from {}", path.display());
        Ok(config)
    }

    /// Load `blockflow.toml` from a directory, falling back to defaults.
    pub fn load_or_default(dir: &Path) -> Self {
        let path = dir.join(Self::FILE_NAME);

        if !path.exists() {
            tracing::debug!(
                "No {} found in {}, using defaults",
                Self::FILE_NAME,
                dir.display()
            );
            return Self::default();
        }

        match Self::load(&path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("{}, using defaults", e);
                Self::default()
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.worker_threads == Some(0) {
            return Err(FlowError::Configuration(
                "worker_threads must be at least 1".into(),
            ));
        }
        if self.mailbox_batch == 0 {
            return Err(FlowError::Configuration(
                "mailbox_batch must be at least 1".into(),
            ));
        }
        if self.default_buffer_size == 0 {
            return Err(FlowError::Configuration(
                "default_buffer_size must be at least 1".into(),
            ));
        }
        Ok(())
    }

    pub fn wait_poll_interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.wait_poll_interval_ms.max(1))
    }
}
