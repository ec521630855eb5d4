// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event-loop configuration
//!
//! ```toml
//! [main]
//! poll_max_ns = 0
//!
//! [[iothread]]
//! name = "iothread0"
//! poll_max_ns = 32768
//! ```

use crate::error::AioError;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

/// Tuning for a single context's poll loop
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoopConfig {
    /// Busy-poll budget before a blocking poll goes to sleep (0 disables)
    pub poll_max_ns: u64,
}

impl LoopConfig {
    pub fn poll_max(&self) -> Duration {
        Duration::from_nanos(self.poll_max_ns)
    }
}

/// One IOThread entry
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IoThreadConfig {
    pub name: String,
    #[serde(default)]
    pub poll_max_ns: u64,
}

impl IoThreadConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            poll_max_ns: 0,
        }
    }

    pub fn loop_config(&self) -> LoopConfig {
        LoopConfig {
            poll_max_ns: self.poll_max_ns,
        }
    }
}

/// Top-level configuration: the main loop plus any IOThreads
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub main: LoopConfig,
    #[serde(rename = "iothread")]
    pub iothreads: Vec<IoThreadConfig>,
}

impl Config {
    /// Parse and validate configuration from TOML content
    pub fn from_toml(content: &str) -> Result<Self, AioError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a configuration file
    pub fn load(path: &Path) -> Result<Self, AioError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Check that every IOThread has a unique, non-empty name
    pub fn validate(&self) -> Result<(), AioError> {
        let mut seen = HashSet::new();
        for iothread in &self.iothreads {
            if iothread.name.trim().is_empty() {
                return Err(AioError::InvalidConfig(
                    "iothread name must not be empty".to_string(),
                ));
            }
            if !seen.insert(iothread.name.as_str()) {
                return Err(AioError::InvalidConfig(format!(
                    "duplicate iothread name: {}",
                    iothread.name
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
