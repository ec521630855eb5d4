// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the event-loop layer

use std::io;
use thiserror::Error;

/// Errors that can occur while configuring or running event loops
#[derive(Debug, Error)]
pub enum AioError {
    #[error("failed to spawn iothread {name}: {source}")]
    Spawn {
        name: String,
        #[source]
        source: io::Error,
    },
    #[error("iothread panicked: {0}")]
    ThreadPanicked(String),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    InvalidConfig(String),
}
