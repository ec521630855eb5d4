// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Threads that own and drive a single context

use crate::config::IoThreadConfig;
use crate::context::AioContext;
use crate::error::AioError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::{debug, warn};

/// An OS thread running `poll(true)` on its own context until stopped
pub struct IoThread {
    name: String,
    ctx: Arc<AioContext>,
    stopping: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl IoThread {
    pub fn spawn(config: &IoThreadConfig) -> Result<Self, AioError> {
        let ctx = AioContext::with_config(config.name.clone(), &config.loop_config());
        let stopping = Arc::new(AtomicBool::new(false));

        let handle = {
            let ctx = Arc::clone(&ctx);
            let stopping = Arc::clone(&stopping);
            std::thread::Builder::new()
                .name(config.name.clone())
                .spawn(move || run(ctx, stopping))
                .map_err(|source| AioError::Spawn {
                    name: config.name.clone(),
                    source,
                })?
        };

        debug!(iothread = %config.name, "iothread started");
        Ok(Self {
            name: config.name.clone(),
            ctx,
            stopping,
            handle: Some(handle),
        })
    }

    /// Spawn one thread per entry, in order, stopping at the first failure
    pub fn spawn_all(configs: &[IoThreadConfig]) -> Result<Vec<Self>, AioError> {
        configs.iter().map(Self::spawn).collect()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn context(&self) -> &Arc<AioContext> {
        &self.ctx
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    /// Ask the loop to exit and join the thread
    pub fn stop(&mut self) -> Result<(), AioError> {
        let Some(handle) = self.handle.take() else {
            return Ok(());
        };
        self.stopping.store(true, Ordering::Release);
        self.ctx.notify();

        handle
            .join()
            .map_err(|_| AioError::ThreadPanicked(self.name.clone()))?;
        debug!(iothread = %self.name, "iothread stopped");
        Ok(())
    }
}

impl Drop for IoThread {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            warn!(iothread = %self.name, error = %e, "iothread did not stop cleanly");
        }
    }
}

fn run(ctx: Arc<AioContext>, stopping: Arc<AtomicBool>) {
    ctx.attach_current_thread();
    while !stopping.load(Ordering::Acquire) {
        ctx.poll(true);
    }
}

#[cfg(test)]
#[path = "iothread_tests.rs"]
mod tests;
