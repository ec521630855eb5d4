// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The dispatcher thread and its default loop

use crate::config::LoopConfig;
use crate::context::AioContext;
use std::sync::Arc;
use std::thread::{self, ThreadId};

/// Handle to the main context and the identity of the dispatcher thread
///
/// The thread that creates the `MainLoop` becomes the dispatcher: it is the
/// home thread of the main context and the only thread allowed to wait on
/// contexts it does not own. Handles are cheap to clone and can be sent to
/// other threads; the dispatcher identity never moves.
#[derive(Clone, Debug)]
pub struct MainLoop {
    ctx: Arc<AioContext>,
    dispatcher: ThreadId,
}

impl MainLoop {
    pub fn new() -> Self {
        Self::with_config(&LoopConfig::default())
    }

    pub fn with_config(config: &LoopConfig) -> Self {
        let ctx = AioContext::with_config("main-loop", config);
        ctx.attach_current_thread();
        let dispatcher = thread::current().id();
        tracing::debug!(?dispatcher, "main loop created");
        Self { ctx, dispatcher }
    }

    /// The dispatcher's default context
    pub fn context(&self) -> &Arc<AioContext> {
        &self.ctx
    }

    pub fn dispatcher_thread(&self) -> ThreadId {
        self.dispatcher
    }

    /// Whether the calling thread is the dispatcher
    pub fn is_dispatcher(&self) -> bool {
        thread::current().id() == self.dispatcher
    }

    /// Poll the main context once; must be called on the dispatcher
    pub fn run_once(&self, blocking: bool) -> bool {
        self.ctx.poll(blocking)
    }
}

impl Default for MainLoop {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "main_loop_tests.rs"]
mod tests;
