// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! hv-aio: per-thread event loops for device emulation
//!
//! This crate provides:
//! - `AioContext` - an event loop for cooperative tasks, bottom halves and timers
//! - `ContextLock` - the reentrant lock guarding a context's dispatch
//! - `MainLoop` - the dispatcher thread's default context
//! - `IoThread` - a thread that exclusively drives one context
//! - `CoQueue` - a parking queue for suspended cooperative tasks

mod bh;
pub mod config;
mod context;
pub mod coroutine;
mod error;
mod iothread;
mod lock;
mod main_loop;
mod notifier;
mod timer;

pub use bh::BottomHalf;
pub use config::{Config, IoThreadConfig, LoopConfig};
pub use context::{current_context, AioContext};
pub use coroutine::{
    current_task, in_coroutine, yield_now, CoQueue, CoQueueWait, TaskHandle, TaskId,
};
pub use error::AioError;
pub use iothread::IoThread;
pub use lock::{ContextGuard, ContextLock};
pub use main_loop::MainLoop;
pub use notifier::EventNotifier;
pub use timer::TimerId;
