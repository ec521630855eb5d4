// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! hv-wait: cross-thread synchronous waits for event loops
//!
//! This crate provides:
//! - `WaitCoordinator` - waiter count and task parking queue
//! - `wait_while` / `co_wait_while` - block or suspend until a condition clears
//! - `kick` - wake whoever waits on a coordinator
//! - `bh_oneshot` - run a callback on another context and wait for it

mod oneshot;
mod wait;

pub use oneshot::{bh_oneshot, run_in_context};
pub use wait::WaitCoordinator;
