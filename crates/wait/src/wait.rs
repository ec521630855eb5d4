// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Synchronous waiting on conditions that other event loops change
//!
//! The dispatcher can wait for work running in an IOThread like this:
//!
//! ```no_run
//! # use hv_aio::{AioContext, IoThread, IoThreadConfig, MainLoop};
//! # use hv_wait::WaitCoordinator;
//! # use std::sync::Arc;
//! # use std::sync::atomic::{AtomicBool, Ordering};
//! # fn demo() -> Result<(), hv_aio::AioError> {
//! let main = MainLoop::new();
//! let iothread = IoThread::spawn(&IoThreadConfig::new("disk0"))?;
//! let ctx: &AioContext = iothread.context();
//! let wait = Arc::new(WaitCoordinator::new(&main));
//! let done = Arc::new(AtomicBool::new(false));
//!
//! {
//!     let (wait, done) = (Arc::clone(&wait), Arc::clone(&done));
//!     ctx.schedule_oneshot(move || {
//!         done.store(true, Ordering::SeqCst);
//!         wait.kick();
//!     });
//! }
//!
//! let _guard = ctx.lock();
//! wait.wait_while(Some(ctx), || !done.load(Ordering::SeqCst));
//! # Ok(())
//! # }
//! ```
//!
//! Whoever changes the condition must call [`WaitCoordinator::kick`]
//! afterwards.

use hv_aio::{in_coroutine, AioContext, CoQueue, MainLoop};
use std::sync::atomic::{fence, AtomicUsize, Ordering};
use tracing::trace;

/// Waiter count plus parking queue, embedded in whatever needs
/// synchronous-completion signaling
#[derive(Debug)]
pub struct WaitCoordinator {
    /// Callers currently inside a wait loop
    num_waiters: AtomicUsize,
    wait_queue: CoQueue,
    main: MainLoop,
}

impl WaitCoordinator {
    /// Zeroed counter and empty queue, kicking `main` when waiters exist
    pub fn new(main: &MainLoop) -> Self {
        Self {
            num_waiters: AtomicUsize::new(0),
            wait_queue: CoQueue::new(),
            main: main.clone(),
        }
    }

    pub fn num_waiters(&self) -> usize {
        self.num_waiters.load(Ordering::SeqCst)
    }

    /// Number of cooperative tasks parked on this coordinator
    pub fn parked_tasks(&self) -> usize {
        self.wait_queue.len()
    }

    pub fn main_loop(&self) -> &MainLoop {
        &self.main
    }

    fn enter(&self) -> WaiterGuard<'_> {
        self.num_waiters.fetch_add(1, Ordering::SeqCst);
        WaiterGuard {
            num_waiters: &self.num_waiters,
        }
    }

    /// Tell waiters to re-evaluate their condition
    ///
    /// Callable from any thread, without holding the lock that protects the
    /// condition. Parked tasks are rescheduled on their own loops; the main
    /// loop is only notified when someone is counted as waiting.
    pub fn kick(&self) {
        let restarted = self.wait_queue.restart_all();

        // Pairs with the increment in enter(): either the waiter sees the
        // new condition or this load sees the waiter.
        fence(Ordering::SeqCst);
        let waiters = self.num_waiters.load(Ordering::SeqCst);
        if waiters > 0 {
            self.main.context().notify();
        }
        trace!(waiters, restarted, "kick");
    }

    /// Wait while `cond` holds, from synchronous code
    ///
    /// On the home thread of `ctx` this polls `ctx` directly. Anywhere else
    /// the caller must be the dispatcher, holding `ctx` exactly once if one
    /// is given; the lock is dropped around each poll of the main loop so
    /// the context's owner can make progress. Waiting between two IOThreads
    /// is not supported and aborts.
    ///
    /// Returns whether any polling happened. Other work belonging to the
    /// polled loop may run during the wait.
    pub fn wait_while<F>(&self, ctx: Option<&AioContext>, cond: F) -> bool
    where
        F: FnMut() -> bool,
    {
        assert!(
            !in_coroutine(),
            "wait_while called from a cooperative task; use co_wait_while"
        );

        match ctx {
            Some(ctx) if ctx.in_home_thread() => self.poll_home(ctx, cond),
            _ => self.poll_from_dispatcher(ctx, cond),
        }
    }

    fn poll_home<F>(&self, ctx: &AioContext, mut cond: F) -> bool
    where
        F: FnMut() -> bool,
    {
        let mut waited = false;
        // Counted before the first test so a kick aimed at the main loop
        // wakes this poll when `ctx` is the main context
        let waiter = self.enter();
        while cond() {
            ctx.poll(true);
            waited = true;
        }
        drop(waiter);
        trace!(context = ctx.name(), waited, "home-thread wait finished");
        waited
    }

    fn poll_from_dispatcher<F>(&self, ctx: Option<&AioContext>, mut cond: F) -> bool
    where
        F: FnMut() -> bool,
    {
        assert!(
            self.main.is_dispatcher(),
            "cross-context wait outside the dispatcher thread; route it through the main loop"
        );
        if let Some(ctx) = ctx {
            assert_eq!(
                ctx.lock_depth(),
                1,
                "dispatcher must hold context {} exactly once while waiting on it",
                ctx.name()
            );
        }

        let main = self.main.context();
        let mut waited = false;

        // Counted before the first test so a concurrent kick cannot miss us
        let waiter = self.enter();
        while cond() {
            let _unlocked = Unlocked::new(ctx);
            main.poll(true);
            waited = true;
        }
        drop(waiter);

        trace!(context = ctx.map(AioContext::name), waited, "dispatcher wait finished");
        waited
    }

    /// Wait while `cond` holds, from inside a cooperative task
    ///
    /// Suspends only the current task; the thread keeps running other tasks
    /// and callbacks of its loop. Returns whether the task was suspended.
    pub async fn co_wait_while<F>(&self, mut cond: F) -> bool
    where
        F: FnMut() -> bool,
    {
        let mut waited = false;
        loop {
            // Sampled before the test so a kick in between is not lost
            let epoch = self.wait_queue.epoch();
            if !cond() {
                break;
            }
            let _waiter = self.enter();
            if self.wait_queue.wait_since(epoch).await {
                waited = true;
            }
        }
        waited
    }
}

/// Decrements the waiter count when a wait iteration or loop ends
struct WaiterGuard<'a> {
    num_waiters: &'a AtomicUsize,
}

impl Drop for WaiterGuard<'_> {
    fn drop(&mut self) {
        let previous = self.num_waiters.fetch_sub(1, Ordering::SeqCst);
        debug_assert!(previous > 0, "waiter count underflow");
    }
}

/// Releases a context for the duration of one main-loop poll
struct Unlocked<'a> {
    ctx: Option<&'a AioContext>,
}

impl<'a> Unlocked<'a> {
    fn new(ctx: Option<&'a AioContext>) -> Self {
        if let Some(ctx) = ctx {
            ctx.release();
        }
        Self { ctx }
    }
}

impl Drop for Unlocked<'_> {
    fn drop(&mut self) {
        if let Some(ctx) = self.ctx {
            ctx.acquire();
        }
    }
}

#[cfg(test)]
#[path = "wait_tests.rs"]
mod tests;
