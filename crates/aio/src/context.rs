// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event-processing context
//!
//! An [`AioContext`] multiplexes cooperative tasks, bottom halves and timers
//! on one home thread. Work is dispatched with the context lock held; the
//! blocking part of a poll runs without it.

use crate::bh::{BhQueue, BottomHalf, PendingBh};
use crate::config::LoopConfig;
use crate::coroutine::{TaskHandle, TaskId, TaskSet};
use crate::lock::{ContextGuard, ContextLock};
use crate::notifier::EventNotifier;
use crate::timer::{TimerId, TimerList};
use std::cell::RefCell;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::thread::{self, ThreadId};
use std::time::{Duration, Instant};

thread_local! {
    static CURRENT_CONTEXT: RefCell<Option<Arc<AioContext>>> = const { RefCell::new(None) };
}

/// Context attached to the calling thread, if any
pub fn current_context() -> Option<Arc<AioContext>> {
    CURRENT_CONTEXT.with(|current| current.borrow().clone())
}

/// An event loop owned by a single home thread
pub struct AioContext {
    name: String,
    home: Mutex<Option<ThreadId>>,
    lock: ContextLock,
    notifier: EventNotifier,
    bottom_halves: BhQueue,
    timers: Mutex<TimerList>,
    tasks: TaskSet,
    poll_max: Duration,
    polls: AtomicU64,
    self_ref: Weak<AioContext>,
}

impl AioContext {
    pub fn new(name: impl Into<String>) -> Arc<Self> {
        Self::with_config(name, &LoopConfig::default())
    }

    pub fn with_config(name: impl Into<String>, config: &LoopConfig) -> Arc<Self> {
        let name = name.into();
        Arc::new_cyclic(|self_ref| Self {
            name,
            home: Mutex::new(None),
            lock: ContextLock::new(),
            notifier: EventNotifier::new(),
            bottom_halves: BhQueue::default(),
            timers: Mutex::new(TimerList::new()),
            tasks: TaskSet::default(),
            poll_max: config.poll_max(),
            polls: AtomicU64::new(0),
            self_ref: Weak::clone(self_ref),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Make the calling thread this context's home thread
    ///
    /// The context also becomes the thread's current context. A context has
    /// exactly one home thread for its whole life.
    pub fn attach_current_thread(self: &Arc<Self>) {
        let me = thread::current().id();
        {
            let mut home = self.home.lock().unwrap_or_else(|e| e.into_inner());
            assert!(
                !matches!(*home, Some(owner) if owner != me),
                "context {} is already attached to another thread",
                self.name
            );
            *home = Some(me);
        }
        CURRENT_CONTEXT.with(|current| *current.borrow_mut() = Some(Arc::clone(self)));
        tracing::debug!(context = %self.name, "attached to thread");
    }

    pub fn home_thread(&self) -> Option<ThreadId> {
        *self.home.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Whether the calling thread is this context's home thread
    pub fn in_home_thread(&self) -> bool {
        self.home_thread() == Some(thread::current().id())
    }

    pub fn acquire(&self) {
        self.lock.acquire();
    }

    pub fn release(&self) {
        self.lock.release();
    }

    pub fn lock(&self) -> ContextGuard<'_> {
        self.lock.lock()
    }

    /// Recursion depth of the context lock held by the calling thread
    pub fn lock_depth(&self) -> u32 {
        self.lock.depth_held_by_current()
    }

    /// Wake a blocked poll without queueing any work
    pub fn notify(&self) {
        self.notifier.notify();
    }

    /// Run `callback` once, asynchronously, on this context's thread
    pub fn schedule_oneshot<F>(&self, callback: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.enqueue_bh(PendingBh::OneShot(Box::new(callback)));
    }

    /// Create a reusable bottom half; it runs only after `schedule()`
    pub fn bh_new<F>(&self, callback: F) -> BottomHalf
    where
        F: FnMut() + Send + 'static,
    {
        BottomHalf::new(Weak::clone(&self.self_ref), Box::new(callback))
    }

    pub(crate) fn enqueue_bh(&self, bh: PendingBh) {
        self.bottom_halves.push(bh);
        self.notifier.notify();
    }

    pub fn pending_bottom_halves(&self) -> usize {
        self.bottom_halves.len()
    }

    /// Arm a one-shot timer that runs `callback` after `delay`
    pub fn timer_after<F>(&self, delay: Duration, callback: F) -> TimerId
    where
        F: FnOnce() + Send + 'static,
    {
        self.timer_at(Instant::now() + delay, callback)
    }

    /// Arm a one-shot timer that runs `callback` at `deadline`
    pub fn timer_at<F>(&self, deadline: Instant, callback: F) -> TimerId
    where
        F: FnOnce() + Send + 'static,
    {
        let id = self
            .timers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .arm(deadline, Box::new(callback));
        // The sleeping poll may need a shorter deadline
        self.notifier.notify();
        id
    }

    pub fn cancel_timer(&self, id: TimerId) {
        self.timers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .cancel(id);
    }

    /// Number of armed timers
    pub fn armed_timers(&self) -> usize {
        self.timers.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Add a cooperative task; callable from any thread
    pub fn spawn<F>(&self, future: F) -> TaskHandle
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let id = self.tasks.insert(Box::pin(future));
        tracing::trace!(context = %self.name, task = %id, "task spawned");
        self.notifier.notify();
        TaskHandle::new(Weak::clone(&self.self_ref), id)
    }

    pub(crate) fn wake_task(&self, id: TaskId) {
        if self.tasks.wake(id) {
            self.notifier.notify();
        }
    }

    pub(crate) fn tasks(&self) -> &TaskSet {
        &self.tasks
    }

    /// Number of live cooperative tasks
    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    /// Number of `poll()` calls made so far
    pub fn poll_count(&self) -> u64 {
        self.polls.load(Ordering::Relaxed)
    }

    /// Run one iteration of the loop
    ///
    /// Dispatches whatever is ready. When nothing was and `blocking` is set,
    /// waits for a notification or the next timer deadline and dispatches
    /// again. Returns whether any task, bottom half or timer ran.
    pub fn poll(&self, blocking: bool) -> bool {
        assert!(
            self.in_home_thread(),
            "context {} polled from a thread other than its home thread",
            self.name
        );
        self.polls.fetch_add(1, Ordering::Relaxed);

        let mut progress = self.dispatch();
        if blocking && !progress {
            if self.busy_poll() {
                self.notifier.wait(Some(Instant::now()));
            } else {
                let deadline = self.next_deadline();
                self.notifier.wait(deadline);
            }
            progress = self.dispatch();
        }
        progress
    }

    fn dispatch(&self) -> bool {
        let _guard = self.lock.lock();
        let mut progress = self.tasks.run_ready(&self.self_ref);
        progress |= self.bottom_halves.run_pending();
        progress |= self.run_timers();
        progress
    }

    fn run_timers(&self) -> bool {
        let expired = self
            .timers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .expired(Instant::now());
        let progress = !expired.is_empty();
        for callback in expired {
            callback();
        }
        progress
    }

    fn next_deadline(&self) -> Option<Instant> {
        self.timers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .next_deadline()
    }

    /// Spin for up to `poll_max` waiting for a notification
    fn busy_poll(&self) -> bool {
        if self.poll_max.is_zero() {
            return false;
        }
        let start = Instant::now();
        while start.elapsed() < self.poll_max {
            if self.notifier.is_pending() || self.tasks.has_ready() {
                return true;
            }
            std::hint::spin_loop();
        }
        false
    }
}

impl fmt::Debug for AioContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AioContext")
            .field("name", &self.name)
            .field("home", &self.home_thread())
            .field("tasks", &self.task_count())
            .finish()
    }
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod tests;
