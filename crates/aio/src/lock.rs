// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Reentrant per-context lock
//!
//! The lock records its owning thread and recursion depth explicitly so the
//! dispatcher can drop a context it holds around a blocking poll and take it
//! back afterwards.

use std::sync::{Condvar, Mutex};
use std::thread::{self, ThreadId};

#[derive(Debug, Default)]
struct LockState {
    owner: Option<ThreadId>,
    depth: u32,
}

/// Recursive mutex tied to an owning thread
#[derive(Debug, Default)]
pub struct ContextLock {
    state: Mutex<LockState>,
    released: Condvar,
}

impl ContextLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the lock, blocking while another thread owns it
    pub fn acquire(&self) {
        let me = thread::current().id();
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        loop {
            match state.owner {
                None => {
                    state.owner = Some(me);
                    state.depth = 1;
                    return;
                }
                Some(owner) if owner == me => {
                    state.depth += 1;
                    return;
                }
                Some(_) => {
                    state = self
                        .released
                        .wait(state)
                        .unwrap_or_else(|e| e.into_inner());
                }
            }
        }
    }

    /// Release one level of ownership
    ///
    /// Releasing a lock the calling thread does not own is fatal.
    pub fn release(&self) {
        let me = thread::current().id();
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        assert!(
            state.owner == Some(me),
            "context lock released by a thread that does not own it"
        );
        state.depth -= 1;
        if state.depth == 0 {
            state.owner = None;
            drop(state);
            self.released.notify_one();
        }
    }

    /// Recursion depth held by the calling thread (0 if it is not the owner)
    pub fn depth_held_by_current(&self) -> u32 {
        let me = thread::current().id();
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if state.owner == Some(me) {
            state.depth
        } else {
            0
        }
    }

    /// Whether any thread currently owns the lock
    pub fn is_locked(&self) -> bool {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .owner
            .is_some()
    }

    /// Acquire and return a guard that releases on drop
    pub fn lock(&self) -> ContextGuard<'_> {
        self.acquire();
        ContextGuard { lock: self }
    }
}

/// RAII guard for one level of [`ContextLock`] ownership
#[must_use = "the context lock is released as soon as the guard is dropped"]
pub struct ContextGuard<'a> {
    lock: &'a ContextLock,
}

impl Drop for ContextGuard<'_> {
    fn drop(&mut self) {
        self.lock.release();
    }
}

#[cfg(test)]
#[path = "lock_tests.rs"]
mod tests;
