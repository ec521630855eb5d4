// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Level-triggered wakeup for a blocked poll

use std::sync::{Condvar, Mutex};
use std::time::Instant;

/// Pending flag plus condition variable
///
/// A `notify()` that lands before `wait()` is not lost: the flag stays set
/// until a wait consumes it.
#[derive(Debug, Default)]
pub struct EventNotifier {
    pending: Mutex<bool>,
    cond: Condvar,
}

impl EventNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the notifier pending and wake the waiter
    pub fn notify(&self) {
        let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        *pending = true;
        drop(pending);
        self.cond.notify_all();
    }

    pub fn is_pending(&self) -> bool {
        *self.pending.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Block until notified or `deadline` passes
    ///
    /// Returns true if the wait consumed a notification, false on timeout.
    pub fn wait(&self, deadline: Option<Instant>) -> bool {
        let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        while !*pending {
            match deadline {
                None => {
                    pending = self.cond.wait(pending).unwrap_or_else(|e| e.into_inner());
                }
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return false;
                    }
                    let (guard, _) = self
                        .cond
                        .wait_timeout(pending, deadline - now)
                        .unwrap_or_else(|e| e.into_inner());
                    pending = guard;
                }
            }
        }
        *pending = false;
        true
    }
}

#[cfg(test)]
#[path = "notifier_tests.rs"]
mod tests;
