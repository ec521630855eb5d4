// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Deadline-ordered one-shot timers

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashSet};
use std::fmt;
use std::time::Instant;

/// Callback run when a timer expires
pub type TimerCallback = Box<dyn FnOnce() + Send + 'static>;

/// Identifier returned when arming a timer, used to cancel it
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(pub u64);

struct TimerEntry {
    id: TimerId,
    deadline: Instant,
    callback: TimerCallback,
}

impl PartialEq for TimerEntry {
    fn eq(&self, other: &Self) -> bool {
        self.deadline == other.deadline && self.id == other.id
    }
}

impl Eq for TimerEntry {}

impl PartialOrd for TimerEntry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TimerEntry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // Min-heap: earliest first, arming order breaks ties
        Reverse((self.deadline, self.id)).cmp(&Reverse((other.deadline, other.id)))
    }
}

/// Armed timers of one context
#[derive(Default)]
pub struct TimerList {
    entries: BinaryHeap<TimerEntry>,
    cancelled: HashSet<TimerId>,
    next_id: u64,
}

impl fmt::Debug for TimerList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerList")
            .field("armed", &self.entries.len())
            .field("cancelled", &self.cancelled.len())
            .finish()
    }
}

impl TimerList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm a timer firing at `deadline`
    pub fn arm(&mut self, deadline: Instant, callback: TimerCallback) -> TimerId {
        self.next_id += 1;
        let id = TimerId(self.next_id);
        self.entries.push(TimerEntry {
            id,
            deadline,
            callback,
        });
        id
    }

    /// Cancel an armed timer; unknown or already fired ids are ignored
    pub fn cancel(&mut self, id: TimerId) {
        if self.entries.iter().any(|entry| entry.id == id) {
            self.cancelled.insert(id);
        }
    }

    /// Remove and return the callbacks of every timer due at `now`
    pub fn expired(&mut self, now: Instant) -> Vec<TimerCallback> {
        let mut ready = Vec::new();

        while let Some(entry) = self.entries.peek() {
            if entry.deadline > now {
                break;
            }

            let Some(entry) = self.entries.pop() else {
                break;
            };

            if self.cancelled.remove(&entry.id) {
                continue;
            }

            ready.push(entry.callback);
        }

        ready
    }

    /// Earliest deadline of a live timer
    pub fn next_deadline(&mut self) -> Option<Instant> {
        while let Some(entry) = self.entries.peek() {
            if !self.cancelled.contains(&entry.id) {
                return Some(entry.deadline);
            }
            if let Some(entry) = self.entries.pop() {
                self.cancelled.remove(&entry.id);
            }
        }
        None
    }

    /// Number of armed, uncancelled timers
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.entries.len() - self.cancelled.len()
    }
}

#[cfg(test)]
#[path = "timer_tests.rs"]
mod tests;
