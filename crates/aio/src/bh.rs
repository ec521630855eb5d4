// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bottom halves: deferred callbacks run on a context's own thread

use crate::context::AioContext;
use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};

/// One-shot deferred callback
pub type BhCallback = Box<dyn FnOnce() + Send + 'static>;

pub(crate) struct BhInner {
    callback: Mutex<Box<dyn FnMut() + Send + 'static>>,
    scheduled: AtomicBool,
    ctx: Weak<AioContext>,
}

/// A reusable bottom half bound to one context
///
/// Each `schedule()` that is not cancelled runs the callback once on the
/// context's thread. Scheduling an already pending bottom half is a no-op.
#[derive(Clone)]
pub struct BottomHalf {
    inner: Arc<BhInner>,
}

impl BottomHalf {
    pub(crate) fn new(ctx: Weak<AioContext>, callback: Box<dyn FnMut() + Send + 'static>) -> Self {
        Self {
            inner: Arc::new(BhInner {
                callback: Mutex::new(callback),
                scheduled: AtomicBool::new(false),
                ctx,
            }),
        }
    }

    /// Queue the callback on its context; callable from any thread
    pub fn schedule(&self) {
        if self.inner.scheduled.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Some(ctx) = self.inner.ctx.upgrade() {
            ctx.enqueue_bh(PendingBh::Reusable(Arc::clone(&self.inner)));
        }
    }

    /// Drop a pending run, if any
    pub fn cancel(&self) {
        self.inner.scheduled.store(false, Ordering::Release);
    }

    pub fn is_scheduled(&self) -> bool {
        self.inner.scheduled.load(Ordering::Acquire)
    }
}

impl fmt::Debug for BottomHalf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BottomHalf")
            .field("scheduled", &self.is_scheduled())
            .finish()
    }
}

pub(crate) enum PendingBh {
    OneShot(BhCallback),
    Reusable(Arc<BhInner>),
}

impl PendingBh {
    /// Run the entry; returns false if it was cancelled before running
    fn run(self) -> bool {
        match self {
            PendingBh::OneShot(callback) => {
                callback();
                true
            }
            PendingBh::Reusable(inner) => {
                if !inner.scheduled.swap(false, Ordering::AcqRel) {
                    return false;
                }
                let mut callback = inner.callback.lock().unwrap_or_else(|e| e.into_inner());
                (callback)();
                true
            }
        }
    }
}

/// FIFO of bottom halves waiting for the next dispatch
#[derive(Default)]
pub(crate) struct BhQueue {
    pending: Mutex<VecDeque<PendingBh>>,
}

impl BhQueue {
    pub(crate) fn push(&self, bh: PendingBh) {
        self.pending
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(bh);
    }

    pub(crate) fn len(&self) -> usize {
        self.pending.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Run every bottom half queued so far
    ///
    /// Entries queued by the callbacks themselves wait for the next dispatch.
    pub(crate) fn run_pending(&self) -> bool {
        let batch = std::mem::take(&mut *self.pending.lock().unwrap_or_else(|e| e.into_inner()));
        let mut progress = false;
        for bh in batch {
            progress |= bh.run();
        }
        progress
    }
}
