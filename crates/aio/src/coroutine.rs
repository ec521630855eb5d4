// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cooperative tasks
//!
//! Each context owns an arena of suspended tasks and a ready queue. Tasks run
//! one at a time on the context's home thread and only give up control at an
//! explicit suspension point. Any thread may wake a task; the resumption
//! itself always happens on the task's own loop.

use crate::context::AioContext;
use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::task::{Context, Poll, Wake, Waker};

type TaskFuture = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

static NEXT_TASK_ID: AtomicU64 = AtomicU64::new(1);

thread_local! {
    static CURRENT_TASK: RefCell<Option<TaskHandle>> = const { RefCell::new(None) };
}

/// Process-wide unique task identifier
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(pub u64);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task-{}", self.0)
    }
}

/// Handle used to resume a suspended task
#[derive(Clone)]
pub struct TaskHandle {
    ctx: Weak<AioContext>,
    id: TaskId,
}

impl TaskHandle {
    pub(crate) fn new(ctx: Weak<AioContext>, id: TaskId) -> Self {
        Self { ctx, id }
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    /// Schedule the task on its own loop
    ///
    /// Safe from any thread. Waking a task that already sits in the ready
    /// queue, or one that has finished, does nothing.
    pub fn wake(&self) {
        if let Some(ctx) = self.ctx.upgrade() {
            ctx.wake_task(self.id);
        }
    }

    /// Whether the task still exists on its context
    pub fn is_alive(&self) -> bool {
        self.ctx
            .upgrade()
            .is_some_and(|ctx| ctx.tasks().contains(self.id))
    }
}

impl PartialEq for TaskHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TaskHandle {}

impl fmt::Debug for TaskHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TaskHandle").field(&self.id).finish()
    }
}

/// Whether the calling code runs inside a cooperative task
pub fn in_coroutine() -> bool {
    CURRENT_TASK.with(|current| current.borrow().is_some())
}

/// Handle of the task currently being polled on this thread
pub fn current_task() -> Option<TaskHandle> {
    CURRENT_TASK.with(|current| current.borrow().clone())
}

/// Restores the previous task identity even if the task panics
struct CurrentTaskGuard {
    previous: Option<TaskHandle>,
}

impl CurrentTaskGuard {
    fn enter(handle: TaskHandle) -> Self {
        let previous = CURRENT_TASK.with(|current| current.replace(Some(handle)));
        Self { previous }
    }
}

impl Drop for CurrentTaskGuard {
    fn drop(&mut self) {
        let previous = self.previous.take();
        CURRENT_TASK.with(|current| *current.borrow_mut() = previous);
    }
}

struct TaskWaker {
    handle: TaskHandle,
}

impl Wake for TaskWaker {
    fn wake(self: Arc<Self>) {
        self.handle.wake();
    }

    fn wake_by_ref(self: &Arc<Self>) {
        self.handle.wake();
    }
}

struct TaskSlot {
    future: Option<TaskFuture>,
    scheduled: bool,
}

#[derive(Default)]
struct TaskSetInner {
    slots: HashMap<TaskId, TaskSlot>,
    ready: VecDeque<TaskId>,
}

/// Arena of a context's tasks plus its ready queue
#[derive(Default)]
pub(crate) struct TaskSet {
    inner: Mutex<TaskSetInner>,
}

impl TaskSet {
    /// Add a task and mark it ready
    pub(crate) fn insert(&self, future: TaskFuture) -> TaskId {
        let id = TaskId(NEXT_TASK_ID.fetch_add(1, Ordering::Relaxed));
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.slots.insert(
            id,
            TaskSlot {
                future: Some(future),
                scheduled: true,
            },
        );
        inner.ready.push_back(id);
        id
    }

    /// Mark a task ready; returns true if it was not already queued
    pub(crate) fn wake(&self, id: TaskId) -> bool {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let newly_scheduled = match inner.slots.get_mut(&id) {
            Some(slot) if !slot.scheduled => {
                slot.scheduled = true;
                true
            }
            _ => false,
        };
        if newly_scheduled {
            inner.ready.push_back(id);
        }
        newly_scheduled
    }

    pub(crate) fn contains(&self, id: TaskId) -> bool {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .slots
            .contains_key(&id)
    }

    pub(crate) fn len(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .slots
            .len()
    }

    pub(crate) fn has_ready(&self) -> bool {
        !self
            .inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .ready
            .is_empty()
    }

    /// Resume every task that was ready when the call started
    ///
    /// Tasks woken while this batch runs are resumed by the next dispatch.
    pub(crate) fn run_ready(&self, ctx: &Weak<AioContext>) -> bool {
        let batch: Vec<TaskId> = {
            let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
            inner.ready.drain(..).collect()
        };

        let mut progress = false;
        for id in batch {
            let future = {
                let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
                match inner.slots.get_mut(&id) {
                    Some(slot) => {
                        slot.scheduled = false;
                        slot.future.take()
                    }
                    None => None,
                }
            };
            let Some(mut future) = future else {
                continue;
            };

            let handle = TaskHandle::new(Weak::clone(ctx), id);
            let waker = Waker::from(Arc::new(TaskWaker {
                handle: handle.clone(),
            }));
            let mut cx = Context::from_waker(&waker);

            let poll = {
                let _current = CurrentTaskGuard::enter(handle);
                future.as_mut().poll(&mut cx)
            };
            progress = true;

            let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
            match poll {
                Poll::Ready(()) => {
                    inner.slots.remove(&id);
                    tracing::trace!(task = %id, "task finished");
                }
                Poll::Pending => {
                    if let Some(slot) = inner.slots.get_mut(&id) {
                        slot.future = Some(future);
                    }
                }
            }
        }
        progress
    }
}

/// Reschedule the current task behind the other ready work of its loop
pub fn yield_now() -> YieldNow {
    YieldNow { yielded: false }
}

/// Future returned by [`yield_now`]
#[must_use = "futures do nothing unless awaited"]
pub struct YieldNow {
    yielded: bool,
}

impl Future for YieldNow {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if self.yielded {
            return Poll::Ready(());
        }
        self.yielded = true;
        cx.waker().wake_by_ref();
        Poll::Pending
    }
}

#[derive(Default)]
struct CoQueueInner {
    waiters: VecDeque<TaskHandle>,
    epoch: u64,
}

/// Parking queue of suspended cooperative tasks
///
/// Every restart bumps the queue's epoch under the same lock that guards the
/// waiters, so a task that samples the epoch before testing its condition
/// cannot park after a restart it has not seen.
#[derive(Default)]
pub struct CoQueue {
    inner: Mutex<CoQueueInner>,
}

impl CoQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restart counter sampled by [`CoQueue::wait_since`]
    pub fn epoch(&self) -> u64 {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).epoch
    }

    /// Suspend the current task until it is restarted
    pub fn wait(&self) -> CoQueueWait<'_> {
        CoQueueWait {
            queue: self,
            since: None,
            parked: None,
        }
    }

    /// Suspend the current task unless a restart happened after `epoch`
    pub fn wait_since(&self, epoch: u64) -> CoQueueWait<'_> {
        CoQueueWait {
            queue: self,
            since: Some(epoch),
            parked: None,
        }
    }

    /// Resume the oldest parked task; returns false if none was parked
    pub fn restart_one(&self) -> bool {
        let next = {
            let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
            inner.epoch += 1;
            inner.waiters.pop_front()
        };
        match next {
            Some(handle) => {
                tracing::trace!(task = %handle.id(), "restarting parked task");
                handle.wake();
                true
            }
            None => false,
        }
    }

    /// Resume every parked task; returns how many were parked
    pub fn restart_all(&self) -> usize {
        let waiters = {
            let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
            inner.epoch += 1;
            std::mem::take(&mut inner.waiters)
        };
        let count = waiters.len();
        for handle in waiters {
            handle.wake();
        }
        if count > 0 {
            tracing::trace!(count, "restarted parked tasks");
        }
        count
    }

    pub fn len(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .waiters
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn is_parked(&self, id: TaskId) -> bool {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .waiters
            .iter()
            .any(|handle| handle.id() == id)
    }

    fn remove(&self, id: TaskId) {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .waiters
            .retain(|handle| handle.id() != id);
    }
}

impl fmt::Debug for CoQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CoQueue")
            .field("waiters", &self.len())
            .field("epoch", &self.epoch())
            .finish()
    }
}

/// Future returned by [`CoQueue::wait`] and [`CoQueue::wait_since`]
///
/// Resolves to whether the task was actually parked on the queue.
#[must_use = "futures do nothing unless awaited"]
pub struct CoQueueWait<'a> {
    queue: &'a CoQueue,
    since: Option<u64>,
    parked: Option<TaskId>,
}

impl Future for CoQueueWait<'_> {
    type Output = bool;

    fn poll(mut self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<bool> {
        if let Some(id) = self.parked {
            // Only a restart takes the task off the queue
            if self.queue.is_parked(id) {
                return Poll::Pending;
            }
            self.parked = None;
            return Poll::Ready(true);
        }

        let current = current_task();
        assert!(
            current.is_some(),
            "CoQueue wait polled outside a cooperative task"
        );
        let Some(handle) = current else {
            return Poll::Ready(false);
        };

        let mut inner = self.queue.inner.lock().unwrap_or_else(|e| e.into_inner());
        if self.since.is_some_and(|epoch| epoch != inner.epoch) {
            return Poll::Ready(false);
        }
        let id = handle.id();
        inner.waiters.push_back(handle);
        drop(inner);

        tracing::trace!(task = %id, "task parked");
        self.parked = Some(id);
        Poll::Pending
    }
}

impl Drop for CoQueueWait<'_> {
    fn drop(&mut self) {
        if let Some(id) = self.parked.take() {
            self.queue.remove(id);
        }
    }
}

#[cfg(test)]
#[path = "coroutine_tests.rs"]
mod tests;
