// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Run a callback on another context and wait for it

use crate::WaitCoordinator;
use hv_aio::{AioContext, MainLoop};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tracing::debug;

struct BhWaitData<R> {
    done: AtomicBool,
    result: Mutex<Option<R>>,
    wait: WaitCoordinator,
}

/// Run `callback` once on `ctx`'s thread and return after it has finished
///
/// Must be called from the dispatcher with `ctx` acquired exactly once
/// (unless `ctx` is the main context). Main loop events may be processed
/// while waiting.
pub fn bh_oneshot<F>(main: &MainLoop, ctx: &AioContext, callback: F)
where
    F: FnOnce() + Send + 'static,
{
    run_in_context(main, ctx, callback);
}

/// Like [`bh_oneshot`], handing the callback's return value back
pub fn run_in_context<F, R>(main: &MainLoop, ctx: &AioContext, f: F) -> R
where
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
{
    assert!(
        main.is_dispatcher(),
        "bh_oneshot called outside the dispatcher thread"
    );

    let data = Arc::new(BhWaitData {
        done: AtomicBool::new(false),
        result: Mutex::new(None),
        wait: WaitCoordinator::new(main),
    });

    debug!(context = ctx.name(), "scheduling oneshot");
    {
        let data = Arc::clone(&data);
        ctx.schedule_oneshot(move || {
            let value = f();
            *data.result.lock().unwrap_or_else(|e| e.into_inner()) = Some(value);
            data.done.store(true, Ordering::SeqCst);
            data.wait.kick();
        });
    }

    data.wait
        .wait_while(Some(ctx), || !data.done.load(Ordering::SeqCst));
    debug!(context = ctx.name(), "oneshot completed");

    let result = data
        .result
        .lock()
        .unwrap_or_else(|e| e.into_inner())
        .take();
    match result {
        Some(value) => value,
        None => unreachable!("oneshot marked done without a result"),
    }
}

#[cfg(test)]
#[path = "oneshot_tests.rs"]
mod tests;
