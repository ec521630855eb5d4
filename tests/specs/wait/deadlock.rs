//! The dispatcher lets a context's owner take the lock while it waits.

use crate::prelude::*;
use std::time::Duration;

#[test]
fn owner_takes_context_lock_while_dispatcher_waits() {
    let observed_depth = on_dispatcher(|main| {
        let io = iothread("io-owner");
        let ctx = Arc::clone(io.context());
        let wait = Arc::new(WaitCoordinator::new(&main));
        let done = Arc::new(AtomicBool::new(false));

        let guard = ctx.lock();
        {
            let (wait, done, owner_ctx) = (Arc::clone(&wait), Arc::clone(&done), Arc::clone(&ctx));
            // A timer on the owner thread explicitly takes its own lock
            ctx.timer_after(Duration::from_millis(5), move || {
                let _nested = owner_ctx.lock();
                done.store(true, Ordering::SeqCst);
                wait.kick();
            });
        }

        wait.wait_while(Some(&*ctx), || !done.load(Ordering::SeqCst));
        let depth = ctx.lock_depth();
        drop(guard);
        depth
    });

    assert_eq!(observed_depth, 1);
}

#[test]
fn owner_blocked_on_lock_before_wait_starts_still_progresses() {
    on_dispatcher(|main| {
        let io = iothread("io-blocked");
        let ctx = Arc::clone(io.context());
        let wait = Arc::new(WaitCoordinator::new(&main));
        let done = Arc::new(AtomicBool::new(false));

        let guard = ctx.lock();
        {
            let (wait, done) = (Arc::clone(&wait), Arc::clone(&done));
            ctx.schedule_oneshot(move || {
                done.store(true, Ordering::SeqCst);
                wait.kick();
            });
        }
        // Give the owner time to block on the lock we hold
        std::thread::sleep(Duration::from_millis(20));
        assert!(!done.load(Ordering::SeqCst));

        assert!(wait.wait_while(Some(&*ctx), || !done.load(Ordering::SeqCst)));
        drop(guard);
    });
}

#[test]
fn dispatcher_waits_on_two_iothreads_in_turn() {
    on_dispatcher(|main| {
        let first = iothread("io-left");
        let second = iothread("io-right");
        let wait = Arc::new(WaitCoordinator::new(&main));

        for io in [&first, &second] {
            let ctx: &AioContext = io.context();
            let done = Arc::new(AtomicBool::new(false));
            let _guard = ctx.lock();
            {
                let (wait, done) = (Arc::clone(&wait), Arc::clone(&done));
                ctx.schedule_oneshot(move || {
                    done.store(true, Ordering::SeqCst);
                    wait.kick();
                });
            }
            wait.wait_while(Some(ctx), || !done.load(Ordering::SeqCst));
        }
    });
}
