//! A kick issued after the state change is never missed.

use crate::prelude::*;
use std::time::{Duration, Instant};

#[test]
fn flag_set_by_worker_after_delay_ends_the_wait() {
    let (waited, flag, elapsed) = on_dispatcher(|main| {
        let wait = Arc::new(WaitCoordinator::new(&main));
        let flag = Arc::new(AtomicBool::new(false));

        let worker = {
            let (wait, flag) = (Arc::clone(&wait), Arc::clone(&flag));
            std::thread::spawn(move || {
                std::thread::sleep(Duration::from_millis(10));
                flag.store(true, Ordering::SeqCst);
                wait.kick();
            })
        };

        let start = Instant::now();
        let waited = wait.wait_while(None, || !flag.load(Ordering::SeqCst));
        let elapsed = start.elapsed();
        worker.join().unwrap();

        (waited, flag.load(Ordering::SeqCst), elapsed)
    });

    assert!(waited);
    assert!(flag);
    assert!(elapsed >= Duration::from_millis(10));
}

#[test]
fn racing_kicks_never_strand_the_dispatcher() {
    let rounds = on_dispatcher(|main| {
        let wait = Arc::new(WaitCoordinator::new(&main));
        let mut rounds = 0;

        for round in 0..500u64 {
            let flag = Arc::new(AtomicBool::new(false));
            let worker = {
                let (wait, flag) = (Arc::clone(&wait), Arc::clone(&flag));
                std::thread::spawn(move || {
                    // Vary where the set lands relative to the waiter's poll
                    if round % 3 == 1 {
                        std::thread::yield_now();
                    } else if round % 3 == 2 {
                        std::thread::sleep(Duration::from_micros(round % 50));
                    }
                    flag.store(true, Ordering::SeqCst);
                    wait.kick();
                })
            };

            wait.wait_while(None, || !flag.load(Ordering::SeqCst));
            assert_eq!(wait.num_waiters(), 0);
            worker.join().unwrap();
            rounds += 1;
        }
        rounds
    });

    assert_eq!(rounds, 500);
}

#[test]
fn racing_kicks_from_iothread_callbacks() {
    let completed = on_dispatcher(|main| {
        let io = iothread("io-race");
        let ctx: &AioContext = io.context();
        let wait = Arc::new(WaitCoordinator::new(&main));
        let completed = Arc::new(AtomicUsize::new(0));

        let _guard = ctx.lock();
        for round in 1..=200 {
            let (wait_cb, completed_cb) = (Arc::clone(&wait), Arc::clone(&completed));
            ctx.schedule_oneshot(move || {
                completed_cb.fetch_add(1, Ordering::SeqCst);
                wait_cb.kick();
            });
            wait.wait_while(Some(ctx), || completed.load(Ordering::SeqCst) < round);
        }
        completed.load(Ordering::SeqCst)
    });

    assert_eq!(completed, 200);
}
