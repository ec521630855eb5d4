//! Waiting inside a cooperative task suspends the task, not the thread.

use crate::prelude::*;
use std::time::Duration;

#[test]
fn parked_task_leaves_its_iothread_free() {
    let (t1_waited, finished) = on_dispatcher(|main| {
        let io = iothread("io-coop");
        let ctx = Arc::clone(io.context());
        let wait = Arc::new(WaitCoordinator::new(&main));
        let flag = Arc::new(AtomicBool::new(false));
        let finished = Arc::new(AtomicUsize::new(0));
        let t1_waited = Arc::new(AtomicBool::new(false));

        // Held across spawn and bridge so the task is dispatched first
        let _guard = ctx.lock();
        {
            let (wait, flag, finished, t1_waited) = (
                Arc::clone(&wait),
                Arc::clone(&flag),
                Arc::clone(&finished),
                Arc::clone(&t1_waited),
            );
            ctx.spawn(async move {
                let waited = wait.co_wait_while(|| !flag.load(Ordering::SeqCst)).await;
                t1_waited.store(waited, Ordering::SeqCst);
                finished.fetch_add(1, Ordering::SeqCst);
                wait.kick();
            });
        }

        // Runs on the iothread after the task has parked itself
        let parked = run_in_context(&main, &ctx, {
            let wait = Arc::clone(&wait);
            move || wait.parked_tasks()
        });
        assert_eq!(parked, 1);
        assert_eq!(ctx.task_count(), 1);

        {
            let (wait, flag, finished) = (Arc::clone(&wait), Arc::clone(&flag), Arc::clone(&finished));
            ctx.spawn(async move {
                flag.store(true, Ordering::SeqCst);
                wait.kick();
                finished.fetch_add(1, Ordering::SeqCst);
                wait.kick();
            });
        }

        wait.wait_while(Some(&*ctx), || finished.load(Ordering::SeqCst) < 2);
        assert_eq!(wait.num_waiters(), 0);
        assert_eq!(wait.parked_tasks(), 0);

        (t1_waited.load(Ordering::SeqCst), finished.load(Ordering::SeqCst))
    });

    assert!(t1_waited);
    assert_eq!(finished, 2);
}

#[test]
fn main_loop_task_resumed_by_foreign_thread() {
    on_dispatcher(|main| {
        let wait = Arc::new(WaitCoordinator::new(&main));
        let flag = Arc::new(AtomicBool::new(false));
        let task_done = Arc::new(AtomicBool::new(false));

        {
            let (wait, flag, task_done) = (Arc::clone(&wait), Arc::clone(&flag), Arc::clone(&task_done));
            main.context().spawn(async move {
                wait.co_wait_while(|| !flag.load(Ordering::SeqCst)).await;
                task_done.store(true, Ordering::SeqCst);
                wait.kick();
            });
        }

        let worker = {
            let (wait, flag) = (Arc::clone(&wait), Arc::clone(&flag));
            std::thread::spawn(move || {
                std::thread::sleep(Duration::from_millis(5));
                flag.store(true, Ordering::SeqCst);
                wait.kick();
            })
        };

        // The dispatcher's own polls drive the task
        assert!(wait.wait_while(None, || !task_done.load(Ordering::SeqCst)));
        worker.join().unwrap();
        assert_eq!(main.context().task_count(), 0);
    });
}
