//! Running a callback in another context and waiting for it.

use crate::prelude::*;

#[test]
fn callback_runs_once_on_each_target_before_return() {
    let ran_on = on_dispatcher(|main| {
        let threads: Vec<IoThread> = ["io-a", "io-b", "io-c"].into_iter().map(iothread).collect();
        let mut ran_on = Vec::new();

        for io in &threads {
            let ctx: &AioContext = io.context();
            let runs = Arc::new(AtomicUsize::new(0));
            let name = Arc::new(Mutex::new(None));
            {
                let _guard = ctx.lock();
                let (runs, name) = (Arc::clone(&runs), Arc::clone(&name));
                bh_oneshot(&main, ctx, move || {
                    runs.fetch_add(1, Ordering::SeqCst);
                    *name.lock().unwrap() = std::thread::current().name().map(str::to_string);
                });
            }
            assert_eq!(runs.load(Ordering::SeqCst), 1);
            ran_on.push(name.lock().unwrap().take());
        }
        ran_on
    });

    assert_eq!(
        ran_on,
        vec![Some("io-a".to_string()), Some("io-b".to_string()), Some("io-c".to_string())]
    );
}

#[test]
fn bridge_waits_for_slow_callback() {
    let observed = on_dispatcher(|main| {
        let io = iothread("io-slow");
        let ctx: &AioContext = io.context();
        let _guard = ctx.lock();

        run_in_context(&main, ctx, || {
            std::thread::sleep(std::time::Duration::from_millis(20));
            "slow result"
        })
    });

    assert_eq!(observed, "slow result");
}

#[test]
fn main_loop_work_keeps_running_during_a_bridge() {
    let main_ran = on_dispatcher(|main| {
        let io = iothread("io-main-work");
        let ctx: &AioContext = io.context();
        let main_ran = Arc::new(AtomicBool::new(false));

        {
            let main_ran = Arc::clone(&main_ran);
            main.context().schedule_oneshot(move || main_ran.store(true, Ordering::SeqCst));
        }

        let _guard = ctx.lock();
        // The target only finishes once the main loop has dispatched its own work
        let seen_main_work = run_in_context(&main, ctx, {
            let main_ran = Arc::clone(&main_ran);
            move || {
                let deadline = std::time::Instant::now() + SCENARIO_TIMEOUT;
                while !main_ran.load(Ordering::SeqCst) && std::time::Instant::now() < deadline {
                    std::thread::yield_now();
                }
                main_ran.load(Ordering::SeqCst)
            }
        });
        assert!(seen_main_work);
        main_ran.load(Ordering::SeqCst)
    });

    assert!(main_ran);
}
