//! Shared helpers for the behavioral specs.

use std::sync::mpsc;
use std::time::Duration;

pub use hv_aio::{AioContext, Config, IoThread, IoThreadConfig, MainLoop};
pub use hv_wait::{bh_oneshot, run_in_context, WaitCoordinator};
pub use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
pub use std::sync::{Arc, Mutex};

/// Generous bound for scenarios that must finish; a hang fails the test
pub const SCENARIO_TIMEOUT: Duration = Duration::from_secs(20);

/// Run `scenario` on a fresh thread that becomes the dispatcher
///
/// Panics if the scenario does not finish within [`SCENARIO_TIMEOUT`], which
/// is how deadlocks and lost wakeups show up.
pub fn on_dispatcher<F, R>(scenario: F) -> R
where
    F: FnOnce(MainLoop) -> R + Send + 'static,
    R: Send + 'static,
{
    let (tx, rx) = mpsc::channel();
    std::thread::Builder::new()
        .name("dispatcher".to_string())
        .spawn(move || {
            let main = MainLoop::new();
            let _ = tx.send(scenario(main));
        })
        .unwrap();

    match rx.recv_timeout(SCENARIO_TIMEOUT) {
        Ok(result) => result,
        Err(mpsc::RecvTimeoutError::Timeout) => panic!("scenario did not finish: deadlock or lost wakeup"),
        Err(mpsc::RecvTimeoutError::Disconnected) => panic!("scenario panicked"),
    }
}

pub fn iothread(name: &str) -> IoThread {
    IoThread::spawn(&IoThreadConfig::new(name)).unwrap()
}
