//! Background expiry sweeper.
//!
//! One sweeper thread per cache. It wakes on a fixed interval, removes
//! entries older than the TTL, and goes back to sleep. The timed sleep
//! doubles as the stop signal: teardown flips a flag, notifies the condvar,
//! and joins the thread, so a closed cache never leaks its sweeper.

use std::sync::Arc;
use std::thread::JoinHandle;

use parking_lot::{Condvar, Mutex};
use tracing::{debug, warn};

use crate::cache::CacheInner;

struct StopSignal {
    stopped: Mutex<bool>,
    wake: Condvar,
}

pub(crate) struct SweeperHandle {
    signal: Arc<StopSignal>,
    thread: Option<JoinHandle<()>>,
}

pub(crate) fn spawn(inner: Arc<CacheInner>) -> SweeperHandle {
    let signal = Arc::new(StopSignal {
        stopped: Mutex::new(false),
        wake: Condvar::new(),
    });
    let thread = std::thread::spawn({
        let signal = Arc::clone(&signal);
        move || run(inner, signal)
    });
    SweeperHandle {
        signal,
        thread: Some(thread),
    }
}

fn run(inner: Arc<CacheInner>, signal: Arc<StopSignal>) {
    let interval = inner.config.sweep_interval;
    debug!(
        interval = ?interval,
        expire_after = ?inner.config.expire_after,
        "expiry sweeper started"
    );

    // Checking the flag before the first wait covers a stop that lands
    // between spawn and this lock acquisition.
    let mut stopped = signal.stopped.lock();
    while !*stopped {
        signal.wake.wait_for(&mut stopped, interval);
        if *stopped {
            break;
        }
        let removed = inner.sweep();
        if removed > 0 {
            debug!(removed, "removed expired entries");
        }
    }
    debug!("expiry sweeper stopped");
}

impl SweeperHandle {
    /// Signals the sweeper to stop and joins it. Idempotent.
    pub(crate) fn stop(&mut self) {
        {
            let mut stopped = self.signal.stopped.lock();
            *stopped = true;
        }
        self.signal.wake.notify_all();
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                warn!("expiry sweeper thread panicked");
            }
        }
    }
}
