//! In-flight computation markers.
//!
//! A [`Flight`] marks a fingerprint whose result is being computed right
//! now. The first caller to miss creates one; callers arriving before the
//! result lands register on it and wait instead of recomputing. Completion
//! is broadcast: every waiter wakes, re-reads the store, and either finds
//! the result or reports it unavailable.

use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::{Condvar, Mutex, MutexGuard};

pub(crate) struct Flight {
    done: Mutex<bool>,
    wake: Condvar,
    waiters: AtomicUsize,
}

impl Flight {
    pub(crate) fn new() -> Self {
        Self {
            done: Mutex::new(false),
            wake: Condvar::new(),
            waiters: AtomicUsize::new(0),
        }
    }

    /// Registers a waiter and locks the completion flag.
    ///
    /// Must be called while still holding the store lock. Holding the
    /// returned guard across the store-lock release is what makes a
    /// completion signalled in that window impossible to miss.
    pub(crate) fn begin_wait(&self) -> MutexGuard<'_, bool> {
        self.waiters.fetch_add(1, Ordering::SeqCst);
        self.done.lock()
    }

    /// Blocks until the flight completes. Tolerates spurious wakes.
    pub(crate) fn wait(&self, mut done: MutexGuard<'_, bool>) {
        while !*done {
            self.wake.wait(&mut done);
        }
    }

    /// Marks the flight complete and wakes every waiter.
    pub(crate) fn complete(&self) {
        let mut done = self.done.lock();
        *done = true;
        self.wake.notify_all();
    }

    /// Number of callers registered to wait on this flight.
    pub(crate) fn waiters(&self) -> usize {
        self.waiters.load(Ordering::SeqCst)
    }
}
