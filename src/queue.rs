//! Cross-thread primitives shared by the pipeline stages.
//!
//! The queue is a `crossbeam_channel` unbounded channel; the scalar signal is a
//! `parking_lot` mutex with a condition variable. Every wait is bounded by a caller-supplied
//! timeout so that loops can re-check the stop signal between waits.

use crossbeam_channel::{Receiver, Sender, unbounded};
use parking_lot::{Condvar, Mutex};
use std::thread;
use std::time::{Duration, Instant};

const MIN_BACKOFF: Duration = Duration::from_micros(50);
const MAX_BACKOFF: Duration = Duration::from_millis(1);

/// Unbounded multi-producer multi-consumer FIFO. Backpressure is applied by the callers
/// through [`ThreadSafeQueue::wait_while_len`].
#[derive(Debug)]
pub struct ThreadSafeQueue<T> {
    tx: Sender<T>,
    rx: Receiver<T>,
}

impl<T> Default for ThreadSafeQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ThreadSafeQueue<T> {
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        Self { tx, rx }
    }

    pub fn push(&self, item: T) {
        // Both ends live in `self`, so the channel cannot be disconnected here.
        let _ = self.tx.send(item);
    }

    /// Non-blocking pop from the front.
    pub fn try_pop(&self) -> Option<T> {
        self.rx.try_recv().ok()
    }

    /// Pop from the front, waiting up to `timeout` for an item to arrive.
    pub fn pop_timeout(&self, timeout: Duration) -> Option<T> {
        self.rx.recv_timeout(timeout).ok()
    }

    /// Block while `blocked(len)` holds, for at most `timeout`. Returns `true` when the
    /// condition cleared and `false` on timeout.
    ///
    /// The channel has no length notification, so this polls with a capped exponential
    /// backoff.
    pub fn wait_while_len<F>(&self, timeout: Duration, mut blocked: F) -> bool
    where
        F: FnMut(usize) -> bool,
    {
        let deadline = Instant::now() + timeout;
        let mut backoff = MIN_BACKOFF;
        loop {
            if !blocked(self.rx.len()) {
                return true;
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return false;
            }
            thread::sleep(backoff.min(remaining));
            backoff = (backoff * 2).min(MAX_BACKOFF);
        }
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

/// A shared scalar (stop flag, progress counter) with change notification.
#[derive(Debug, Default)]
pub struct Signal<T> {
    value: Mutex<T>,
    changed: Condvar,
}

impl<T: Clone + PartialEq> Signal<T> {
    pub fn new(value: T) -> Self {
        Self {
            value: Mutex::new(value),
            changed: Condvar::new(),
        }
    }

    pub fn get(&self) -> T {
        self.value.lock().clone()
    }

    pub fn set(&self, value: T) {
        *self.value.lock() = value;
        self.changed.notify_all();
    }

    /// Apply `f` under the lock and return the new value.
    pub fn update<F>(&self, f: F) -> T
    where
        F: FnOnce(&T) -> T,
    {
        let mut guard = self.value.lock();
        *guard = f(&guard);
        let value = guard.clone();
        drop(guard);
        self.changed.notify_all();
        value
    }

    /// Wait until the value differs from `current` or `timeout` elapses; returns the value seen.
    pub fn wait_change(&self, current: &T, timeout: Duration) -> T {
        let mut guard = self.value.lock();
        self.changed
            .wait_while_for(&mut guard, |value| *value == *current, timeout);
        guard.clone()
    }
}
