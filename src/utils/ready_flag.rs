use crossbeam::utils::{Backoff, CachePadded};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

/// One-way "ready" latch shared between an event-loop thread and whoever waits for it
/// (e.g. a producer that must not write before subscriptions are in place).
#[derive(Clone)]
#[repr(transparent)]
pub struct ReadyFlag(Arc<CachePadded<AtomicBool>>);

impl ReadyFlag {
    pub fn new() -> Self {
        Self(Arc::new(CachePadded::new(AtomicBool::new(false))))
    }

    #[inline]
    pub fn set(&self) {
        self.0.store(true, Ordering::Release);
    }

    #[inline]
    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Waits until the flag is set or `timeout` elapses. Returns the final state.
    pub fn wait(&self, timeout: Duration) -> bool {
        let start = Instant::now();
        let backoff = Backoff::new();
        while !self.is_set() {
            if start.elapsed() >= timeout {
                return false;
            }
            if backoff.is_completed() {
                thread::sleep(Duration::from_millis(1));
            } else {
                backoff.snooze();
            }
        }
        true
    }
}

impl Default for ReadyFlag {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ReadyFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ReadyFlag").field(&self.is_set()).finish()
    }
}
