use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

struct StopState {
    stopped: AtomicBool,
    parent: Option<Arc<StopState>>,
}

impl StopState {
    fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
            || self.parent.as_ref().is_some_and(|p| p.is_stopped())
    }
}

/// Cooperative stop signal for event-loop threads.
///
/// Loops check it between `select` calls; the reactor itself has no cancellation.
/// Stopping a token stops every child created from it.
#[derive(Clone)]
pub struct StopToken {
    state: Arc<StopState>,
}

impl StopToken {
    pub fn new() -> Self {
        Self {
            state: Arc::new(StopState {
                stopped: AtomicBool::new(false),
                parent: None,
            }),
        }
    }

    /// Token stopped by either itself or `self`.
    pub fn child(&self) -> Self {
        Self {
            state: Arc::new(StopState {
                stopped: AtomicBool::new(false),
                parent: Some(self.state.clone()),
            }),
        }
    }

    #[inline]
    pub fn stop(&self) {
        self.state.stopped.store(true, Ordering::Release);
    }

    #[inline]
    pub fn is_stopped(&self) -> bool {
        self.state.is_stopped()
    }

    /// Sleeps up to `total`, waking early on stop. Returns `false` if stopped.
    pub fn sleep(&self, total: Duration) -> bool {
        let deadline = Instant::now() + total;
        let tick = Duration::from_millis(20);
        loop {
            if self.is_stopped() {
                return false;
            }
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            std::thread::sleep(tick.min(deadline - now));
        }
    }
}

impl Default for StopToken {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for StopToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StopToken")
            .field("stopped", &self.is_stopped())
            .finish()
    }
}
