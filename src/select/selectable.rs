use crate::error::ReadError;
use std::os::fd::RawFd;

/// An event source the [`Select`](crate::select::Select) reactor can multiplex.
///
/// A source is identified by its file descriptor for as long as it stays
/// registered; the descriptor must not change in between.
pub trait Selectable {
    /// Descriptor polled for read readiness.
    fn fd(&self) -> RawFd;

    /// Static ordering weight. Higher is serviced first.
    fn priority(&self) -> i32 {
        0
    }

    /// Expected number of messages per readiness cycle. Only sizes the reactor's
    /// event batch; it does not cap buffering.
    fn max_events(&self) -> u64 {
        1
    }

    /// Whether the source may already hold data when it is registered.
    fn initialized_with_data(&self) -> bool {
        false
    }

    /// At least one message is buffered.
    fn has_data(&self) -> bool;

    /// More than one message is buffered; the reactor will offer the source again.
    fn has_cached_data(&self) -> bool {
        false
    }

    /// Pulls everything currently readable off the transport into the source's
    /// buffer. Called only after the descriptor signalled readiness.
    ///
    /// Readiness is edge-triggered: implementations must keep reading until the
    /// transport reports `WouldBlock`. Bytes left in the socket are not signalled
    /// again until more data arrives.
    fn read_data(&mut self) -> Result<u64, ReadError>;

    /// Hook run right after the reactor hands this source to its caller.
    fn update_after_read(&mut self) {}

    /// Tick of the last time the source was handed out.
    fn last_used_time(&self) -> u64;

    fn update_last_used_time(&mut self, tick: u64);
}

/// Service-time bookkeeping shared by selectable implementations.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub struct ServiceClock {
    last_used: u64,
}

impl ServiceClock {
    #[inline]
    pub fn last_used(&self) -> u64 {
        self.last_used
    }

    #[inline]
    pub fn touch(&mut self, tick: u64) {
        self.last_used = tick;
    }
}
