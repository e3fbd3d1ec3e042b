use crate::error::SelectError;
use crate::select::{SelectOutcome, Selectable, Selected};
use mio::unix::SourceFd;
use mio::{Events, Interest, Poll, Token};
use std::cell::RefCell;
use std::cmp::Reverse;
use std::collections::{BTreeSet, HashMap};
use std::io;
use std::os::fd::RawFd;
use std::rc::{Rc, Weak};
use std::time::Duration;

/// Registration record of one source.
struct SelData {
    source: Weak<RefCell<dyn Selectable>>,
    max_events: u64,
}

/// Position in the ready set: highest priority first, then least recently serviced.
/// The descriptor only breaks exact ties.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd)]
struct ReadyKey {
    priority: Reverse<i32>,
    last_used: u64,
    fd: RawFd,
}

/// Priority-aware readiness reactor.
///
/// Sources stay owned by the caller; the reactor keeps weak references and forgets a
/// source completely on [`Select::remove_selectable`]. A `Select` is driven by a
/// single thread (it is `!Send`).
pub struct Select {
    poll: Poll,
    events: Events,
    objects: HashMap<RawFd, SelData>,
    ready: BTreeSet<ReadyKey>,
    ready_index: HashMap<RawFd, ReadyKey>,
    /// Sum of `max_events` over registered sources; sizes the event batch.
    capacity: u64,
    /// Logical service clock, bumped each time a source is handed out.
    clock: u64,
}

impl Select {
    pub fn new() -> Result<Self, SelectError> {
        let poll = Poll::new().map_err(SelectError::Create)?;
        Ok(Self {
            poll,
            events: Events::with_capacity(1),
            objects: HashMap::new(),
            ready: BTreeSet::new(),
            ready_index: HashMap::new(),
            capacity: 0,
            clock: 0,
        })
    }

    /// Registers a source for read readiness.
    ///
    /// Adding a descriptor that is already registered is logged and ignored.
    pub fn add_selectable<S: Selectable + 'static>(
        &mut self,
        selectable: &Rc<RefCell<S>>,
    ) -> Result<(), SelectError> {
        let source: Rc<RefCell<dyn Selectable>> = selectable.clone();
        self.add_source(&source)
    }

    pub fn add_selectables<'a, S, I>(&mut self, selectables: I) -> Result<(), SelectError>
    where
        S: Selectable + 'static,
        I: IntoIterator<Item = &'a Rc<RefCell<S>>>,
    {
        for sel in selectables {
            self.add_selectable(sel)?;
        }
        Ok(())
    }

    /// Type-erased form of [`Select::add_selectable`].
    pub fn add_source(&mut self, source: &Rc<RefCell<dyn Selectable>>) -> Result<(), SelectError> {
        let (fd, max_events, with_data, priority, last_used) = {
            let sel = source.borrow();
            (
                sel.fd(),
                sel.max_events(),
                sel.initialized_with_data(),
                sel.priority(),
                sel.last_used_time(),
            )
        };

        if let Some(existing) = self.objects.get(&fd) {
            if existing.source.strong_count() > 0 {
                tracing::warn!("[Select] fd {} is already added to the list, ignoring", fd);
                return Ok(());
            }
            // descriptor reused after its previous owner was dropped unregistered
            self.forget(fd);
        }

        self.poll
            .registry()
            .register(&mut SourceFd(&fd), Token(fd as usize), Interest::READABLE)
            .map_err(|source| SelectError::Register { fd, source })?;

        self.objects.insert(
            fd,
            SelData {
                source: Rc::downgrade(source),
                max_events,
            },
        );

        if with_data {
            self.insert_ready(fd, priority, last_used);
        }

        self.capacity += max_events;
        tracing::debug!(
            "[Select] added fd {} (priority {}, max events {}), capacity {}",
            fd,
            priority,
            max_events,
            self.capacity
        );
        Ok(())
    }

    /// Unregisters a source and drops every trace of it, including a pending ready entry.
    ///
    /// Removing a source that is not registered is logged and ignored.
    pub fn remove_selectable<S: Selectable + 'static>(
        &mut self,
        selectable: &Rc<RefCell<S>>,
    ) -> Result<(), SelectError> {
        let fd = selectable.borrow().fd();
        self.remove_fd(fd)
    }

    pub fn remove_fd(&mut self, fd: RawFd) -> Result<(), SelectError> {
        if !self.objects.contains_key(&fd) {
            tracing::error!("[Select] fd {} is not added to the list, ignoring", fd);
            return Ok(());
        }

        self.forget(fd);

        self.poll
            .registry()
            .deregister(&mut SourceFd(&fd))
            .map_err(|source| SelectError::Deregister { fd, source })
    }

    /// Waits for a source with data.
    ///
    /// A zero `timeout_ms` never blocks; a negative one blocks until something is
    /// ready. When the wait is interrupted by a signal, `SelectOutcome::Signal` is
    /// returned if `interrupt_on_signal` is set, otherwise the wait is resumed.
    pub fn select(&mut self, timeout_ms: i32, interrupt_on_signal: bool) -> SelectOutcome {
        let outcome = self.poll_descriptors(Some(Duration::ZERO), false);
        if !matches!(outcome, SelectOutcome::Timeout) || timeout_ms == 0 {
            return outcome;
        }

        let timeout = if timeout_ms < 0 {
            None
        } else {
            Some(Duration::from_millis(timeout_ms as u64))
        };
        self.poll_descriptors(timeout, interrupt_on_signal)
    }

    #[inline]
    pub fn is_queue_empty(&self) -> bool {
        self.ready.is_empty()
    }

    /// Current multiplexing capacity: the sum of registered sources' event budgets.
    #[inline]
    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    /// Registered descriptors in ascending order.
    pub fn registered(&self) -> Vec<RawFd> {
        let mut fds: Vec<RawFd> = self.objects.keys().copied().collect();
        fds.sort_unstable();
        fds
    }

    #[inline]
    pub fn contains(&self, fd: RawFd) -> bool {
        self.objects.contains_key(&fd)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    fn poll_descriptors(
        &mut self,
        timeout: Option<Duration>,
        interrupt_on_signal: bool,
    ) -> SelectOutcome {
        let wanted = self.capacity.max(1) as usize;
        if self.events.capacity() != wanted {
            self.events = Events::with_capacity(wanted);
        }

        loop {
            match self.poll.poll(&mut self.events, timeout) {
                Ok(()) => break,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {
                    if interrupt_on_signal {
                        return SelectOutcome::Signal;
                    }
                }
                Err(e) => {
                    tracing::warn!("[Select] poll failed: {}", e);
                    return SelectOutcome::Error;
                }
            }
        }

        let signalled: Vec<RawFd> = self
            .events
            .iter()
            .map(|ev| ev.token().0 as RawFd)
            .collect();

        // Edge-triggered: read every signalled source before reporting a failure.
        let mut failed = false;
        for fd in signalled {
            let Some(source) = self.upgrade(fd) else {
                continue;
            };
            let (read, priority, last_used) = {
                let mut sel = source.borrow_mut();
                (sel.read_data(), sel.priority(), sel.last_used_time())
            };
            match read {
                Ok(_) => self.insert_ready(fd, priority, last_used),
                Err(e) => {
                    tracing::error!("[Select] read_data error on fd {}: {}", fd, e);
                    failed = true;
                }
            }
        }
        if failed {
            return SelectOutcome::Error;
        }

        while let Some(fd) = self.pop_ready() {
            let Some(source) = self.upgrade(fd) else {
                continue;
            };

            {
                let mut sel = source.borrow_mut();
                if !sel.has_data() {
                    continue;
                }

                self.clock += 1;
                sel.update_last_used_time(self.clock);

                if sel.has_cached_data() {
                    self.insert_ready(fd, sel.priority(), self.clock);
                }

                sel.update_after_read();
            }

            return SelectOutcome::Object(Selected::new(fd, source));
        }

        SelectOutcome::Timeout
    }

    fn insert_ready(&mut self, fd: RawFd, priority: i32, last_used: u64) {
        if self.ready_index.contains_key(&fd) {
            return;
        }
        let key = ReadyKey {
            priority: Reverse(priority),
            last_used,
            fd,
        };
        self.ready.insert(key);
        self.ready_index.insert(fd, key);
    }

    fn pop_ready(&mut self) -> Option<RawFd> {
        let key = self.ready.pop_first()?;
        self.ready_index.remove(&key.fd);
        Some(key.fd)
    }

    fn erase_ready(&mut self, fd: RawFd) {
        if let Some(key) = self.ready_index.remove(&fd) {
            self.ready.remove(&key);
        }
    }

    /// Drops the bookkeeping for `fd` and recomputes capacity from what remains.
    fn forget(&mut self, fd: RawFd) {
        self.objects.remove(&fd);
        self.erase_ready(fd);
        self.capacity = self.objects.values().map(|d| d.max_events).sum();
    }

    /// Resolves a registration to its live source; purges it if the source was dropped.
    fn upgrade(&mut self, fd: RawFd) -> Option<Rc<RefCell<dyn Selectable>>> {
        let data = self.objects.get(&fd)?;
        match data.source.upgrade() {
            Some(source) => Some(source),
            None => {
                tracing::warn!("[Select] source for fd {} dropped without removal", fd);
                self.forget(fd);
                if let Err(e) = self.poll.registry().deregister(&mut SourceFd(&fd)) {
                    tracing::debug!("[Select] deregister of stale fd {} failed: {}", fd, e);
                }
                None
            }
        }
    }
}
