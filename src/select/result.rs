use crate::select::Selectable;
use std::cell::RefCell;
use std::fmt;
use std::os::fd::RawFd;
use std::rc::Rc;

/// Stable numeric codes of a select call.
#[repr(i32)]
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum SelectResult {
    Object = 0,
    Error = 1,
    Timeout = 2,
    /// The blocking wait was interrupted by a signal.
    Signal = 3,
}

impl SelectResult {
    #[inline]
    pub fn code(self) -> i32 {
        self as i32
    }

    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(SelectResult::Object),
            1 => Some(SelectResult::Error),
            2 => Some(SelectResult::Timeout),
            3 => Some(SelectResult::Signal),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SelectResult::Object => "OBJECT",
            SelectResult::Error => "ERROR",
            SelectResult::Timeout => "TIMEOUT",
            SelectResult::Signal => "SIGNAL",
        }
    }
}

impl fmt::Display for SelectResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Literal name of a select result code, for logging. Unknown codes map to `"UNKNOWN"`.
pub fn result_to_string(code: i32) -> &'static str {
    match SelectResult::from_code(code) {
        Some(result) => result.as_str(),
        None => {
            tracing::warn!("unknown select result: {}", code);
            "UNKNOWN"
        }
    }
}

/// Source handed out by a successful select.
#[derive(Clone)]
pub struct Selected {
    fd: RawFd,
    source: Rc<RefCell<dyn Selectable>>,
}

impl Selected {
    pub(crate) fn new(fd: RawFd, source: Rc<RefCell<dyn Selectable>>) -> Self {
        Self { fd, source }
    }

    #[inline]
    pub fn fd(&self) -> RawFd {
        self.fd
    }

    pub fn source(&self) -> &Rc<RefCell<dyn Selectable>> {
        &self.source
    }

    /// True if this is the same object as `other`.
    pub fn is<S: Selectable + 'static>(&self, other: &Rc<RefCell<S>>) -> bool {
        std::ptr::addr_eq(Rc::as_ptr(&self.source), Rc::as_ptr(other))
    }
}

impl fmt::Debug for Selected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Selected").field("fd", &self.fd).finish()
    }
}

/// Outcome of [`Select::select`](crate::select::Select::select).
#[derive(Debug, Clone)]
pub enum SelectOutcome {
    Object(Selected),
    Error,
    Timeout,
    Signal,
}

impl SelectOutcome {
    pub fn result(&self) -> SelectResult {
        match self {
            SelectOutcome::Object(_) => SelectResult::Object,
            SelectOutcome::Error => SelectResult::Error,
            SelectOutcome::Timeout => SelectResult::Timeout,
            SelectOutcome::Signal => SelectResult::Signal,
        }
    }

    pub fn selected(&self) -> Option<&Selected> {
        match self {
            SelectOutcome::Object(sel) => Some(sel),
            _ => None,
        }
    }

    pub fn into_selected(self) -> Option<Selected> {
        match self {
            SelectOutcome::Object(sel) => Some(sel),
            _ => None,
        }
    }
}
