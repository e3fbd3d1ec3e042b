//! Readiness multiplexing over many [`Selectable`] sources sharing one blocking wait.
//!
//! Sources with higher priority are serviced first; among equal priorities the one
//! handed out least recently wins. A source that buffered several messages behind a
//! single readiness signal is offered again until it is drained.

mod reactor;
mod result;
mod selectable;

pub use reactor::Select;
pub use result::{SelectOutcome, SelectResult, Selected, result_to_string};
pub use selectable::{Selectable, ServiceClock};
