//! The single-threaded readiness-driven event loop described in `§4.1`.
//!
//! Built on `libc::poll` rather than `mio`: the handler set per session is
//! always small, so a plain vector rebuilt per call avoids pulling in an
//! epoll abstraction the rest of the workspace doesn't need either.

mod class;
mod error;
mod interest;
#[allow(clippy::module_inception)]
mod reactor;

pub use class::HandlerClass;
pub use error::ReactorError;
pub use interest::{Interest, Readiness};
pub use reactor::{poll_timeout_ms, HandlerOutcome, Reactor, SelectOutcome};
