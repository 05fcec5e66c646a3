//! Wires the request dispatcher, the DATA/MOVER handlers, and the
//! accept/worker threads together into one running NDMP session (`§4.2`,
//! `§5`). Everything that talks XDR bytes on the wire stays outside this
//! crate (`§1`, `§6A`); [`accept::RequestSource`]/[`accept::ReplySink`] are
//! the seam an external codec plugs into.

mod accept;
mod callbacks;
mod config;
mod dispatch;
mod error;
mod handlers;
mod request;
mod socket_tuning;

pub use accept::{accept_loop, run_session, ReplySink, RequestSource};
pub use callbacks::SessionCallbacks;
pub use config::DaemonConfig;
pub use dispatch::dispatch;
pub use error::DaemonError;
pub use handlers::SessionRuntime;
pub use request::{AddressFamily, DataStateReply, ListenReply, Reply, ReplyBody, Request};
pub use socket_tuning::apply_tcp_tuning;
