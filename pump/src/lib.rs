//! The I/O pump that moves bytes between a socket and a tape device (`§4.5`).
//!
//! Two independent concerns live here: record-aligned buffering for the
//! local mover ([`TapeBuffer`]/[`TapeReader`]), and short-read/short-write/
//! `EINTR`-transparent relaying for the remote mover ([`remote_read`]/
//! [`remote_write`]). Neither knows about NDMP session state — `daemon` wires
//! them to the right socket and tape handle per the negotiated mover mode.

mod remote;
mod tape_buffer;
mod tape_reader;

pub use remote::{remote_read, remote_write, RemoteRead};
pub use tape_buffer::TapeBuffer;
pub use tape_reader::TapeReader;
