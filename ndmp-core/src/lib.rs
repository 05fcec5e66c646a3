//! Session state, the DATA/MOVER machines, and the error taxonomy (`§3`,
//! `§4.3`, `§4.4`, `§7`).
//!
//! This crate has no knowledge of the wire format or the reactor; it is the
//! part of the design the rest of the workspace calls into to find out
//! whether a request is legal right now, and what changes if it is.

pub mod data;
pub mod env_list;
pub mod error;
pub mod fd;
pub mod mover;
pub mod session;
pub mod state;

pub use data::DataRecord;
pub use env_list::EnvList;
pub use error::NdmpError;
pub use fd::SharedSocket;
pub use mover::MoverRecord;
pub use session::{Session, SessionState};
pub use state::{DataOperation, DataState, MoverState};
