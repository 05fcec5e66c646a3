//! Protocol-version-independent value types shared by the session core.
//!
//! Nothing in this crate performs I/O or XDR encode/decode; that boundary
//! belongs to the (external) wire codec per the design's `§1` scope note.
//! This crate exists so `core`, `pump`, `archive`, and `daemon` can agree on
//! one set of Rust types for addresses, environment variables, halt
//! reasons, and notify payloads without any of them owning the wire format.

pub mod address;
pub mod env;
pub mod error_code;
pub mod halt;
pub mod message_code;
pub mod name_list;
pub mod notify;
pub mod version;

pub use address::{Address, TcpEndpoint};
pub use env::EnvVar;
pub use error_code::{ErrorCode, RecoverOutcome, RecoverOutcomeV3};
pub use halt::{halt_reason_from_worker_errno, DataHaltReason, MoverHaltReason, MoverPauseReason};
pub use message_code::{MessageCode, NotifyCode};
pub use name_list::NameListEntry;
pub use notify::{LogSeverity, Notify};
pub use version::ProtocolVersion;
