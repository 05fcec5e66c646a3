use socket2::Socket;
use wire::{Address, DataHaltReason, EnvVar, NameListEntry};

use crate::env_list::EnvList;
use crate::error::NdmpError;
use crate::fd::SharedSocket;
use crate::state::{DataOperation, DataState};

/// DATA subsystem record (`§3`, `§4.3`).
///
/// Every state-changing method enforces the transition table itself and
/// returns `Err(NdmpError::IllegalState)` rather than leaving call sites to
/// check `state` by hand — the same centralization the teacher uses for
/// `GeneratorError`.
pub struct DataRecord {
    state: DataState,
    halt_reason: DataHaltReason,
    operation: DataOperation,
    abort_requested: bool,
    address: Address,
    listen_socket: Option<Socket>,
    data_socket: Option<SharedSocket>,
    env: EnvList,
    name_list: Vec<NameListEntry>,
    read_offset: u64,
    read_length: u64,
    bytes_left_to_read: u64,
    position: u64,
    discard_length: u64,
    bytes_processed: u64,
}

impl DataRecord {
    pub fn new() -> Self {
        Self {
            state: DataState::Idle,
            halt_reason: DataHaltReason::NotApplicable,
            operation: DataOperation::NoAction,
            abort_requested: false,
            address: Address::Local,
            listen_socket: None,
            data_socket: None,
            env: EnvList::new(),
            name_list: Vec::new(),
            read_offset: 0,
            read_length: 0,
            bytes_left_to_read: 0,
            position: 0,
            discard_length: 0,
            bytes_processed: 0,
        }
    }

    pub const fn state(&self) -> DataState {
        self.state
    }

    pub const fn halt_reason(&self) -> DataHaltReason {
        self.halt_reason
    }

    pub const fn operation(&self) -> DataOperation {
        self.operation
    }

    pub const fn abort_requested(&self) -> bool {
        self.abort_requested
    }

    pub const fn address(&self) -> &Address {
        &self.address
    }

    pub const fn bytes_processed(&self) -> u64 {
        self.bytes_processed
    }

    pub fn add_bytes_processed(&mut self, n: u64) {
        self.bytes_processed += n;
    }

    pub const fn data_socket(&self) -> Option<&SharedSocket> {
        self.data_socket.as_ref()
    }

    fn require(&self, request: &'static str, allowed: &[DataState]) -> Result<(), NdmpError> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(NdmpError::illegal_state(request, self.state.as_str()))
        }
    }

    /// `listen` (`§4.3`). `listen_socket` is `None` for a `LOCAL` address —
    /// the intent is merely recorded, not bound to a socket.
    pub fn listen(&mut self, address: Address, listen_socket: Option<Socket>) -> Result<(), NdmpError> {
        self.require("listen", &[DataState::Idle])?;
        self.address = address;
        self.listen_socket = listen_socket;
        self.state = DataState::Listen;
        Ok(())
    }

    /// Extracts the accepted connection from the listener (`§4.3`): peer
    /// address stored, listen handler removed by the caller, listener
    /// dropped here (closing it), socket tuning already applied by the
    /// caller before this is invoked.
    pub fn accept(&mut self, peer: SharedSocket, address: Address) -> Result<(), NdmpError> {
        self.require("accept", &[DataState::Listen])?;
        self.listen_socket = None;
        self.data_socket = Some(peer);
        self.address = address;
        self.state = DataState::Connected;
        Ok(())
    }

    /// `connect` to a TCP peer (`§4.3`). The `LOCAL` branch, which instead
    /// drives MOVER straight to ACTIVE, is coordinated at the session level
    /// since it mutates both records.
    pub fn connect_tcp(&mut self, peer: SharedSocket, address: Address) -> Result<(), NdmpError> {
        self.require("connect", &[DataState::Idle])?;
        self.data_socket = Some(peer);
        self.address = address;
        self.state = DataState::Connected;
        Ok(())
    }

    /// `connect` for a `LOCAL` address (`§4.3`): no socket of its own, DATA
    /// goes straight to CONNECTED once the session confirms MOVER is ready.
    pub fn connect_local(&mut self) -> Result<(), NdmpError> {
        self.require("connect", &[DataState::Idle])?;
        self.address = Address::Local;
        self.state = DataState::Connected;
        Ok(())
    }

    /// `start_backup`/`start_recover` (`§4.3`). `bu_type` validation happens
    /// at the call site before this is invoked so the error path never
    /// mutates state, matching the boundary behavior in `§8`
    /// ("leaves state = CONNECTED").
    pub fn start(
        &mut self,
        operation: DataOperation,
        env: Vec<EnvVar>,
        names: Vec<NameListEntry>,
    ) -> Result<(), NdmpError> {
        self.require("start", &[DataState::Connected])?;
        self.env = EnvList::new();
        for var in env {
            self.env.add(var.name, var.value);
        }
        self.name_list = names;
        self.operation = operation;
        self.bytes_processed = 0;
        self.state = DataState::Active;
        Ok(())
    }

    /// `abort` (`§4.3`). From LISTEN/CONNECTED this halts immediately; from
    /// ACTIVE it only raises the flag — the transition to HALTED waits for
    /// the worker's `done` callback.
    pub fn abort(&mut self) -> Result<(), NdmpError> {
        match self.state {
            DataState::Listen | DataState::Connected => {
                self.halt(DataHaltReason::Aborted);
                Ok(())
            }
            DataState::Active => {
                self.abort_requested = true;
                Ok(())
            }
            DataState::Idle | DataState::Halted => {
                Err(NdmpError::illegal_state("abort", self.state.as_str()))
            }
        }
    }

    /// Drives DATA to HALTED with `reason`, logging before the caller emits
    /// the corresponding notify (`SPEC_FULL.md` §2B). Drops the listen and
    /// data sockets; the data socket's fd only actually closes once MOVER's
    /// clone (if any, the `ndmpcopy` aliasing case) is also gone.
    pub fn halt(&mut self, reason: DataHaltReason) {
        tracing::debug!(?reason, "data halted");
        self.halt_reason = reason;
        self.state = DataState::Halted;
        self.listen_socket = None;
        self.data_socket = None;
    }

    /// `get_env` (`§3`, `§8`): only ACTIVE or HALTED expose the live list.
    pub fn get_env(&self) -> Result<&[EnvVar], NdmpError> {
        self.require("get_env", &[DataState::Active, DataState::Halted])?;
        Ok(self.env.entries())
    }

    pub fn env_mut(&mut self) -> &mut EnvList {
        &mut self.env
    }

    pub fn name_list(&self) -> &[NameListEntry] {
        &self.name_list
    }

    /// `data_stop` (`§4.3`, `§8`): only valid from HALTED; re-arms the
    /// record for another operation via `data_init`. Sockets are already
    /// dropped by `halt`, so this only needs to reset the rest of the
    /// record's bookkeeping.
    pub fn stop(&mut self) -> Result<(), NdmpError> {
        self.require("stop", &[DataState::Halted])?;
        *self = Self::new();
        Ok(())
    }
}

impl Default for DataRecord {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;
    use std::sync::Arc;

    #[test]
    fn listen_from_idle_transitions_to_listen() {
        let mut data = DataRecord::new();
        data.listen(Address::tcp_one(Ipv4Addr::LOCALHOST, 9000), None)
            .unwrap();
        assert_eq!(data.state(), DataState::Listen);
    }

    #[test]
    fn start_backup_from_idle_is_illegal_state() {
        let mut data = DataRecord::new();
        let err = data.start(DataOperation::Backup, Vec::new(), Vec::new());
        assert!(err.is_err());
        assert_eq!(data.state(), DataState::Idle);
    }

    #[test]
    fn abort_from_active_only_raises_flag() {
        let mut data = DataRecord::new();
        data.listen(Address::Local, None).unwrap();
        let socket = Socket::new(socket2::Domain::UNIX, socket2::Type::STREAM, None).unwrap();
        data.accept(Arc::new(socket), Address::Local).unwrap();
        data.start(DataOperation::Backup, Vec::new(), Vec::new())
            .unwrap();
        data.abort().unwrap();
        assert_eq!(data.state(), DataState::Active);
        assert!(data.abort_requested());
    }

    #[test]
    fn abort_from_connected_halts_immediately() {
        let mut data = DataRecord::new();
        data.connect_local().unwrap();
        data.abort().unwrap();
        assert_eq!(data.state(), DataState::Halted);
        assert_eq!(data.halt_reason(), DataHaltReason::Aborted);
    }

    #[test]
    fn stop_from_halted_reinitializes_to_idle() {
        let mut data = DataRecord::new();
        data.connect_local().unwrap();
        data.abort().unwrap();
        data.stop().unwrap();
        assert_eq!(data.state(), DataState::Idle);
        assert!(data.name_list().is_empty());
    }

    #[test]
    fn stop_outside_halted_is_illegal_state() {
        let mut data = DataRecord::new();
        assert!(data.stop().is_err());
    }

    #[test]
    fn get_env_rejected_outside_active_or_halted() {
        let data = DataRecord::new();
        assert!(data.get_env().is_err());
    }
}
