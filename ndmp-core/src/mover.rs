use std::fs::File;

use socket2::Socket;
use wire::{Address, MoverHaltReason, MoverPauseReason};

use crate::error::NdmpError;
use crate::fd::SharedSocket;
use crate::state::MoverState;

/// MOVER subsystem record (`§3`, `§4.4`).
///
/// Unlike DATA, MOVER has no NDMP request handlers of its own in this
/// core's scope (`§6` lists only `DATA_*` message codes) — it is driven
/// indirectly by DATA's `listen`/`connect` and by the pump/worker via
/// `pause`/`continue`/`mover_error`.
pub struct MoverRecord {
    state: MoverState,
    halt_reason: MoverHaltReason,
    pause_reason: MoverPauseReason,
    address: Address,
    listen_socket: Option<Socket>,
    data_socket: Option<SharedSocket>,
    tape: Option<File>,
    record_size: u32,
    window_offset: u64,
    window_length: u64,
    bytes_moved: u64,
    buffer: Option<pump::TapeBuffer>,
    reader: Option<pump::TapeReader>,
}

impl MoverRecord {
    pub fn new(record_size: u32) -> Self {
        Self {
            state: MoverState::Idle,
            halt_reason: MoverHaltReason::NotApplicable,
            pause_reason: MoverPauseReason::NotApplicable,
            address: Address::Local,
            listen_socket: None,
            data_socket: None,
            tape: None,
            record_size,
            window_offset: 0,
            window_length: 0,
            bytes_moved: 0,
            buffer: None,
            reader: None,
        }
    }

    pub const fn state(&self) -> MoverState {
        self.state
    }

    pub const fn halt_reason(&self) -> MoverHaltReason {
        self.halt_reason
    }

    pub const fn pause_reason(&self) -> MoverPauseReason {
        self.pause_reason
    }

    pub const fn address(&self) -> &Address {
        &self.address
    }

    pub const fn record_size(&self) -> u32 {
        self.record_size
    }

    pub const fn window_offset(&self) -> u64 {
        self.window_offset
    }

    pub const fn window_length(&self) -> u64 {
        self.window_length
    }

    pub fn set_window(&mut self, offset: u64, length: u64) {
        self.window_offset = offset;
        self.window_length = length;
    }

    pub const fn bytes_moved(&self) -> u64 {
        self.bytes_moved
    }

    pub fn add_bytes_moved(&mut self, n: u64) {
        self.bytes_moved += n;
    }

    pub const fn data_socket(&self) -> Option<&SharedSocket> {
        self.data_socket.as_ref()
    }

    fn require(&self, request: &'static str, allowed: &[MoverState]) -> Result<(), NdmpError> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(NdmpError::illegal_state(request, self.state.as_str()))
        }
    }

    pub fn listen(&mut self, address: Address, listen_socket: Option<Socket>) -> Result<(), NdmpError> {
        self.require("mover_listen", &[MoverState::Idle])?;
        self.address = address;
        self.listen_socket = listen_socket;
        self.state = MoverState::Listen;
        Ok(())
    }

    /// Accepted connection on the mover's own listen socket.
    pub fn accept(&mut self, peer: SharedSocket, address: Address) -> Result<(), NdmpError> {
        self.require("mover_accept", &[MoverState::Listen])?;
        self.listen_socket = None;
        self.data_socket = Some(peer);
        self.address = address;
        self.state = MoverState::Active;
        Ok(())
    }

    /// DATA's `connect` to a `LOCAL` address activates MOVER directly from
    /// LISTEN with no socket of its own (`§4.3`).
    pub fn activate_local(&mut self) -> Result<(), NdmpError> {
        self.require("mover_connect_local", &[MoverState::Listen])?;
        self.address = Address::Local;
        self.state = MoverState::Active;
        Ok(())
    }

    pub fn set_tape(&mut self, tape: File) {
        self.tape = Some(tape);
    }

    pub fn tape_mut(&mut self) -> Option<&mut File> {
        self.tape.as_mut()
    }

    pub fn arm_writer(&mut self) {
        self.buffer = Some(pump::TapeBuffer::new(self.record_size as usize));
        self.reader = None;
    }

    pub fn arm_reader(&mut self) {
        self.reader = Some(pump::TapeReader::new(self.record_size as usize));
        self.buffer = None;
    }

    pub fn buffer_mut(&mut self) -> Option<&mut pump::TapeBuffer> {
        self.buffer.as_mut()
    }

    pub fn reader_mut(&mut self) -> Option<&mut pump::TapeReader> {
        self.reader.as_mut()
    }

    /// `mover_pause` (`§4.4`): only valid from ACTIVE, entered when a read
    /// window is exhausted during recover and the DMA must reposition.
    pub fn pause(&mut self, reason: MoverPauseReason) -> Result<(), NdmpError> {
        self.require("mover_pause", &[MoverState::Active])?;
        self.pause_reason = reason;
        self.state = MoverState::Paused;
        Ok(())
    }

    /// `continue` (`§4.4`): resumes from PAUSED back to ACTIVE.
    pub fn resume(&mut self) -> Result<(), NdmpError> {
        self.require("mover_continue", &[MoverState::Paused])?;
        self.pause_reason = MoverPauseReason::NotApplicable;
        self.state = MoverState::Active;
        Ok(())
    }

    /// `mover_error` (`§4.4`): halts MOVER from LISTEN, ACTIVE, or PAUSED.
    /// Idempotent no-op from IDLE/HALTED so cascaded errors from multiple
    /// sources don't double-log or overwrite an earlier reason. Drops the
    /// listen and data sockets the same way `DataRecord::halt` does.
    pub fn halt(&mut self, reason: MoverHaltReason) {
        if matches!(self.state, MoverState::Idle | MoverState::Halted) {
            return;
        }
        tracing::debug!(?reason, "mover halted");
        self.halt_reason = reason;
        self.state = MoverState::Halted;
        self.listen_socket = None;
        self.data_socket = None;
    }

    /// Reinitializes MOVER back to IDLE, as part of `data_stop` cleanup
    /// (`§5`: MOVER has no NDMP-visible stop of its own). Sockets are
    /// already dropped by `halt` in every reachable path.
    pub fn reinit(&mut self) {
        *self = Self::new(self.record_size);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listen_then_activate_local() {
        let mut mover = MoverRecord::new(10240);
        mover.listen(Address::Local, None).unwrap();
        mover.activate_local().unwrap();
        assert_eq!(mover.state(), MoverState::Active);
    }

    #[test]
    fn pause_and_resume_round_trip() {
        let mut mover = MoverRecord::new(10240);
        mover.listen(Address::Local, None).unwrap();
        mover.activate_local().unwrap();
        mover.pause(MoverPauseReason::Seek).unwrap();
        assert_eq!(mover.state(), MoverState::Paused);
        assert_eq!(mover.pause_reason(), MoverPauseReason::Seek);
        mover.resume().unwrap();
        assert_eq!(mover.state(), MoverState::Active);
        assert_eq!(mover.pause_reason(), MoverPauseReason::NotApplicable);
    }

    #[test]
    fn pause_outside_active_is_illegal_state() {
        let mut mover = MoverRecord::new(10240);
        assert!(mover.pause(MoverPauseReason::Seek).is_err());
    }

    #[test]
    fn halt_is_idempotent_from_idle() {
        let mut mover = MoverRecord::new(10240);
        mover.halt(MoverHaltReason::MediaError);
        assert_eq!(mover.state(), MoverState::Idle);
    }

    #[test]
    fn reinit_resets_to_idle_preserving_record_size() {
        let mut mover = MoverRecord::new(10240);
        mover.listen(Address::Local, None).unwrap();
        mover.activate_local().unwrap();
        mover.halt(MoverHaltReason::Aborted);
        mover.reinit();
        assert_eq!(mover.state(), MoverState::Idle);
        assert_eq!(mover.record_size(), 10240);
        assert!(mover.data_socket().is_none());
    }
}
