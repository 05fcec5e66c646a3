use std::io;
use std::os::unix::io::RawFd;
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex};

use archive::{ModuleCallbacks, ReadOutcome, SeekOutcome};
use ndmp_core::Session;
use reactor::{HandlerClass, HandlerOutcome, Interest, Readiness, Reactor, SelectOutcome};
use wire::{LogSeverity, MoverHaltReason, MoverPauseReason, NameListEntry, Notify, RecoverOutcome};

/// Bridges one archive-worker thread to the live session (`§4.6`, `§5`).
///
/// Holds an `Arc<Session>` plus the sending half of the notify channel the
/// reactor thread drains — the worker never calls back into the dispatcher
/// directly, matching the "forbid blocking callbacks into the reactor
/// thread" rule in `§9`. Every method locks the session mutex for the
/// shortest span it can and never holds the guard across a blocking
/// tape/socket operation. `reactor` is the session's own MODULE-class
/// event loop: `dispatch`/`add_file_handler`/`remove_file_handler` are the
/// only callbacks that ever touch it.
pub struct SessionCallbacks {
    session: Arc<Session>,
    notify_tx: Sender<Notify>,
    reactor: Arc<Mutex<Reactor>>,
}

impl SessionCallbacks {
    pub fn new(session: Arc<Session>, notify_tx: Sender<Notify>, reactor: Arc<Mutex<Reactor>>) -> Self {
        Self {
            session,
            notify_tx,
            reactor,
        }
    }

    /// Whether the data stream for this episode should go straight to tape
    /// (MOVER is LOCAL) or over MOVER's own socket (remote three-way and
    /// plain two-way both read/write through `data_socket`).
    fn uses_local_tape(&self) -> bool {
        let state = self.session.lock();
        state.mover.address().is_local()
    }

    /// `mover_error` (`§4.4`, `§7`): halts MOVER and emits
    /// `NOTIFY_MOVER_HALTED` before the I/O error is handed back to the
    /// archive engine, which maps it to `done(EIO)` and cascades the same
    /// failure into `data_error(CONNECT_ERROR)`. `MoverRecord::halt` is
    /// idempotent, so a second failed read/write on an already-halted
    /// MOVER doesn't re-emit the notify.
    fn cascade_mover_error(&self, reason: MoverHaltReason) {
        let was_halted = {
            let state = self.session.lock();
            state.mover.state() == ndmp_core::MoverState::Halted
        };
        if was_halted {
            return;
        }
        self.session.lock().mover.halt(reason);
        let _ = self.notify_tx.send(Notify::MoverHalted { reason });
    }
}

impl ModuleCallbacks for SessionCallbacks {
    fn get_env(&self, name: &str) -> Option<String> {
        let state = self.session.lock();
        state
            .data
            .get_env()
            .ok()?
            .iter()
            .rev()
            .find(|e| e.name == name)
            .map(|e| e.value.clone())
    }

    fn add_env(&mut self, name: &str, value: &str) {
        let mut state = self.session.lock();
        state.data.env_mut().add(name, value);
    }

    fn set_env(&mut self, name: &str, value: &str) {
        let mut state = self.session.lock();
        state.data.env_mut().set(name, value);
    }

    fn get_name(&self, index: usize) -> Option<NameListEntry> {
        let state = self.session.lock();
        state.data.name_list().get(index).cloned()
    }

    /// Mirrors `ndmpd_api_dispatch`: gives time back to the session's own
    /// reactor for whatever MODULE-class fds the worker has registered,
    /// looping on non-blocking `WouldBlock` results when `blocking` is set so
    /// the caller always gets at least one readiness pass before returning.
    /// Aborts the loop with an error as soon as the client requests abort.
    fn dispatch(&mut self, blocking: bool) -> io::Result<()> {
        let mut blocking = blocking;
        loop {
            if self.abort_requested() {
                return Err(io::Error::new(io::ErrorKind::Interrupted, "session aborted"));
            }
            let outcome = {
                let mut reactor = self.reactor.lock().unwrap();
                reactor
                    .select(blocking, HandlerClass::Module)
                    .map_err(|err| io::Error::new(io::ErrorKind::Other, err.to_string()))?
            };
            match outcome {
                SelectOutcome::Fired(_) => {
                    blocking = false;
                    continue;
                }
                SelectOutcome::WouldBlock => return Ok(()),
            }
        }
    }

    fn add_file_handler(
        &mut self,
        fd: RawFd,
        interest: Interest,
        callback: Box<dyn FnMut(Readiness) -> io::Result<HandlerOutcome> + Send>,
    ) -> io::Result<()> {
        let mut reactor = self.reactor.lock().unwrap();
        reactor
            .add_handler(fd as u64, fd, interest, HandlerClass::Module, callback)
            .map_err(|err| io::Error::new(io::ErrorKind::Other, err.to_string()))
    }

    fn remove_file_handler(&mut self, fd: RawFd) -> bool {
        let mut reactor = self.reactor.lock().unwrap();
        reactor.remove_handler(fd)
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<ReadOutcome> {
        if self.uses_local_tape() {
            let mut state = self.session.lock();
            let Some(tape) = state.mover.tape_mut() else {
                return Err(io::Error::new(io::ErrorKind::NotConnected, "no tape attached"));
            };
            // SAFETY-free workaround for borrowing both `tape` and `reader`
            // out of the same guard: take the tape handle's fd pair by
            // re-borrowing through the record's accessor methods below.
            let cloned = tape.try_clone();
            drop(state);
            let mut tape = match cloned {
                Ok(t) => t,
                Err(err) => {
                    self.cascade_mover_error(MoverHaltReason::MediaError);
                    return Err(err);
                }
            };
            let mut state = self.session.lock();
            let reader = state
                .mover
                .reader_mut()
                .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "reader not armed"))?;
            let result = reader.read(&mut tape, buf);
            drop(state);
            return match result {
                Ok(0) => Ok(ReadOutcome::Eof),
                Ok(n) => Ok(ReadOutcome::Data(n)),
                Err(err) => {
                    self.cascade_mover_error(MoverHaltReason::MediaError);
                    Err(err)
                }
            };
        }

        let socket = {
            let state = self.session.lock();
            state.data.data_socket().cloned()
        };
        let Some(socket) = socket else {
            return Err(io::Error::new(io::ErrorKind::NotConnected, "no data socket"));
        };
        let mut dup = match socket.try_clone() {
            Ok(d) => d,
            Err(err) => {
                self.cascade_mover_error(MoverHaltReason::ConnectClosed);
                return Err(err);
            }
        };
        match pump::remote_read(&mut dup, buf) {
            Ok(pump::RemoteRead::Data(n)) => Ok(ReadOutcome::Data(n)),
            Ok(pump::RemoteRead::PeerClosed) => {
                self.cascade_mover_error(MoverHaltReason::ConnectClosed);
                Ok(ReadOutcome::Eof)
            }
            Err(err) => {
                self.cascade_mover_error(MoverHaltReason::ConnectClosed);
                Err(err)
            }
        }
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<()> {
        if self.uses_local_tape() {
            let mut state = self.session.lock();
            let Some(tape) = state.mover.tape_mut() else {
                return Err(io::Error::new(io::ErrorKind::NotConnected, "no tape attached"));
            };
            let cloned = tape.try_clone();
            drop(state);
            let mut tape = match cloned {
                Ok(t) => t,
                Err(err) => {
                    self.cascade_mover_error(MoverHaltReason::MediaError);
                    return Err(err);
                }
            };
            let mut state = self.session.lock();
            let buffer = state
                .mover
                .buffer_mut()
                .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "buffer not armed"))?;
            let result = buffer.write_through(&mut tape, buf);
            drop(state);
            return match result {
                Ok(()) => Ok(()),
                Err(err) => {
                    self.cascade_mover_error(MoverHaltReason::MediaError);
                    Err(err)
                }
            };
        }

        let socket = {
            let state = self.session.lock();
            state.data.data_socket().cloned()
        };
        let Some(socket) = socket else {
            return Err(io::Error::new(io::ErrorKind::NotConnected, "no data socket"));
        };
        let mut dup = match socket.try_clone() {
            Ok(d) => d,
            Err(err) => {
                self.cascade_mover_error(MoverHaltReason::ConnectClosed);
                return Err(err);
            }
        };
        match pump::remote_write(&mut dup, buf) {
            Ok(()) => Ok(()),
            Err(err) => {
                self.cascade_mover_error(MoverHaltReason::ConnectClosed);
                Err(err)
            }
        }
    }

    /// `§9` Open Question 1, resolved: `seek` pauses MOVER rather than being
    /// a no-op, since the only source behavior confirmed by `§4.4` is that a
    /// repositioning request outside the current window must wait for the
    /// DMA's `continue`.
    fn seek(&mut self, offset: u64, length: u64) -> io::Result<SeekOutcome> {
        let mut state = self.session.lock();
        let window_start = state.mover.window_offset();
        let window_end = window_start + state.mover.window_length();
        if offset >= window_start && offset + length <= window_end {
            return Ok(SeekOutcome::Ready);
        }
        state
            .mover
            .pause(MoverPauseReason::Seek)
            .map_err(|err| io::Error::new(io::ErrorKind::Other, err.to_string()))?;
        let _ = self.notify_tx.send(Notify::MoverPaused {
            reason: MoverPauseReason::Seek,
            seek_position: offset,
        });
        Ok(SeekOutcome::Paused)
    }

    /// Mirrors `ndmpd_api_file_recovered_v3`/`v4`: emits a dedicated
    /// `NDMP_LOG_FILE` notify carrying both the version-neutral outcome and
    /// its V3-narrowed form, rather than folding the result into a generic
    /// log message.
    fn file_recovered(&mut self, name: &str, outcome: RecoverOutcome) {
        let v3_outcome = outcome.to_v3();
        let _ = self.notify_tx.send(Notify::LogFile {
            name: name.to_string(),
            outcome,
            v3_outcome,
        });
    }

    fn log(&mut self, severity: LogSeverity, message_id: u32, text: &str) {
        logging::log_worker_message(severity, message_id, text);
        let _ = self
            .notify_tx
            .send(Notify::log(severity, message_id, text.to_string()));
    }

    fn abort_requested(&self) -> bool {
        let state = self.session.lock();
        state.data.abort_requested()
    }
}
