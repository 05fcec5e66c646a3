use std::net::Ipv4Addr;
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use archive::{ArchiveWorker, DumpEngine, FileSource, TarEngine};
use ndmp_core::{DataOperation, Session};
use socket2::{Domain, Socket, Type};
use wire::{halt_reason_from_worker_errno, Address, DataHaltReason, EnvVar, ErrorCode, Notify, TcpEndpoint};

use crate::callbacks::SessionCallbacks;
use crate::config::DaemonConfig;
use crate::request::{AddressFamily, DataStateReply, ListenReply, Reply, ReplyBody, Request};
use crate::socket_tuning::apply_tcp_tuning;

/// Everything one session's request handlers need beyond the session
/// record itself (`§4.2A`): daemon-wide tuning, the notify channel the
/// worker thread and any accept thread both feed into, and the injected
/// factory for a backup's file source — real directory walking stays an
/// external collaborator per `§1`.
pub struct SessionRuntime {
    pub session: Arc<Session>,
    pub config: DaemonConfig,
    pub notify_tx: Sender<Notify>,
    pub file_source_factory: Arc<dyn Fn() -> Box<dyn FileSource + Send> + Send + Sync>,
    session_reactor: Arc<Mutex<reactor::Reactor>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl SessionRuntime {
    pub fn new(
        session: Arc<Session>,
        config: DaemonConfig,
        notify_tx: Sender<Notify>,
        file_source_factory: Arc<dyn Fn() -> Box<dyn FileSource + Send> + Send + Sync>,
        session_reactor: Arc<Mutex<reactor::Reactor>>,
    ) -> Self {
        Self {
            session,
            config,
            notify_tx,
            file_source_factory,
            session_reactor,
            worker: Mutex::new(None),
        }
    }

    /// Dispatches one request per `§4.2A`'s table, entirely synchronously —
    /// the worker and any accept thread run detached and report back
    /// through `notify_tx`/the session record rather than blocking a reply.
    pub fn dispatch(&self, request: Request) -> Reply {
        match request {
            Request::GetState => self.get_state(),
            Request::GetEnv => self.get_env(),
            Request::StartBackup { bu_type, env } => self.start_backup(bu_type, env),
            Request::StartRecover { bu_type, env, names } => {
                self.start_recover(bu_type, env, names)
            }
            // V4 only; always NOT_SUPPORTED regardless of current state (`§8`).
            Request::StartRecoverFilehist => Reply::Err(ErrorCode::NotSupported),
            Request::Abort => self.abort(),
            Request::Stop => self.stop(),
            Request::Listen { address_family } => self.listen(address_family),
            Request::Connect { address } => self.connect(address),
        }
    }

    fn get_state(&self) -> Reply {
        let state = self.session.lock();
        Reply::ok(ReplyBody::GetState(DataStateReply {
            state: state.data.state().as_str(),
            operation: state.data.operation().as_str(),
            halt_reason: state.data.halt_reason().as_str(),
            bytes_processed: state.data.bytes_processed(),
        }))
    }

    fn get_env(&self) -> Reply {
        let state = self.session.lock();
        match state.data.get_env() {
            Ok(env) => Reply::ok(ReplyBody::GetEnv(env.to_vec())),
            Err(err) => Reply::Err(err.code()),
        }
    }

    /// `§8` boundary behavior: an unrecognized `bu_type` is `ILLEGAL_ARGS_ERR`
    /// and must leave state untouched, so the check runs before `data.start`.
    fn start_backup(&self, bu_type: String, env: Vec<EnvVar>) -> Reply {
        if bu_type != "tar" && bu_type != "dump" {
            return Reply::Err(ErrorCode::IllegalArgs);
        }
        let mut state = self.session.lock();
        if let Err(err) = state.data.start(DataOperation::Backup, env, Vec::new()) {
            return Reply::Err(err.code());
        }
        if state.mover.address().is_local() {
            state.mover.arm_writer();
        }
        drop(state);
        self.spawn_worker(move |bu_type, source, callbacks| {
            let mut engine: Box<dyn ArchiveWorker> = match bu_type.as_str() {
                "tar" => Box::new(TarEngine::for_backup(source)),
                _ => Box::new(DumpEngine::for_backup(source)),
            };
            engine.run_backup(callbacks)
        }, bu_type);
        Reply::ok(ReplyBody::None)
    }

    fn start_recover(
        &self,
        bu_type: String,
        env: Vec<EnvVar>,
        names: Vec<wire::NameListEntry>,
    ) -> Reply {
        if bu_type != "tar" && bu_type != "dump" {
            return Reply::Err(ErrorCode::IllegalArgs);
        }
        let mut state = self.session.lock();
        if let Err(err) = state.data.start(DataOperation::Recover, env, names) {
            return Reply::Err(err.code());
        }
        if state.mover.address().is_local() {
            state.mover.arm_reader();
        }
        drop(state);
        self.spawn_worker(move |bu_type, _source, callbacks| {
            let mut engine: Box<dyn ArchiveWorker> = match bu_type.as_str() {
                "tar" => Box::new(TarEngine::for_recover()),
                _ => Box::new(DumpEngine::for_recover()),
            };
            engine.run_recover(callbacks)
        }, bu_type);
        Reply::ok(ReplyBody::None)
    }

    fn spawn_worker(
        &self,
        run: impl FnOnce(String, Box<dyn FileSource + Send>, &mut dyn archive::ModuleCallbacks) -> archive::WorkerExitCode
            + Send
            + 'static,
        bu_type: String,
    ) {
        let session = Arc::clone(&self.session);
        let notify_tx = self.notify_tx.clone();
        let source = (self.file_source_factory)();
        let session_reactor = Arc::clone(&self.session_reactor);
        let handle = std::thread::Builder::new()
            .name("ndmp-archive-worker".into())
            .spawn(move || {
                let mut callbacks =
                    SessionCallbacks::new(Arc::clone(&session), notify_tx.clone(), session_reactor);
                let exit_code = run(bu_type, source, &mut callbacks);
                let reason = halt_reason_from_worker_errno(exit_code);
                let mut state = session.lock();
                // `§4.3`: successful local-mover backup gets one last
                // zero-length flush to force out a partial final record
                // before DATA transitions to HALTED.
                if reason == DataHaltReason::Successful
                    && state.data.operation() == DataOperation::Backup
                    && state.mover.address().is_local()
                {
                    let cloned_tape = state.mover.tape_mut().and_then(|t| t.try_clone().ok());
                    if let Some(mut tape_clone) = cloned_tape {
                        if let Some(buffer) = state.mover.buffer_mut() {
                            let _ = buffer.flush_zero_length(&mut tape_clone);
                        }
                    }
                }
                state.data.halt(reason);
                drop(state);
                let _ = notify_tx.send(Notify::DataHalted { reason });
            })
            .expect("spawning the archive worker thread");
        *self.worker.lock().unwrap_or_else(|p| p.into_inner()) = Some(handle);
    }

    fn abort(&self) -> Reply {
        let mut state = self.session.lock();
        if let Err(err) = state.data.abort() {
            return Reply::Err(err.code());
        }
        let halted_immediately = state.data.state() == ndmp_core::DataState::Halted;
        let reason = state.data.halt_reason();
        drop(state);
        if halted_immediately {
            let _ = self.notify_tx.send(Notify::DataHalted { reason });
        }
        Reply::ok(ReplyBody::None)
    }

    /// `§5`: the reply is sent only after the worker has joined and
    /// resources are released, so callers observe IDLE immediately after.
    fn stop(&self) -> Reply {
        if let Some(handle) = self.worker.lock().unwrap_or_else(|p| p.into_inner()).take() {
            let _ = handle.join();
        }
        let mut state = self.session.lock();
        match state.data.stop() {
            Ok(()) => {
                state.mover.reinit();
                Reply::ok(ReplyBody::None)
            }
            Err(err) => Reply::Err(err.code()),
        }
    }

    /// `§4.3`/`§4.4`: a `LOCAL` `DATA_LISTEN` also drives MOVER to LISTEN
    /// with the configured tape device attached, since MOVER has no
    /// `MOVER_LISTEN` request of its own in this core's message set (`§6`)
    /// — the DATA request is the only trigger for the local pairing.
    fn listen(&self, address_family: AddressFamily) -> Reply {
        match address_family {
            AddressFamily::Local => {
                let Some(tape_path) = self.config.tape_device.as_ref() else {
                    return Reply::Err(ErrorCode::NoDevice);
                };
                let tape = match std::fs::OpenOptions::new()
                    .read(true)
                    .write(true)
                    .open(tape_path)
                {
                    Ok(f) => f,
                    Err(_) => return Reply::Err(ErrorCode::NoDevice),
                };
                let mut state = self.session.lock();
                if state.mover.state() != ndmp_core::MoverState::Idle {
                    return Reply::Err(ErrorCode::IllegalState);
                }
                if let Err(err) = state.data.listen(Address::Local, None) {
                    return Reply::Err(err.code());
                }
                state.mover.set_tape(tape);
                state
                    .mover
                    .listen(Address::Local, None)
                    .expect("mover is idle, just checked above");
                Reply::ok(ReplyBody::None)
            }
            AddressFamily::Tcp => self.listen_tcp(),
        }
    }

    fn listen_tcp(&self) -> Reply {
        let socket = match Socket::new(Domain::IPV4, Type::STREAM, None) {
            Ok(s) => s,
            Err(_) => return Reply::Err(ErrorCode::NoDevice),
        };
        if apply_tcp_tuning(&socket, &self.config).is_err() {
            return Reply::Err(ErrorCode::IoErr);
        }
        let bind_addr = std::net::SocketAddrV4::new(self.config.listen_ip, 0);
        if socket.bind(&bind_addr.into()).is_err() || socket.listen(1).is_err() {
            return Reply::Err(ErrorCode::IoErr);
        }
        let local_addr = match socket.local_addr().ok().and_then(|a| a.as_socket_ipv4()) {
            Some(a) => a,
            None => return Reply::Err(ErrorCode::InternalErr),
        };
        let address = Address::Tcp(vec![TcpEndpoint {
            ip: *local_addr.ip(),
            port: local_addr.port(),
        }]);

        // `DataRecord` only records that a listener exists, not the
        // listener itself (`§9`: the record models address/state, not fd
        // lifetime for a socket whose only reader is this accept thread).
        if let Err(err) = self.session.lock().data.listen(address, None) {
            return Reply::Err(err.code());
        }

        self.spawn_accept_thread(socket);
        Reply::ok(ReplyBody::Listen(ListenReply {
            ip: *local_addr.ip(),
            port: local_addr.port(),
        }))
    }

    /// `§9`: "make this idempotent at the reactor level so a stray second
    /// readiness event is a no-op" — realized here as a thread that accepts
    /// exactly once and then exits. The listener is non-blocking and polled
    /// on a short interval so an `abort` issued while still in LISTEN can
    /// make the thread give up cooperatively instead of blocking forever in
    /// `accept(2)`.
    fn spawn_accept_thread(&self, socket: Socket) {
        let session = Arc::clone(&self.session);
        let config = self.config.clone();
        std::thread::Builder::new()
            .name("ndmp-data-accept".into())
            .spawn(move || {
                let _ = socket.set_nonblocking(true);
                loop {
                    {
                        let state = session.lock();
                        if state.data.state() != ndmp_core::DataState::Listen {
                            return;
                        }
                    }
                    match socket.accept() {
                        Ok((peer_socket, peer_addr)) => {
                            let _ = apply_tcp_tuning(&peer_socket, &config);
                            let ip = match peer_addr.as_socket_ipv4() {
                                Some(v4) => *v4.ip(),
                                None => Ipv4Addr::UNSPECIFIED,
                            };
                            let port = peer_addr.as_socket_ipv4().map_or(0, |v4| v4.port());
                            let address = Address::Tcp(vec![TcpEndpoint { ip, port }]);
                            let mut state = session.lock();
                            let _ = state.data.accept(Arc::new(peer_socket), address);
                            return;
                        }
                        Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => {
                            std::thread::sleep(std::time::Duration::from_millis(50));
                        }
                        Err(_) => return,
                    }
                }
            })
            .expect("spawning the data accept thread");
    }

    fn connect(&self, address: Address) -> Reply {
        if address.is_local() {
            let mut state = self.session.lock();
            return match state.connect_local() {
                Ok(()) => Reply::ok(ReplyBody::None),
                Err(err) => Reply::Err(err.code()),
            };
        }
        let Some(endpoint) = address.first_endpoint() else {
            return Reply::Err(ErrorCode::IllegalArgs);
        };
        let socket = match Socket::new(Domain::IPV4, Type::STREAM, None) {
            Ok(s) => s,
            Err(_) => return Reply::Err(ErrorCode::NoDevice),
        };
        if apply_tcp_tuning(&socket, &self.config).is_err() {
            return Reply::Err(ErrorCode::IoErr);
        }
        let target = std::net::SocketAddrV4::new(endpoint.ip, endpoint.port);
        if socket.connect(&target.into()).is_err() {
            return Reply::Err(ErrorCode::ConnectErr);
        }
        let mut state = self.session.lock();
        match state.data.connect_tcp(Arc::new(socket), address) {
            Ok(()) => Reply::ok(ReplyBody::None),
            Err(err) => Reply::Err(err.code()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use archive::InMemorySource;
    use std::io::{Read, Seek, SeekFrom};
    use std::sync::mpsc;
    use wire::ProtocolVersion;

    /// A `SessionRuntime` already wired for a local-mover operation: MOVER
    /// LISTEN with `tape` attached, DATA CONNECTED via `connect_local`
    /// (`§4.3`).
    fn local_mover_runtime(record_size: u32, tape: std::fs::File) -> SessionRuntime {
        let session = Arc::new(Session::new(ProtocolVersion::V3, record_size));
        {
            let mut state = session.lock();
            state.mover.set_tape(tape);
            state.mover.listen(Address::Local, None).unwrap();
            state.connect_local().unwrap();
        }
        let mut config = DaemonConfig::default();
        config.record_size = record_size;
        let (notify_tx, _notify_rx) = mpsc::channel();
        SessionRuntime::new(
            session,
            config,
            notify_tx,
            Arc::new(|| Box::new(InMemorySource::new(Vec::new())) as Box<dyn FileSource + Send>),
            Arc::new(Mutex::new(reactor::Reactor::new())),
        )
    }

    /// `§4.3`: "for local-mover successful backup, drive one last
    /// `local_write` with length 0 to force a final tape record flush."
    /// An empty `dump` backup writes a 4-byte end marker; record size 10
    /// means that marker alone never fills a record, so only the explicit
    /// flush on halt gets it onto tape.
    #[test]
    fn local_backup_flushes_final_partial_record_on_success() {
        let mut tape_file = tempfile::tempfile().unwrap();
        let runtime = local_mover_runtime(10, tape_file.try_clone().unwrap());

        let reply = runtime.dispatch(Request::StartBackup {
            bu_type: "dump".to_string(),
            env: Vec::new(),
        });
        assert!(reply.is_ok());

        let reply = runtime.dispatch(Request::Stop);
        assert!(reply.is_ok(), "stop should succeed once the worker halts: {reply:?}");

        tape_file.seek(SeekFrom::Start(0)).unwrap();
        let mut contents = Vec::new();
        tape_file.read_to_end(&mut contents).unwrap();
        assert_eq!(contents.len(), 10, "partial record padded to record size");
        assert_eq!(&contents[4..], &[0u8; 6]);
    }
}
