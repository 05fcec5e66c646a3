use std::net::TcpListener;
use std::os::unix::io::AsRawFd;
use std::sync::mpsc::{Receiver, Sender};
use std::sync::{Arc, Mutex};

use archive::FileSource;
use ndmp_core::Session;
use reactor::{HandlerClass, HandlerOutcome, Interest, Reactor, SelectOutcome};
use wire::{Notify, ProtocolVersion};

use crate::config::DaemonConfig;
use crate::dispatch::dispatch;
use crate::error::DaemonError;
use crate::handlers::SessionRuntime;
use crate::request::{Reply, Request};

/// Decodes wire bytes into [`Request`]s for one control connection. The
/// actual XDR codec is an external collaborator (`§1`, `§6A`); this trait is
/// the seam a real implementation plugs into, and tests use an in-memory
/// queue instead.
pub trait RequestSource: Send {
    /// Blocks until the next request arrives, or returns `Ok(None)` on a
    /// clean control-connection close (`§5`: "control-connection EOF
    /// triggers session teardown").
    fn next_request(&mut self) -> std::io::Result<Option<(ProtocolVersion, Request)>>;
}

/// Encodes [`Reply`]s and [`Notify`]s back onto the wire. Same external-codec
/// boundary as [`RequestSource`].
pub trait ReplySink: Send {
    fn send_reply(&mut self, reply: Reply) -> std::io::Result<()>;
    fn send_notify(&mut self, notify: Notify) -> std::io::Result<()>;
}

/// Runs one session to completion: alternates between draining any notify
/// the worker/accept threads queued and processing the next request, until
/// the source reports EOF (`§5`).
pub fn run_session(
    session: Arc<Session>,
    config: DaemonConfig,
    file_source_factory: Arc<dyn Fn() -> Box<dyn FileSource + Send> + Send + Sync>,
    mut source: impl RequestSource,
    mut sink: impl ReplySink,
) -> Result<(), DaemonError> {
    let (notify_tx, notify_rx): (Sender<Notify>, Receiver<Notify>) = std::sync::mpsc::channel();
    let session_reactor = Arc::new(Mutex::new(Reactor::new()));
    let runtime = SessionRuntime::new(
        Arc::clone(&session),
        config,
        notify_tx,
        file_source_factory,
        session_reactor,
    );

    loop {
        for notify in notify_rx.try_iter() {
            sink.send_notify(notify)?;
        }
        match source.next_request()? {
            None => break,
            Some((protocol_version, request)) => {
                let reply = dispatch(&runtime, protocol_version, request);
                sink.send_reply(reply)?;
            }
        }
        if session.is_eof() {
            break;
        }
    }
    for notify in notify_rx.try_iter() {
        sink.send_notify(notify)?;
    }
    Ok(())
}

/// Binds the control-connection listener and hands each accepted connection
/// to `on_connection` on its own thread (`§4.1`, `§5`: one reactor thread per
/// session). `on_connection` is expected to build a `RequestSource`/
/// `ReplySink` pair over the accepted stream and call [`run_session`].
///
/// The listener itself is multiplexed through a [`Reactor`] rather than a
/// blocking `accept(2)` loop, matching `§4.1`'s readiness-driven model: the
/// daemon's top-level loop is the same single-fd degenerate case of the
/// reactor the per-session event loop uses for its own sockets.
pub fn accept_loop(
    config: &DaemonConfig,
    on_connection: impl Fn(std::net::TcpStream) + Send + Sync + 'static,
) -> Result<(), DaemonError> {
    let listener = TcpListener::bind(config.listen_addr()).map_err(DaemonError::Bind)?;
    let on_connection = Arc::new(on_connection);
    let mut reactor = Reactor::new();
    let accepted: Arc<Mutex<Vec<std::io::Result<std::net::TcpStream>>>> =
        Arc::new(Mutex::new(Vec::new()));
    let accepted_cb = Arc::clone(&accepted);
    reactor.add_handler(0, listener.as_raw_fd(), Interest::read(), HandlerClass::Connection, move |_| {
        accepted_cb.lock().unwrap_or_else(|p| p.into_inner()).push(listener.accept().map(|(s, _)| s));
        Ok(HandlerOutcome::Continue)
    })?;

    loop {
        match reactor.select(true, HandlerClass::All)? {
            SelectOutcome::WouldBlock => continue,
            SelectOutcome::Fired(_) => {
                for stream in accepted.lock().unwrap_or_else(|p| p.into_inner()).drain(..) {
                    let stream = stream.map_err(DaemonError::Accept)?;
                    let on_connection = Arc::clone(&on_connection);
                    std::thread::Builder::new()
                        .name("ndmp-control-session".into())
                        .spawn(move || on_connection(stream))
                        .map_err(DaemonError::Io)?;
                }
            }
        }
    }
}

/// Entry point `bin/ndmpd` calls after parsing [`DaemonConfig`] and wiring
/// up logging: accepts control connections indefinitely, decoding each one
/// with `source_factory`/`sink_factory` before handing it to
/// [`run_session`]. Never returns on success — the daemon runs until
/// killed or a bind fails.
pub fn run<Src, Sink>(
    config: DaemonConfig,
    file_source_factory: Arc<dyn Fn() -> Box<dyn FileSource + Send> + Send + Sync>,
    source_factory: impl Fn(std::net::TcpStream) -> Src + Send + Sync + 'static,
    sink_factory: impl Fn(&Src) -> Sink + Send + Sync + 'static,
) -> Result<(), DaemonError>
where
    Src: RequestSource + 'static,
    Sink: ReplySink + 'static,
{
    let protocol_version = ProtocolVersion::V4;
    accept_loop(&config, move |stream| {
        let config = config.clone();
        let file_source_factory = Arc::clone(&file_source_factory);
        let source = source_factory(stream);
        let sink = sink_factory(&source);
        let session = Arc::new(Session::new(protocol_version, config.record_size));
        let _span = logging::session_span(session.id()).entered();
        if let Err(err) = run_session(session, config, file_source_factory, source, sink) {
            tracing::warn!(%err, "session ended with an error");
        }
    })
}
