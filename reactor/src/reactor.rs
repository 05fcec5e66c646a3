use std::os::unix::io::RawFd;
use std::time::Duration;

use crate::class::HandlerClass;
use crate::error::ReactorError;
use crate::interest::{Interest, Readiness};

/// What a handler's callback wants the reactor to do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerOutcome {
    Continue,
    Remove,
}

/// Result of one [`Reactor::select`] call (`§4.1`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectOutcome {
    /// At least one handler fired; carries how many.
    Fired(usize),
    /// Non-blocking call found nothing ready, or there were no handlers
    /// matching `class_mask` to wait on in the first place.
    WouldBlock,
}

type Callback = Box<dyn FnMut(Readiness) -> std::io::Result<HandlerOutcome> + Send>;

struct Handler {
    fd: RawFd,
    #[allow(dead_code)]
    cookie: u64,
    interest: Interest,
    class: HandlerClass,
    callback: Callback,
}

/// The single-threaded readiness-driven event loop (`§4.1`).
///
/// Multiplexes whatever small set of descriptors the session currently
/// cares about — control socket, at most one data socket, at most one
/// listen socket, plus fds the archive worker registers for its own
/// bookkeeping — over one `poll(2)` call per [`Reactor::select`].
#[derive(Default)]
pub struct Reactor {
    handlers: Vec<Handler>,
}

impl Reactor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_registered(&self, fd: RawFd) -> bool {
        self.handlers.iter().any(|h| h.fd == fd)
    }

    /// Registers a handler. Fails if `fd` is already registered (`§4.1`).
    pub fn add_handler(
        &mut self,
        cookie: u64,
        fd: RawFd,
        interest: Interest,
        class: HandlerClass,
        callback: impl FnMut(Readiness) -> std::io::Result<HandlerOutcome> + Send + 'static,
    ) -> Result<(), ReactorError> {
        if self.is_registered(fd) {
            return Err(ReactorError::AlreadyRegistered(fd));
        }
        self.handlers.push(Handler {
            fd,
            cookie,
            interest,
            class,
            callback: Box::new(callback),
        });
        Ok(())
    }

    /// Removes a handler. Idempotent — removing an fd that isn't registered
    /// (including one a handler already removed during its own invocation)
    /// is a no-op, matching the re-entry requirement in `§4.1`.
    pub fn remove_handler(&mut self, fd: RawFd) -> bool {
        let before = self.handlers.len();
        self.handlers.retain(|h| h.fd != fd);
        self.handlers.len() != before
    }

    /// One readiness scan restricted to `class_mask` (`§4.1`). Blocking mode
    /// waits indefinitely for the first readiness; non-blocking returns
    /// immediately. Handler removal requested mid-dispatch is deferred until
    /// every fd ready in this scan has been delivered, so indices into the
    /// handler set stay valid for the whole dispatch pass.
    pub fn select(
        &mut self,
        blocking: bool,
        class_mask: HandlerClass,
    ) -> Result<SelectOutcome, ReactorError> {
        let indices: Vec<usize> = self
            .handlers
            .iter()
            .enumerate()
            .filter(|(_, h)| h.class.matches(class_mask))
            .map(|(i, _)| i)
            .collect();

        if indices.is_empty() {
            return Ok(SelectOutcome::WouldBlock);
        }

        let mut pollfds: Vec<libc::pollfd> = indices
            .iter()
            .map(|&i| libc::pollfd {
                fd: self.handlers[i].fd,
                events: self.handlers[i].interest.to_poll_events(),
                revents: 0,
            })
            .collect();

        let timeout = if blocking { -1 } else { 0 };
        let ready = loop {
            // SAFETY: `pollfds` is a valid, exclusively-owned buffer of
            // `pollfds.len()` entries for the duration of the call.
            let rc = unsafe {
                libc::poll(pollfds.as_mut_ptr(), pollfds.len() as libc::nfds_t, timeout)
            };
            if rc >= 0 {
                break rc;
            }
            let err = std::io::Error::last_os_error();
            if err.kind() == std::io::ErrorKind::Interrupted {
                continue;
            }
            return Err(ReactorError::Poll(err));
        };

        if ready == 0 {
            return Ok(SelectOutcome::WouldBlock);
        }

        let mut fired = 0usize;
        let mut to_remove = Vec::new();
        for (slot, &i) in indices.iter().enumerate() {
            let revents = pollfds[slot].revents;
            if revents == 0 {
                continue;
            }
            let readiness = Readiness::from_revents(revents);
            let fd = self.handlers[i].fd;
            let outcome = (self.handlers[i].callback)(readiness)
                .map_err(|source| ReactorError::Handler { fd, source })?;
            fired += 1;
            if outcome == HandlerOutcome::Remove {
                to_remove.push(fd);
            }
        }

        for fd in to_remove {
            self.remove_handler(fd);
        }

        Ok(SelectOutcome::Fired(fired))
    }
}

/// Convenience for callers that want a bounded wait instead of the raw
/// blocking/non-blocking choice `poll(2)` offers; not part of `§4.1` itself
/// but useful for the accept-loop's idle tick.
pub fn poll_timeout_ms(d: Duration) -> i32 {
    d.as_millis().min(i32::MAX as u128) as i32
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::io::AsRawFd;
    use std::os::unix::net::UnixStream;

    #[test]
    fn add_handler_rejects_duplicate_fd() {
        let (a, _b) = UnixStream::pair().unwrap();
        let mut reactor = Reactor::new();
        let fd = a.as_raw_fd();
        reactor
            .add_handler(1, fd, Interest::read(), HandlerClass::Connection, |_| {
                Ok(HandlerOutcome::Continue)
            })
            .unwrap();
        let err = reactor.add_handler(1, fd, Interest::read(), HandlerClass::Connection, |_| {
            Ok(HandlerOutcome::Continue)
        });
        assert!(err.is_err());
    }

    #[test]
    fn remove_handler_is_idempotent() {
        let (a, _b) = UnixStream::pair().unwrap();
        let mut reactor = Reactor::new();
        let fd = a.as_raw_fd();
        reactor
            .add_handler(1, fd, Interest::read(), HandlerClass::Connection, |_| {
                Ok(HandlerOutcome::Continue)
            })
            .unwrap();
        assert!(reactor.remove_handler(fd));
        assert!(!reactor.remove_handler(fd));
    }

    #[test]
    fn select_fires_handler_on_writable_fd() {
        let (a, _b) = UnixStream::pair().unwrap();
        let mut reactor = Reactor::new();
        let fd = a.as_raw_fd();
        let fired = std::sync::Arc::new(std::sync::atomic::AtomicBool::new(false));
        let fired_clone = std::sync::Arc::clone(&fired);
        reactor
            .add_handler(1, fd, Interest::write(), HandlerClass::Connection, move |_| {
                fired_clone.store(true, std::sync::atomic::Ordering::SeqCst);
                Ok(HandlerOutcome::Continue)
            })
            .unwrap();
        let outcome = reactor.select(false, HandlerClass::All).unwrap();
        assert_eq!(outcome, SelectOutcome::Fired(1));
        assert!(fired.load(std::sync::atomic::Ordering::SeqCst));
    }

    #[test]
    fn select_honors_class_mask() {
        let (a, _b) = UnixStream::pair().unwrap();
        let mut reactor = Reactor::new();
        let fd = a.as_raw_fd();
        reactor
            .add_handler(1, fd, Interest::write(), HandlerClass::Module, |_| {
                Ok(HandlerOutcome::Continue)
            })
            .unwrap();
        let outcome = reactor.select(false, HandlerClass::Connection).unwrap();
        assert_eq!(outcome, SelectOutcome::WouldBlock);
    }

    #[test]
    fn select_with_no_handlers_would_block_without_polling() {
        let mut reactor = Reactor::new();
        let outcome = reactor.select(false, HandlerClass::All).unwrap();
        assert_eq!(outcome, SelectOutcome::WouldBlock);
    }

    #[test]
    fn handler_can_remove_itself_and_dispatch_stays_valid() {
        let (a, _b) = UnixStream::pair().unwrap();
        let (c, _d) = UnixStream::pair().unwrap();
        let mut reactor = Reactor::new();
        reactor
            .add_handler(1, a.as_raw_fd(), Interest::write(), HandlerClass::Connection, |_| {
                Ok(HandlerOutcome::Remove)
            })
            .unwrap();
        reactor
            .add_handler(2, c.as_raw_fd(), Interest::write(), HandlerClass::Connection, |_| {
                Ok(HandlerOutcome::Continue)
            })
            .unwrap();
        let outcome = reactor.select(false, HandlerClass::All).unwrap();
        assert_eq!(outcome, SelectOutcome::Fired(2));
        assert!(!reactor.is_registered(a.as_raw_fd()));
        assert!(reactor.is_registered(c.as_raw_fd()));
    }
}
