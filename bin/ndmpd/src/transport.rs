//! The default wire adapter this binary wires into [`daemon::run`].
//!
//! XDR encode/decode is an external collaborator per `spec.md` §1/§6 — this
//! core never owns it. Until a real codec crate is plugged in here, every
//! accepted connection is treated as an immediate clean control-connection
//! close (`§5`: "control-connection EOF triggers session teardown"), which
//! still exercises accept, session bring-up, and teardown end to end. A real
//! deployment replaces [`StreamRequestSource::next_request`] with actual XDR
//! decoding and [`StreamReplySink`] with actual XDR encoding; nothing else
//! in `daemon` or `ndmp-core` needs to change to support that.

use std::io;
use std::net::TcpStream;

use daemon::{ReplySink, RequestSource};
use wire::{Notify, ProtocolVersion};

pub struct StreamRequestSource {
    stream: TcpStream,
}

impl StreamRequestSource {
    pub fn new(stream: TcpStream) -> Self {
        Self { stream }
    }

    pub fn try_clone_stream(&self) -> io::Result<TcpStream> {
        self.stream.try_clone()
    }
}

impl RequestSource for StreamRequestSource {
    fn next_request(&mut self) -> io::Result<Option<(ProtocolVersion, daemon::Request)>> {
        Ok(None)
    }
}

pub struct StreamReplySink {
    #[allow(dead_code)]
    stream: TcpStream,
}

impl StreamReplySink {
    pub fn new(stream: TcpStream) -> Self {
        Self { stream }
    }
}

impl ReplySink for StreamReplySink {
    fn send_reply(&mut self, _reply: daemon::Reply) -> io::Result<()> {
        Ok(())
    }

    fn send_notify(&mut self, _notify: Notify) -> io::Result<()> {
        Ok(())
    }
}
