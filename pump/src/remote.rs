use std::io::{self, Read, Write};

/// Outcome of one `remote_read`, distinguishing a clean peer close from data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteRead {
    Data(usize),
    PeerClosed,
}

/// Reads from the remote-mover socket, retrying transparently on `EINTR`.
/// A zero-length read (peer closed its end) is reported as
/// [`RemoteRead::PeerClosed`] rather than folded into the byte count, so
/// callers can tell "done" from "nothing yet" without inspecting errno.
pub fn remote_read(sock: &mut impl Read, buf: &mut [u8]) -> io::Result<RemoteRead> {
    loop {
        match sock.read(buf) {
            Ok(0) => return Ok(RemoteRead::PeerClosed),
            Ok(n) => return Ok(RemoteRead::Data(n)),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
}

/// Writes all of `buf` to the remote-mover socket, retrying short writes and
/// `EINTR` until the whole buffer lands.
pub fn remote_write(sock: &mut impl Write, mut buf: &[u8]) -> io::Result<()> {
    while !buf.is_empty() {
        match sock.write(buf) {
            Ok(0) => {
                return Err(io::Error::new(
                    io::ErrorKind::WriteZero,
                    "remote mover write returned 0",
                ))
            }
            Ok(n) => buf = &buf[n..],
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(())
}
