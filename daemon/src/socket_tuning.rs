use socket2::Socket;

use crate::config::DaemonConfig;

/// Applies the same tuning to every data/mover socket this daemon opens or
/// accepts (`§4.3`, `§5`): `TCP_NODELAY` so small control-ish writes aren't
/// held up by Nagle, `SO_KEEPALIVE` since the design explicitly leaves
/// timeout enforcement to the socket layer rather than the reactor, and
/// buffer sizes sized for bulk archive transfer.
pub fn apply_tcp_tuning(socket: &Socket, config: &DaemonConfig) -> std::io::Result<()> {
    socket.set_nodelay(true)?;
    socket.set_keepalive(true)?;
    socket.set_send_buffer_size(config.send_buffer)?;
    socket.set_recv_buffer_size(config.recv_buffer)?;
    Ok(())
}
