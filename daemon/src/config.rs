use std::net::{Ipv4Addr, SocketAddrV4};
use std::path::PathBuf;

use clap::Parser;

/// Daemon-wide configuration, loaded the way the teacher's own CLI layers
/// flags over environment variables: `clap`'s derive API with `env`
/// fallbacks (`SPEC_FULL.md` §2A), so a container deployment can configure
/// the daemon without a flags file.
#[derive(Debug, Clone, Parser)]
#[command(name = "ndmpd", about = "NDMP v3/v4 backup and recovery server")]
pub struct DaemonConfig {
    /// Address the control-connection listener binds to.
    #[arg(long, env = "NDMPD_LISTEN_ADDR", default_value = "0.0.0.0")]
    pub listen_ip: Ipv4Addr,

    /// Port the control-connection listener binds to. `0` asks the OS to
    /// pick an ephemeral port, useful for tests.
    #[arg(long, env = "NDMPD_LISTEN_PORT", default_value_t = 10000)]
    pub listen_port: u16,

    /// Fixed tape record size for the session's MOVER (`§3`).
    #[arg(long, env = "NDMPD_RECORD_SIZE", default_value_t = 10240)]
    pub record_size: u32,

    /// Path to the tape device (or a plain file standing in for one in
    /// tests) opened by `mover_listen`/local-mover setup.
    #[arg(long, env = "NDMPD_TAPE_DEVICE")]
    pub tape_device: Option<PathBuf>,

    /// Socket send buffer size applied to data/mover sockets (`§4.3`).
    #[arg(long, env = "NDMPD_SEND_BUFFER", default_value_t = 256 * 1024)]
    pub send_buffer: usize,

    /// Socket receive buffer size applied to data/mover sockets (`§4.3`).
    #[arg(long, env = "NDMPD_RECV_BUFFER", default_value_t = 256 * 1024)]
    pub recv_buffer: usize,
}

impl DaemonConfig {
    pub const fn listen_addr(&self) -> SocketAddrV4 {
        SocketAddrV4::new(self.listen_ip, self.listen_port)
    }
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            listen_ip: Ipv4Addr::UNSPECIFIED,
            listen_port: 10000,
            record_size: 10240,
            tape_device: None,
            send_buffer: 256 * 1024,
            recv_buffer: 256 * 1024,
        }
    }
}
