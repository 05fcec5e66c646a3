/// The two NDMP protocol generations the session core understands.
///
/// V2 compatibility is explicitly out of scope; a session negotiates one of
/// these two during the (externally handled) connection handshake and keeps
/// it for its entire lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProtocolVersion {
    V3,
    V4,
}

impl ProtocolVersion {
    pub const fn as_u16(self) -> u16 {
        match self {
            Self::V3 => 3,
            Self::V4 => 4,
        }
    }
}

impl std::fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "NDMPv{}", self.as_u16())
    }
}
