use wire::{Address, EnvVar, ErrorCode, NameListEntry};

/// Internal, semantic request shape the dispatcher matches on (`§6A`).
///
/// This is deliberately not the wire message: decoding XDR bytes into these
/// variants is the job of an injected [`crate::accept::RequestSource`], kept
/// outside this crate the same way `§1` keeps the codec outside the core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    GetState,
    GetEnv,
    StartBackup {
        bu_type: String,
        env: Vec<EnvVar>,
    },
    StartRecover {
        bu_type: String,
        env: Vec<EnvVar>,
        names: Vec<NameListEntry>,
    },
    /// V4 only; the handler always answers `NOT_SUPPORTED_ERR` (`§6`, `§8`).
    StartRecoverFilehist,
    Abort,
    Stop,
    Listen {
        address_family: AddressFamily,
    },
    Connect {
        address: Address,
    },
}

/// Which address kind `DATA_LISTEN` was asked to bind — `TCP` is the only
/// kind that actually allocates a socket; `Local` just records intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressFamily {
    Local,
    Tcp,
}

/// Internal reply shape. The dispatcher builds one of these per request;
/// the (external) `ReplySink` turns it into the version-specific XDR reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Ok(ReplyBody),
    Err(ErrorCode),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyBody {
    None,
    GetState(DataStateReply),
    GetEnv(Vec<EnvVar>),
    Listen(ListenReply),
}

/// `data_get_state` reply payload (`§3`, `§8` scenario 3).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataStateReply {
    pub state: &'static str,
    pub operation: &'static str,
    pub halt_reason: &'static str,
    pub bytes_processed: u64,
}

/// `data_listen` reply payload (`§8` scenario 6): the assigned endpoint,
/// already mirrored into the V3-shaped single-endpoint view by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListenReply {
    pub ip: std::net::Ipv4Addr,
    pub port: u16,
}

impl Reply {
    pub const fn ok(body: ReplyBody) -> Self {
        Self::Ok(body)
    }

    pub const fn is_ok(&self) -> bool {
        matches!(self, Self::Ok(_))
    }
}
