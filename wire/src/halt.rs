/// Terminal classification of why a DATA operation ended (`§4.3`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataHaltReason {
    /// No halt has occurred yet; the episode is still live or was never run.
    NotApplicable,
    Successful,
    Aborted,
    ConnectError,
    InternalError,
}

impl DataHaltReason {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotApplicable => "NOT_APPLICABLE",
            Self::Successful => "SUCCESSFUL",
            Self::Aborted => "ABORTED",
            Self::ConnectError => "CONNECT_ERROR",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }
}

/// Why MOVER stopped (`§4.4`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoverHaltReason {
    NotApplicable,
    ConnectClosed,
    MediaError,
    InternalError,
    Aborted,
}

/// Why MOVER is paused mid-recover, awaiting a DMA-driven reposition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoverPauseReason {
    NotApplicable,
    Seek,
    Eom,
    Eof,
}

/// Maps a worker's raw exit status to a DATA halt reason per `§4.3`/`§4.6`:
/// `0` -> successful, `EINTR` -> aborted, `EIO` -> connect error, anything
/// else -> internal error.
pub fn halt_reason_from_worker_errno(errno: i32) -> DataHaltReason {
    match errno {
        0 => DataHaltReason::Successful,
        libc::EINTR => DataHaltReason::Aborted,
        libc::EIO => DataHaltReason::ConnectError,
        _ => DataHaltReason::InternalError,
    }
}
