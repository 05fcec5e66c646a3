/// Reply-level error kinds from `§7`. These are a taxonomy, not a transport
/// encoding — the XDR mapping to the numeric NDMP error codes lives in the
/// (external) wire codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    NoErr,
    IllegalState,
    IllegalArgs,
    IoErr,
    ConnectErr,
    NotSupported,
    NoDevice,
    NoMemory,
    InternalErr,
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            Self::NoErr => "NDMP_NO_ERR",
            Self::IllegalState => "NDMP_ILLEGAL_STATE_ERR",
            Self::IllegalArgs => "NDMP_ILLEGAL_ARGS_ERR",
            Self::IoErr => "NDMP_IO_ERR",
            Self::ConnectErr => "NDMP_CONNECT_ERR",
            Self::NotSupported => "NDMP_NOT_SUPPORTED_ERR",
            Self::NoDevice => "NDMP_NO_DEVICE_ERR",
            Self::NoMemory => "NDMP_NO_MEM_ERR",
            Self::InternalErr => "NDMP_INTERNAL_ERR",
        };
        f.write_str(text)
    }
}

/// Per-file recover outcome, version-neutral. `§4.6` maps this to either the
/// narrow V3 set or the full V4 set when emitting `notify_file_recovered`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoverOutcome {
    Successful,
    FailedPermission,
    FailedNotFound,
    FailedNoDirectory,
    FailedOutOfMemory,
    FailedIoError,
    FailedFilePathExists,
    FailedUndefinedError,
}

/// The three values a V3 `notify_file_recovered` can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoverOutcomeV3 {
    NoErr,
    FileNotFoundErr,
    PermissionErr,
}

impl RecoverOutcome {
    /// Narrows a version-neutral outcome down to what V3 can express.
    /// Outcomes V3 has no code for collapse to `FileNotFoundErr`, matching
    /// the closest existing V3 semantics rather than inventing a new one.
    pub const fn to_v3(self) -> RecoverOutcomeV3 {
        match self {
            Self::Successful => RecoverOutcomeV3::NoErr,
            Self::FailedPermission => RecoverOutcomeV3::PermissionErr,
            _ => RecoverOutcomeV3::FileNotFoundErr,
        }
    }
}
