use wire::ErrorCode;

/// The error taxonomy of `§7`, carried through the core with `thiserror` the
/// way `DeltaTransferError`/`GeneratorError` carry theirs: a typed variant per
/// bucket, a `Display` a log line can use directly, and a mapping to the
/// reply-level [`ErrorCode`] a dispatcher sends back to the DMA.
#[derive(Debug, thiserror::Error)]
pub enum NdmpError {
    #[error("{request} not accepted in state {state}")]
    IllegalState {
        request: &'static str,
        state: &'static str,
    },

    #[error("illegal arguments: {0}")]
    IllegalArgs(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("connect error: {0}")]
    Connect(String),

    #[error("operation not supported")]
    NotSupported,

    #[error("no device available")]
    NoDevice,

    #[error("out of memory")]
    NoMemory,

    #[error("internal error: {0}")]
    Internal(String),
}

impl NdmpError {
    pub fn illegal_state(request: &'static str, state: &'static str) -> Self {
        Self::IllegalState { request, state }
    }

    /// Maps this error to the reply-level code a dispatcher sends back.
    /// Programmer-invariant violations (`§7`, null cookie / out-of-range
    /// index) are not represented here — those return a sentinel at the call
    /// site rather than flowing through the reply error path.
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::IllegalState { .. } => ErrorCode::IllegalState,
            Self::IllegalArgs(_) => ErrorCode::IllegalArgs,
            Self::Io(_) => ErrorCode::IoErr,
            Self::Connect(_) => ErrorCode::ConnectErr,
            Self::NotSupported => ErrorCode::NotSupported,
            Self::NoDevice => ErrorCode::NoDevice,
            Self::NoMemory => ErrorCode::NoMemory,
            Self::Internal(_) => ErrorCode::InternalErr,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn illegal_state_maps_to_illegal_state_code() {
        let err = NdmpError::illegal_state("start_backup", "IDLE");
        assert_eq!(err.code(), ErrorCode::IllegalState);
        assert_eq!(err.to_string(), "start_backup not accepted in state IDLE");
    }

    #[test]
    fn io_error_maps_to_io_err_code() {
        let err: NdmpError = std::io::Error::from(std::io::ErrorKind::BrokenPipe).into();
        assert_eq!(err.code(), ErrorCode::IoErr);
    }
}
