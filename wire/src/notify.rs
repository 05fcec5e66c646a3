use crate::error_code::{RecoverOutcome, RecoverOutcomeV3};
use crate::halt::{DataHaltReason, MoverHaltReason, MoverPauseReason};

/// Severity for `NDMP_LOG_MESSAGE`, matching the `ndmp_log_type` values the
/// archive worker's `log` callback can request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogSeverity {
    Normal,
    Debug,
    Error,
    Warning,
}

/// One server-initiated notify. The dispatcher serializes these through the
/// (external) XDR encoder; the core only builds the value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notify {
    DataHalted {
        reason: DataHaltReason,
    },
    MoverPaused {
        reason: MoverPauseReason,
        seek_position: u64,
    },
    MoverHalted {
        reason: MoverHaltReason,
    },
    LogMessage {
        severity: LogSeverity,
        message_id: u32,
        text: String,
        /// V4 adds this field, fixed to "none" per `§4.6`; V3 replies ignore it.
        associated_message: &'static str,
    },
    LogFile {
        name: String,
        /// Version-neutral per-file result (`§4.6`). V4 replies send this
        /// directly.
        outcome: RecoverOutcome,
        /// V3's narrower three-value set, computed via `RecoverOutcome::to_v3`
        /// since a V3 `ndmp_log_file_request_v3` can't carry the full value.
        v3_outcome: RecoverOutcomeV3,
    },
}

impl Notify {
    pub fn log(severity: LogSeverity, message_id: u32, text: impl Into<String>) -> Self {
        Self::LogMessage {
            severity,
            message_id,
            text: text.into(),
            associated_message: "none",
        }
    }
}
