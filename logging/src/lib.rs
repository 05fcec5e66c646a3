//! Structured logging facade used by every other crate in the workspace.
//!
//! Every session gets one `tracing::Span` carrying its id; state
//! transitions, notify emissions, and pump flushes log at `debug`, halts and
//! protocol errors at `warn`/`error` (`SPEC_FULL.md` §2A). Nothing here talks
//! to a subscriber — wiring `tracing-subscriber` is the binary's job
//! (`bin/ndmpd`).

use wire::LogSeverity;

/// Opens the per-session span a handler should stay inside for the
/// duration of one request or notify emission.
pub fn session_span(session_id: u64) -> tracing::Span {
    tracing::info_span!("ndmp_session", session_id)
}

/// Maps the archive worker's `log(type, ...)` severity to a `tracing` level,
/// the way the dispatcher decides how loud to be before also emitting the
/// `NDMP_LOG_MESSAGE` notify for the same event.
pub const fn tracing_level(severity: LogSeverity) -> tracing::Level {
    match severity {
        LogSeverity::Debug => tracing::Level::DEBUG,
        LogSeverity::Normal => tracing::Level::INFO,
        LogSeverity::Warning => tracing::Level::WARN,
        LogSeverity::Error => tracing::Level::ERROR,
    }
}

/// Logs a worker-originated message at the severity the worker requested,
/// before the caller also turns it into an `NDMP_LOG_MESSAGE` notify.
pub fn log_worker_message(severity: LogSeverity, message_id: u32, text: &str) {
    match severity {
        LogSeverity::Debug => tracing::debug!(message_id, %text, "worker log"),
        LogSeverity::Normal => tracing::info!(message_id, %text, "worker log"),
        LogSeverity::Warning => tracing::warn!(message_id, %text, "worker log"),
        LogSeverity::Error => tracing::error!(message_id, %text, "worker log"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_maps_to_expected_level() {
        assert_eq!(tracing_level(LogSeverity::Debug), tracing::Level::DEBUG);
        assert_eq!(tracing_level(LogSeverity::Normal), tracing::Level::INFO);
        assert_eq!(tracing_level(LogSeverity::Warning), tracing::Level::WARN);
        assert_eq!(tracing_level(LogSeverity::Error), tracing::Level::ERROR);
    }

    /// Exercises the facade against a real subscriber rather than just
    /// checking the level mapping, so a span/event macro typo would show up
    /// as a panic instead of passing silently with nothing installed.
    #[test]
    fn facade_composes_with_a_real_subscriber() {
        let subscriber = tracing_subscriber::fmt().with_test_writer().finish();
        tracing::subscriber::with_default(subscriber, || {
            let _span = session_span(7).entered();
            log_worker_message(LogSeverity::Warning, 42, "test");
        });
    }
}
