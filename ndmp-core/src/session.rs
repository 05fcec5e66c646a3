use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use wire::ProtocolVersion;

use crate::data::DataRecord;
use crate::error::NdmpError;
use crate::mover::MoverRecord;

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

/// The mutable record one session mutex protects (`§3`).
pub struct SessionState {
    pub data: DataRecord,
    pub mover: MoverRecord,
}

impl SessionState {
    fn new(record_size: u32) -> Self {
        Self {
            data: DataRecord::new(),
            mover: MoverRecord::new(record_size),
        }
    }

    /// `connect` with a `LOCAL` address (`§4.3`): DATA goes straight to
    /// CONNECTED only if MOVER is already LISTEN, and the same call drives
    /// MOVER directly to ACTIVE. Both records change together or not at
    /// all, which is why this lives on `SessionState` rather than either
    /// record alone.
    pub fn connect_local(&mut self) -> Result<(), NdmpError> {
        if self.mover.state() != crate::state::MoverState::Listen {
            return Err(NdmpError::illegal_state(
                "connect",
                self.mover.state().as_str(),
            ));
        }
        self.data.connect_local()?;
        self.mover.activate_local()?;
        Ok(())
    }
}

/// One NDMP session bound to an accepted control connection (`§2`, `§3`).
///
/// Owns the session mutex, an atomic end-of-session flag workers and the
/// reactor both poll without locking, and the per-session `tracing::Span`
/// every handler should stay inside.
pub struct Session {
    id: u64,
    protocol_version: ProtocolVersion,
    state: Mutex<SessionState>,
    eof: Arc<AtomicBool>,
}

impl Session {
    pub fn new(protocol_version: ProtocolVersion, record_size: u32) -> Self {
        Self {
            id: NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed),
            protocol_version,
            state: Mutex::new(SessionState::new(record_size)),
            eof: Arc::new(AtomicBool::new(false)),
        }
    }

    pub const fn id(&self) -> u64 {
        self.id
    }

    pub const fn protocol_version(&self) -> ProtocolVersion {
        self.protocol_version
    }

    /// Locks the session state. Handlers must not hold the returned guard
    /// across an archive-worker callback (`§3A`) — copy out what's needed
    /// and drop the guard before calling back into worker code.
    pub fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn eof_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.eof)
    }

    pub fn is_eof(&self) -> bool {
        self.eof.load(Ordering::Acquire)
    }

    pub fn set_eof(&self) {
        self.eof.store(true, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{DataState, MoverState};
    use wire::Address;

    #[test]
    fn session_ids_are_distinct_and_increasing() {
        let a = Session::new(ProtocolVersion::V3, 10240);
        let b = Session::new(ProtocolVersion::V3, 10240);
        assert!(b.id() > a.id());
    }

    #[test]
    fn connect_local_requires_mover_listening() {
        let session = Session::new(ProtocolVersion::V4, 10240);
        let mut state = session.lock();
        assert!(state.connect_local().is_err());
    }

    #[test]
    fn connect_local_activates_both_records() {
        let session = Session::new(ProtocolVersion::V4, 10240);
        let mut state = session.lock();
        state.mover.listen(Address::Local, None).unwrap();
        state.connect_local().unwrap();
        assert_eq!(state.data.state(), DataState::Connected);
        assert_eq!(state.mover.state(), MoverState::Active);
    }

    #[test]
    fn eof_flag_is_observable_without_locking() {
        let session = Session::new(ProtocolVersion::V3, 10240);
        assert!(!session.is_eof());
        session.set_eof();
        assert!(session.is_eof());
    }
}
