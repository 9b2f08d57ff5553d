use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use waypoint_core::SessionId;

/// Where a session's refresh loop currently is.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    Resolving,
    Generating,
    Enriching,
    Delivered,
    Stopped,
}

/// Per-viewer state shared between the socket reader and the refresh loop.
///
/// `reading` is set by the loop after a non-empty delivery and cleared by the
/// viewer's "done reading" message. Once cancelled, a session never becomes
/// live again.
pub struct SessionState {
    id: SessionId,
    reading: AtomicBool,
    phase: Mutex<Phase>,
    cancel: CancellationToken,
}

impl SessionState {
    pub fn new(id: SessionId) -> Self {
        Self {
            id,
            reading: AtomicBool::new(false),
            phase: Mutex::new(Phase::Idle),
            cancel: CancellationToken::new(),
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn is_reading(&self) -> bool {
        self.reading.load(Ordering::Acquire)
    }

    pub fn set_reading(&self) {
        self.reading.store(true, Ordering::Release);
    }

    /// Viewer finished reading; the next scheduled check starts a new cycle.
    pub fn done_reading(&self) {
        self.reading.store(false, Ordering::Release);
    }

    pub fn is_live(&self) -> bool {
        !self.cancel.is_cancelled()
    }

    /// End the session. Idempotent.
    pub fn close(&self) {
        self.cancel.cancel();
    }

    /// Resolves once the session is closed.
    pub async fn cancelled(&self) {
        self.cancel.cancelled().await
    }

    pub fn token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn phase(&self) -> Phase {
        *self.phase.lock()
    }

    pub fn set_phase(&self, phase: Phase) {
        *self.phase.lock() = phase;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reading_flag_toggles() {
        let state = SessionState::new(SessionId::new());
        assert!(!state.is_reading());
        state.set_reading();
        assert!(state.is_reading());
        state.done_reading();
        assert!(!state.is_reading());
        state.done_reading();
        assert!(!state.is_reading());
    }

    #[test]
    fn close_is_terminal() {
        let state = SessionState::new(SessionId::new());
        assert!(state.is_live());
        state.close();
        state.close();
        assert!(!state.is_live());
        assert!(state.token().is_cancelled());
    }

    #[tokio::test]
    async fn cancelled_resolves_after_close() {
        let state = std::sync::Arc::new(SessionState::new(SessionId::new()));
        let waiter = {
            let state = state.clone();
            tokio::spawn(async move { state.cancelled().await })
        };
        state.close();
        waiter.await.unwrap();
    }

    #[test]
    fn phase_serializes_snake_case() {
        let state = SessionState::new(SessionId::new());
        assert_eq!(state.phase(), Phase::Idle);
        state.set_phase(Phase::Generating);
        assert_eq!(serde_json::to_value(state.phase()).unwrap(), "generating");
    }
}
