use std::sync::Arc;

use dashmap::DashMap;
use serde::Serialize;
use waypoint_core::SessionId;
use waypoint_engine::{Phase, SessionState};

/// Live sessions, keyed by id.
pub struct SessionRegistry {
    sessions: DashMap<SessionId, Arc<SessionState>>,
}

/// Point-in-time view of one session, for health reporting.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub session_id: SessionId,
    pub phase: Phase,
    pub reading: bool,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
        }
    }

    /// Create and track a new session.
    pub fn open(&self) -> Arc<SessionState> {
        let state = Arc::new(SessionState::new(SessionId::new()));
        self.sessions.insert(state.id().clone(), Arc::clone(&state));
        state
    }

    /// Close a session and stop tracking it.
    pub fn close(&self, id: &SessionId) {
        if let Some((_, state)) = self.sessions.remove(id) {
            state.close();
        }
    }

    /// Close every session. Used on shutdown.
    pub fn close_all(&self) -> usize {
        let ids: Vec<SessionId> = self.sessions.iter().map(|e| e.key().clone()).collect();
        for id in &ids {
            self.close(id);
        }
        ids.len()
    }

    pub fn count(&self) -> usize {
        self.sessions.len()
    }

    pub fn summaries(&self) -> Vec<SessionSummary> {
        self.sessions
            .iter()
            .map(|entry| SessionSummary {
                session_id: entry.key().clone(),
                phase: entry.value().phase(),
                reading: entry.value().is_reading(),
            })
            .collect()
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
