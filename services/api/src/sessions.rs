//! In-memory Session Store
//!
//! Each session slot holds the latest course revision and a broadcast
//! channel that fans every committed revision out to WebSocket subscribers.

use crate::models::SessionSummary;
use chrono::{DateTime, Utc};
use shewit_core::{CourseError, CourseState};
use std::collections::HashMap;
use tokio::sync::{RwLock, broadcast};
use tracing::{debug, warn};
use uuid::Uuid;

/// Revisions a lagging subscriber may fall behind before it skips ahead.
const UPDATE_BUFFER: usize = 32;

struct SessionSlot {
    state: CourseState,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    updates: broadcast::Sender<CourseState>,
}

impl SessionSlot {
    fn summary(&self, id: Uuid) -> SessionSummary {
        SessionSummary {
            id,
            subject: self.state.subject.clone(),
            phase: self.state.phase,
            is_thinking: self.state.is_thinking,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    fn replace(&mut self, id: Uuid, state: CourseState) {
        self.state = state.clone();
        self.updated_at = Utc::now();
        // No subscribers is not an error.
        let receivers = self.updates.send(state).unwrap_or(0);
        debug!(session_id = %id, receivers, "Revision committed");
    }
}

#[derive(Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<Uuid, SessionSlot>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a session with an empty course.
    pub async fn create(&self) -> (Uuid, CourseState) {
        let id = Uuid::new_v4();
        let now = Utc::now();
        let (updates, _) = broadcast::channel(UPDATE_BUFFER);
        let state = CourseState::default();
        self.sessions.write().await.insert(
            id,
            SessionSlot {
                state: state.clone(),
                created_at: now,
                updated_at: now,
                updates,
            },
        );
        (id, state)
    }

    /// Summaries of every session, most recently updated first.
    pub async fn list(&self) -> Vec<SessionSummary> {
        let sessions = self.sessions.read().await;
        let mut summaries: Vec<SessionSummary> = sessions
            .iter()
            .map(|(id, slot)| slot.summary(*id))
            .collect();
        summaries.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        summaries
    }

    pub async fn get(&self, id: Uuid) -> Option<CourseState> {
        self.sessions.read().await.get(&id).map(|s| s.state.clone())
    }

    /// Replaces the stored revision and pushes it to subscribers.
    ///
    /// Returns `false` when the session does not exist.
    pub async fn commit(&self, id: Uuid, state: CourseState) -> bool {
        let mut sessions = self.sessions.write().await;
        let Some(slot) = sessions.get_mut(&id) else {
            warn!(session_id = %id, "Dropping revision for unknown session");
            return false;
        };
        slot.replace(id, state);
        true
    }

    /// Runs `step` on the stored revision and commits what it returns, all
    /// under the write lock, so no other step can read the same revision.
    ///
    /// Returns `None` when the session does not exist. A rejected step
    /// commits nothing.
    pub async fn update<F>(&self, id: Uuid, step: F) -> Option<Result<CourseState, CourseError>>
    where
        F: FnOnce(&CourseState) -> Result<CourseState, CourseError>,
    {
        let mut sessions = self.sessions.write().await;
        let slot = sessions.get_mut(&id)?;
        let result = step(&slot.state);
        if let Ok(next) = &result {
            slot.replace(id, next.clone());
        }
        Some(result)
    }

    /// Commits `state` only if the stored revision still equals `expected`.
    pub async fn commit_if(&self, id: Uuid, expected: &CourseState, state: CourseState) -> bool {
        let mut sessions = self.sessions.write().await;
        match sessions.get_mut(&id) {
            Some(slot) if slot.state == *expected => {
                slot.replace(id, state);
                true
            }
            _ => false,
        }
    }

    /// The current revision together with a receiver for every later one.
    pub async fn subscribe(&self, id: Uuid) -> Option<(CourseState, broadcast::Receiver<CourseState>)> {
        let sessions = self.sessions.read().await;
        let slot = sessions.get(&id)?;
        Some((slot.state.clone(), slot.updates.subscribe()))
    }
}
