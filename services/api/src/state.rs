//! Shared Application State
//!
//! This module defines the `AppState` struct, which holds the session store
//! and the agent gateway every orchestrator step runs against.

use crate::sessions::SessionStore;
use shewit_core::AgentGateway;
use std::sync::Arc;

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionStore>,
    pub gateway: Arc<dyn AgentGateway>,
}

impl AppState {
    pub fn new(gateway: Arc<dyn AgentGateway>) -> Self {
        Self {
            sessions: Arc::new(SessionStore::new()),
            gateway,
        }
    }
}
