//! Defines the WebSocket message protocol between a client and the API server.

use crate::models::SessionView;
use serde::{Deserialize, Serialize};

/// Messages sent from the client to the server.
#[derive(Deserialize, Debug)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Asks for the current revision to be sent again.
    Refresh,
}

/// Messages sent from the server to the client.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// The revision current at subscription time.
    Initialized { session: SessionView },
    /// A newer revision, pushed as soon as it is committed.
    StateUpdate { session: SessionView },
    /// Reports a problem with the client's last message.
    Error { message: String },
}
