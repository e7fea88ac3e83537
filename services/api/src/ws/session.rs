//! Manages the WebSocket connection lifecycle for one session subscriber.

use super::protocol::{ClientMessage, ServerMessage};
use crate::{handlers::ApiError, models::SessionView, state::AppState};
use anyhow::Result;
use axum::{
    extract::{
        Path, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use futures_util::{
    SinkExt, StreamExt,
    stream::{SplitSink, SplitStream},
};
use shewit_core::CourseState;
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

/// Axum handler to upgrade an HTTP connection to a WebSocket.
///
/// The subscription is taken before the upgrade, so an unknown session is
/// a plain 404 and no revision committed after the handshake can be missed.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let (current, updates) = state
        .sessions
        .subscribe(id)
        .await
        .ok_or_else(|| ApiError::NotFound(format!("Session with id '{}' not found", id)))?;
    Ok(ws.on_upgrade(move |socket| handle_socket(socket, state, id, current, updates)))
}

#[instrument(name = "ws_session", skip_all, fields(session_id = %id))]
async fn handle_socket(
    socket: WebSocket,
    state: Arc<AppState>,
    id: Uuid,
    current: CourseState,
    updates: broadcast::Receiver<CourseState>,
) {
    info!("New WebSocket subscriber.");
    let (mut socket_tx, socket_rx) = socket.split();

    if send_msg(
        &mut socket_tx,
        ServerMessage::Initialized {
            session: SessionView::new(id, current),
        },
    )
    .await
    .is_err()
    {
        error!("Failed to send Initialized message to client.");
        return;
    }

    if let Err(e) = run_subscription(&state, id, socket_tx, socket_rx, updates).await {
        warn!(error = ?e, "Subscription terminated with error.");
    }
    info!("WebSocket subscriber disconnected.");
}

/// Forwards committed revisions to the client until either side goes away.
async fn run_subscription(
    state: &AppState,
    id: Uuid,
    mut socket_tx: SplitSink<WebSocket, Message>,
    mut socket_rx: SplitStream<WebSocket>,
    mut updates: broadcast::Receiver<CourseState>,
) -> Result<()> {
    loop {
        tokio::select! {
            update = updates.recv() => match update {
                Ok(revision) => {
                    send_update(&mut socket_tx, id, revision).await?;
                }
                Err(RecvError::Lagged(skipped)) => {
                    // Intermediate revisions are disposable; catch up on the latest.
                    warn!(skipped, "Subscriber lagged behind.");
                    if let Some(latest) = state.sessions.get(id).await {
                        send_update(&mut socket_tx, id, latest).await?;
                    }
                }
                Err(RecvError::Closed) => break,
            },
            incoming = socket_rx.next() => match incoming {
                Some(Ok(Message::Text(text))) => match serde_json::from_str::<ClientMessage>(&text) {
                    Ok(ClientMessage::Refresh) => {
                        let Some(latest) = state.sessions.get(id).await else { break };
                        send_update(&mut socket_tx, id, latest).await?;
                    }
                    Err(e) => {
                        send_msg(
                            &mut socket_tx,
                            ServerMessage::Error { message: format!("Unrecognized message: {e}") },
                        )
                        .await?;
                    }
                },
                Some(Ok(Message::Close(_))) | None => {
                    info!("Client closed the connection.");
                    break;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    error!("Error receiving from client WebSocket: {:?}", e);
                    break;
                }
            },
        }
    }
    Ok(())
}

async fn send_update(
    socket_tx: &mut SplitSink<WebSocket, Message>,
    id: Uuid,
    revision: CourseState,
) -> Result<()> {
    send_msg(
        socket_tx,
        ServerMessage::StateUpdate {
            session: SessionView::new(id, revision),
        },
    )
    .await
}

/// A helper function to serialize and send a `ServerMessage` to the client.
async fn send_msg(socket_tx: &mut SplitSink<WebSocket, Message>, msg: ServerMessage) -> Result<()> {
    let serialized = serde_json::to_string(&msg)?;
    socket_tx.send(Message::Text(serialized.into())).await?;
    Ok(())
}
