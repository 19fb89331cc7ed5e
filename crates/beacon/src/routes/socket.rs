//! WebSocket connection lifecycle.
//!
//! One task per connection reads and dispatches client frames; a spawned
//! writer drains the connection's hub queue onto the socket and pings on an
//! interval. Whichever side ends first, the connection leaves the hub exactly
//! once through [`Hub::on_disconnect`].

use std::fmt;
use std::time::Duration;

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::sync::{broadcast, mpsc};
use waypoint_common::{ClientEvent, ConnectionId, WaypointError};

use crate::hub::{Frame, Hub};
use crate::state::AppState;

/// How long the writer may keep flushing after the reader has finished
const CLOSE_GRACE: Duration = Duration::from_secs(1);

/// Why a connection ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectReason {
    /// Client sent a close frame or the stream ended
    Closed,
    /// No inbound frame within the client timeout
    TimedOut,
    /// Reading from the socket failed
    ReadFailed,
    /// Writing to the socket failed
    WriteFailed,
    /// Server is shutting down
    Shutdown,
}

impl fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            Self::Closed => "closed",
            Self::TimedOut => "timed out",
            Self::ReadFailed => "read failed",
            Self::WriteFailed => "write failed",
            Self::Shutdown => "shutdown",
        };
        f.write_str(reason)
    }
}

/// WebSocket upgrade handler
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    if state.hub.is_full() {
        tracing::warn!("Relay at capacity, refusing WebSocket upgrade");
        return (StatusCode::SERVICE_UNAVAILABLE, "relay at capacity").into_response();
    }

    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(mut socket: WebSocket, state: AppState) {
    // Capacity can fill between the upgrade check and here
    let Some((id, rx)) = state.hub.connect() else {
        let _ = socket.send(Message::Close(None)).await;
        return;
    };

    let (ws_tx, ws_rx) = socket.split();
    let shutdown = state.shutdown.subscribe();

    let mut writer = tokio::spawn(write_loop(
        ws_tx,
        rx,
        state.config.heartbeat_interval(),
        id.clone(),
    ));

    let reason = tokio::select! {
        reason = read_loop(ws_rx, &id, &state.hub, state.config.client_timeout(), shutdown) => reason,
        _ = &mut writer => DisconnectReason::WriteFailed,
    };

    state.hub.on_disconnect(&id);
    tracing::info!(connection_id = %id, reason = %reason, "WebSocket closed");

    if reason != DisconnectReason::WriteFailed {
        // The hub dropped this peer's queue; the writer flushes what is left
        // and sends a close frame.
        if tokio::time::timeout(CLOSE_GRACE, &mut writer).await.is_err() {
            writer.abort();
        }
    }
}

async fn read_loop(
    mut ws_rx: SplitStream<WebSocket>,
    id: &ConnectionId,
    hub: &Hub,
    client_timeout: Duration,
    mut shutdown: broadcast::Receiver<()>,
) -> DisconnectReason {
    loop {
        tokio::select! {
            next = tokio::time::timeout(client_timeout, ws_rx.next()) => match next {
                Err(_) => return DisconnectReason::TimedOut,
                Ok(None) => return DisconnectReason::Closed,
                Ok(Some(Err(e))) => {
                    tracing::debug!(connection_id = %id, error = %e, "WebSocket read error");
                    return DisconnectReason::ReadFailed;
                }
                Ok(Some(Ok(msg))) => match msg {
                    Message::Text(text) => handle_text(hub, id, text.as_str()),
                    Message::Binary(data) => {
                        tracing::warn!(connection_id = %id, len = data.len(), "Ignoring binary frame");
                    }
                    Message::Close(_) => return DisconnectReason::Closed,
                    // Any frame counts as liveness
                    Message::Ping(_) | Message::Pong(_) => {}
                },
            },
            _ = shutdown.recv() => return DisconnectReason::Shutdown,
        }
    }
}

async fn write_loop(
    mut ws_tx: SplitSink<WebSocket, Message>,
    mut rx: mpsc::Receiver<Frame>,
    heartbeat: Duration,
    id: ConnectionId,
) {
    let mut ping = tokio::time::interval(heartbeat);
    ping.tick().await; // consume first immediate tick

    loop {
        tokio::select! {
            frame = rx.recv() => match frame {
                Some(frame) => {
                    if let Err(e) = ws_tx.send(Message::Text(frame.to_string().into())).await {
                        tracing::debug!(connection_id = %id, error = %e, "WebSocket write error");
                        return;
                    }
                }
                None => {
                    let _ = ws_tx.send(Message::Close(None)).await;
                    return;
                }
            },
            _ = ping.tick() => {
                if ws_tx.send(Message::Ping(Vec::<u8>::new().into())).await.is_err() {
                    return;
                }
                tracing::trace!(connection_id = %id, "Sent ping");
            }
        }
    }
}

fn handle_text(hub: &Hub, id: &ConnectionId, text: &str) {
    if let Err(e) = dispatch(hub, id, text) {
        if e.is_ignorable() {
            tracing::warn!(connection_id = %id, error = %e, "Ignoring client frame");
        } else {
            tracing::error!(connection_id = %id, error = %e, "Failed to handle client frame");
        }
    }
}

/// Decode one client frame and apply it to the hub
pub fn dispatch(hub: &Hub, id: &ConnectionId, text: &str) -> Result<(), WaypointError> {
    match ClientEvent::decode(text)? {
        ClientEvent::SelectRole { role } => {
            hub.select_role(id, role)?;
        }
        ClientEvent::SendLocation { latitude, longitude } => {
            hub.on_location(id, latitude, longitude)?;
        }
    }
    Ok(())
}
