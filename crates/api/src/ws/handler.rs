use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::{IntoResponse, Response};
use futures::{SinkExt, StreamExt};
use pricedesk_core::protocol::{error_codes, parse_client_message, ClientMessage, ServerMessage};
use serde::Deserialize;

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::ensure_super_admin;
use crate::state::AppState;

/// Upper bound on flushing queued frames after the receive loop ends.
const SEND_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Deserialize)]
pub struct WsParams {
    /// Access token. Without one the connection may observe and track
    /// presence but cannot send moderation or data-change frames.
    pub token: Option<String>,
}

/// HTTP handler that upgrades the connection to WebSocket.
///
/// A token that is present but invalid or stale rejects the upgrade with 401.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<WsParams>,
    State(state): State<AppState>,
) -> AppResult<Response> {
    let viewer = match params.token.as_deref().filter(|t| !t.is_empty()) {
        Some(token) => Some(AuthUser::from_token(token, &state).await?),
        None => None,
    };
    Ok(ws
        .on_upgrade(move |socket| handle_socket(socket, state, viewer))
        .into_response())
}

/// Manage a single presence-channel connection after upgrade.
///
///   1. Registers the connection and sends `channel.attached` plus the
///      current snapshot.
///   2. Spawns a sender task that forwards messages from the manager channel.
///   3. Dispatches inbound frames on the current task.
///   4. On disconnect, drops the connection and republishes presence.
async fn handle_socket(socket: WebSocket, state: AppState, viewer: Option<AuthUser>) {
    let conn_id = uuid::Uuid::new_v4().to_string();
    let viewer_name = viewer.as_ref().map(AuthUser::display_name);
    tracing::info!(conn_id = %conn_id, viewer = ?viewer_name, "Presence channel attached");

    let mut rx = state.ws_manager.add(conn_id.clone(), viewer).await;

    let (mut sink, mut stream) = socket.split();

    let sender_conn_id = conn_id.clone();
    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            let closing = matches!(msg, Message::Close(_));
            if sink.send(msg).await.is_err() || closing {
                tracing::debug!(conn_id = %sender_conn_id, "WebSocket sink closed");
                break;
            }
        }
    });

    let relay = &state.relay;
    relay
        .send(
            &conn_id,
            &ServerMessage::Attached {
                connection_key: conn_id.clone(),
            },
        )
        .await;
    relay
        .send(
            &conn_id,
            &ServerMessage::Sync {
                records: state.ws_manager.snapshot().await,
            },
        )
        .await;

    while let Some(result) = stream.next().await {
        state.ws_manager.touch(&conn_id).await;
        match result {
            Ok(Message::Close(_)) => break,
            Ok(Message::Text(text)) => {
                if !dispatch(&state, &conn_id, text.as_str()).await {
                    break;
                }
            }
            Ok(Message::Binary(_)) => {
                reject(&state, &conn_id, error_codes::BAD_REQUEST, "Binary frames are not supported")
                    .await;
            }
            Ok(Message::Ping(_) | Message::Pong(_)) => {
                tracing::trace!(conn_id = %conn_id, "Keepalive received");
            }
            Err(e) => {
                tracing::debug!(conn_id = %conn_id, error = %e, "WebSocket receive error");
                break;
            }
        }
    }

    if state.ws_manager.remove(&conn_id).await {
        state.relay.publish_sync().await;
    }
    // Removal dropped the channel sender; let queued frames drain.
    if tokio::time::timeout(SEND_DRAIN_TIMEOUT, &mut send_task).await.is_err() {
        send_task.abort();
    }
    tracing::info!(conn_id = %conn_id, "Presence channel detached");
}

/// Handle one inbound text frame.
///
/// Rejections are reported to the sender only. Returns `false` when the
/// socket must be closed, which happens only for a token that is no longer
/// honoured.
async fn dispatch(state: &AppState, conn_id: &str, text: &str) -> bool {
    let message = match parse_client_message(text) {
        Ok(message) => message,
        Err(e) => {
            reject(state, conn_id, error_codes::BAD_REQUEST, format!("Malformed frame: {e}")).await;
            return true;
        }
    };

    match message {
        ClientMessage::Track { record } => {
            if record.role.is_admin() {
                let viewer = state.ws_manager.viewer(conn_id).await;
                if !viewer.is_some_and(|v| v.role.is_admin()) {
                    reject(
                        state,
                        conn_id,
                        error_codes::FORBIDDEN,
                        "Tracking an admin record requires an admin token",
                    )
                    .await;
                    return true;
                }
            }
            if state.ws_manager.track(conn_id, record).await {
                state.relay.publish_sync().await;
            }
        }
        ClientMessage::Untrack => {
            if state.ws_manager.untrack(conn_id).await {
                state.relay.publish_sync().await;
            }
        }
        ClientMessage::Moderation { command } => {
            let Some(viewer) = state.ws_manager.viewer(conn_id).await else {
                reject(state, conn_id, error_codes::UNAUTHORIZED, "Log in to send moderation commands")
                    .await;
                return true;
            };
            if !viewer_is_current(state, conn_id, &viewer).await {
                return false;
            }
            if let Err(e) = ensure_super_admin(&viewer, state).await {
                tracing::warn!(conn_id, viewer = %viewer.display_name(), error = %e, "Moderation refused");
                reject(state, conn_id, error_codes::FORBIDDEN, "Super-admin rights required").await;
                return true;
            }
            let command = command.with_issuer(viewer.display_name());
            if let Err(e) = state.relay.send_moderation(command).await {
                reject(state, conn_id, error_codes::BAD_REQUEST, e.to_string()).await;
            }
        }
        ClientMessage::DataChange { table } => {
            let Some(viewer) = state.ws_manager.viewer(conn_id).await else {
                reject(state, conn_id, error_codes::UNAUTHORIZED, "Log in to send data changes").await;
                return true;
            };
            if !viewer_is_current(state, conn_id, &viewer).await {
                return false;
            }
            state.relay.send_data_change(table).await;
        }
    }
    true
}

/// Re-check the token presented at upgrade. A rotated credential or an
/// expired token gets `error {UNAUTHORIZED}` followed by a Close frame.
async fn viewer_is_current(state: &AppState, conn_id: &str, viewer: &AuthUser) -> bool {
    let Err(e) = viewer.ensure_current(state).await else {
        return true;
    };
    tracing::info!(conn_id, viewer = %viewer.display_name(), error = %e, "Closing socket with stale token");
    reject(state, conn_id, error_codes::UNAUTHORIZED, "Token is no longer valid. Please log in again")
        .await;
    state.ws_manager.send_to(conn_id, Message::Close(None)).await;
    false
}

async fn reject(state: &AppState, conn_id: &str, code: &str, message: impl Into<String>) {
    let message = message.into();
    tracing::debug!(conn_id, code, message = %message, "Rejected client frame");
    state
        .relay
        .send(conn_id, &ServerMessage::error(code, message))
        .await;
}
