//! Fan-out of presence snapshots, moderation commands and data-change
//! signals to every attached connection.
//!
//! Delivery is at-most-once and best effort: there is no acknowledgement and
//! no replay for connections that attach later.

use std::sync::Arc;

use axum::extract::ws::Message;
use pricedesk_core::error::CoreError;
use pricedesk_core::moderation::ModerationCommand;
use pricedesk_core::presence::{dedup_connected_users, ConnectedUser};
use pricedesk_core::protocol::{DataTable, ServerMessage};
use pricedesk_events::ChangeEvent;
use tokio::sync::broadcast;

use super::manager::WsManager;

pub struct Relay {
    ws_manager: Arc<WsManager>,
}

impl Relay {
    pub fn new(ws_manager: Arc<WsManager>) -> Self {
        Self { ws_manager }
    }

    pub fn ws_manager(&self) -> &Arc<WsManager> {
        &self.ws_manager
    }

    /// Send one frame to one connection.
    pub async fn send(&self, conn_id: &str, message: &ServerMessage) -> bool {
        match encode(message) {
            Some(frame) => self.ws_manager.send_to(conn_id, frame).await,
            None => false,
        }
    }

    /// Send one frame to every connection. Returns how many were reached.
    pub async fn broadcast(&self, message: &ServerMessage) -> usize {
        match encode(message) {
            Some(frame) => self.ws_manager.broadcast(frame).await,
            None => 0,
        }
    }

    /// Push the full presence snapshot to every connection.
    pub async fn publish_sync(&self) -> usize {
        let records = self.ws_manager.snapshot().await;
        let count = records.len();
        let reached = self.broadcast(&ServerMessage::Sync { records }).await;
        tracing::debug!(records = count, reached, "Published presence sync");
        reached
    }

    /// Deduplicated view of who is online.
    pub async fn connected_users(&self) -> Vec<ConnectedUser> {
        dedup_connected_users(&self.ws_manager.snapshot().await)
    }

    /// Broadcast a moderation command to every connection, the issuer's
    /// included. Each client decides whether it is the target.
    ///
    /// Returns the number of connections the command reached.
    pub async fn send_moderation(&self, command: ModerationCommand) -> Result<usize, CoreError> {
        command.target.validate().map_err(CoreError::Validation)?;
        let kind = command.kind.as_str();
        let issued_by = command.issued_by.clone();
        let reached = self.broadcast(&ServerMessage::Moderation { command }).await;
        tracing::info!(kind, issued_by = ?issued_by, reached, "Moderation command relayed");
        Ok(reached)
    }

    /// Tell every connection that `table` changed and must be re-read.
    pub async fn send_data_change(&self, table: DataTable) -> usize {
        let message = ServerMessage::DataChanged {
            table,
            changed_at: chrono::Utc::now(),
        };
        self.broadcast(&message).await
    }

    /// Forward [`ChangeEvent`]s from the event bus as data-change frames.
    ///
    /// Runs until the bus is closed. When the receiver lags, every table is
    /// invalidated since the skipped events are unknown.
    pub async fn run(self: Arc<Self>, mut receiver: broadcast::Receiver<ChangeEvent>) {
        loop {
            match receiver.recv().await {
                Ok(event) => {
                    let reached = self.send_data_change(event.table).await;
                    tracing::debug!(
                        table = %event.table,
                        actor = ?event.actor,
                        reached,
                        "Relayed data change"
                    );
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "Relay lagged, invalidating all tables");
                    for table in [DataTable::Products, DataTable::Settings] {
                        self.send_data_change(table).await;
                    }
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("Event bus closed, relay shutting down");
                    break;
                }
            }
        }
    }
}

fn encode(message: &ServerMessage) -> Option<Message> {
    match serde_json::to_string(message) {
        Ok(json) => Some(Message::Text(json.into())),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode server message");
            None
        }
    }
}
