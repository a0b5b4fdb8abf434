use axum::body::Bytes;
use axum::extract::ws::Message;
use indexmap::IndexMap;
use pricedesk_core::presence::{PresenceRecord, TrackPresence};
use pricedesk_core::types::Timestamp;
use tokio::sync::{mpsc, RwLock};

use crate::middleware::auth::AuthUser;

/// Channel sender half for pushing messages to a WebSocket connection.
pub type WsSender = mpsc::UnboundedSender<Message>;

/// Metadata for a single presence-channel connection.
pub struct WsConnection {
    /// Identity proven by the token presented at upgrade, if any.
    pub viewer: Option<AuthUser>,
    /// Channel sender for outbound messages to this connection.
    pub sender: WsSender,
    pub connected_at: Timestamp,
    /// Last inbound frame of any kind, pongs included.
    pub last_seen: Timestamp,
    /// The record this connection currently tracks. At most one.
    pub presence: Option<PresenceRecord>,
}

/// Manages all attached connections and their presence records.
///
/// Connections are kept in attach order, so snapshots list records in the
/// order their connections attached. Thread-safe via interior `RwLock`;
/// designed to be wrapped in `Arc` and shared across the application.
pub struct WsManager {
    connections: RwLock<IndexMap<String, WsConnection>>,
}

impl WsManager {
    pub fn new() -> Self {
        Self {
            connections: RwLock::new(IndexMap::new()),
        }
    }

    /// Register a new connection.
    ///
    /// Returns the receiver half of the message channel so the caller can
    /// forward messages to the WebSocket sink.
    pub async fn add(
        &self,
        conn_id: String,
        viewer: Option<AuthUser>,
    ) -> mpsc::UnboundedReceiver<Message> {
        let (tx, rx) = mpsc::unbounded_channel();
        let now = chrono::Utc::now();
        let conn = WsConnection {
            viewer,
            sender: tx,
            connected_at: now,
            last_seen: now,
            presence: None,
        };
        self.connections.write().await.insert(conn_id, conn);
        rx
    }

    /// Remove a connection by its ID.
    ///
    /// Returns `true` if the connection was tracking a presence record, in
    /// which case the caller should publish a fresh snapshot.
    pub async fn remove(&self, conn_id: &str) -> bool {
        self.connections
            .write()
            .await
            .shift_remove(conn_id)
            .is_some_and(|conn| conn.presence.is_some())
    }

    /// Start or replace the presence record of a connection.
    ///
    /// Returns `false` if the connection is unknown.
    pub async fn track(&self, conn_id: &str, track: TrackPresence) -> bool {
        let mut conns = self.connections.write().await;
        let Some(conn) = conns.get_mut(conn_id) else {
            return false;
        };
        conn.presence = Some(track.into_record(conn_id));
        conn.last_seen = chrono::Utc::now();
        true
    }

    /// Stop tracking without detaching. Returns `true` if a record was removed.
    pub async fn untrack(&self, conn_id: &str) -> bool {
        self.connections
            .write()
            .await
            .get_mut(conn_id)
            .and_then(|conn| conn.presence.take())
            .is_some()
    }

    /// All tracked records, in attach order.
    pub async fn snapshot(&self) -> Vec<PresenceRecord> {
        self.connections
            .read()
            .await
            .values()
            .filter_map(|conn| conn.presence.clone())
            .collect()
    }

    pub async fn viewer(&self, conn_id: &str) -> Option<AuthUser> {
        self.connections
            .read()
            .await
            .get(conn_id)
            .and_then(|conn| conn.viewer.clone())
    }

    /// Record inbound activity on a connection.
    pub async fn touch(&self, conn_id: &str) {
        if let Some(conn) = self.connections.write().await.get_mut(conn_id) {
            conn.last_seen = chrono::Utc::now();
        }
    }

    /// Broadcast a message to all attached connections.
    ///
    /// Connections whose send channels are closed are silently skipped
    /// (they will be cleaned up on their next receive loop iteration).
    /// Returns the number of connections the message was queued for.
    pub async fn broadcast(&self, message: Message) -> usize {
        let conns = self.connections.read().await;
        conns
            .values()
            .filter(|conn| conn.sender.send(message.clone()).is_ok())
            .count()
    }

    /// Send a message to a single connection. Returns `false` if it is gone.
    pub async fn send_to(&self, conn_id: &str, message: Message) -> bool {
        self.connections
            .read()
            .await
            .get(conn_id)
            .is_some_and(|conn| conn.sender.send(message).is_ok())
    }

    /// Drop every connection that has been silent for longer than
    /// `max_silence`, sending each a Close frame first.
    ///
    /// Returns the evicted connection IDs.
    pub async fn evict_stale(&self, max_silence: chrono::Duration) -> Vec<String> {
        let cutoff = chrono::Utc::now() - max_silence;
        let mut conns = self.connections.write().await;
        let stale: Vec<String> = conns
            .iter()
            .filter(|(_, conn)| conn.last_seen < cutoff)
            .map(|(id, _)| id.clone())
            .collect();
        for id in &stale {
            if let Some(conn) = conns.shift_remove(id) {
                let _ = conn.sender.send(Message::Close(None));
            }
        }
        stale
    }

    /// Return the current number of attached connections.
    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }

    /// Send a Close frame to every connection, then clear the map.
    ///
    /// Used during graceful shutdown to notify all clients before the
    /// server stops accepting new connections.
    pub async fn shutdown_all(&self) {
        let mut conns = self.connections.write().await;
        let count = conns.len();
        for conn in conns.values() {
            let _ = conn.sender.send(Message::Close(None));
        }
        conns.clear();
        tracing::info!(count, "Closed all presence channel connections");
    }

    /// Send a Ping frame to every connected client.
    pub async fn ping_all(&self) {
        let conns = self.connections.read().await;
        for conn in conns.values() {
            let _ = conn.sender.send(Message::Ping(Bytes::new()));
        }
    }
}

impl Default for WsManager {
    fn default() -> Self {
        Self::new()
    }
}
