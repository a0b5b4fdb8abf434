//! Frame transports a [`PresenceChannel`](crate::PresenceChannel) runs over.

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use pricedesk_core::protocol::{parse_server_message, ClientMessage, ServerMessage};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use crate::client::RelayClientError;

/// A bidirectional stream of relay frames.
///
/// `recv` must be cancel-safe: the channel driver polls it inside
/// `tokio::select!` alongside its outbound queue.
#[async_trait]
pub trait ChannelTransport: Send + 'static {
    async fn send(&mut self, message: &ClientMessage) -> Result<(), RelayClientError>;

    /// Next frame from the relay. `None` once the channel is closed.
    async fn recv(&mut self) -> Option<Result<ServerMessage, RelayClientError>>;

    async fn close(&mut self) -> Result<(), RelayClientError>;
}

// ---------------------------------------------------------------------------
// WebSocket
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct WsTransport {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl WsTransport {
    pub fn new(stream: WebSocketStream<MaybeTlsStream<TcpStream>>) -> Self {
        Self { stream }
    }
}

#[async_trait]
impl ChannelTransport for WsTransport {
    async fn send(&mut self, message: &ClientMessage) -> Result<(), RelayClientError> {
        let text = serde_json::to_string(message)
            .map_err(|e| RelayClientError::Protocol(e.to_string()))?;
        self.stream
            .send(Message::Text(text))
            .await
            .map_err(|e| RelayClientError::TransportUnavailable(e.to_string()))
    }

    async fn recv(&mut self) -> Option<Result<ServerMessage, RelayClientError>> {
        loop {
            match self.stream.next().await? {
                Ok(Message::Text(text)) => {
                    return Some(
                        parse_server_message(&text)
                            .map_err(|e| RelayClientError::Protocol(e.to_string())),
                    );
                }
                Ok(Message::Close(_)) => return None,
                // Pings are answered by tungstenite itself.
                Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_)) => continue,
                Ok(Message::Binary(_)) => {
                    return Some(Err(RelayClientError::Protocol(
                        "Unexpected binary frame".to_string(),
                    )));
                }
                Err(e) => return Some(Err(RelayClientError::TransportUnavailable(e.to_string()))),
            }
        }
    }

    async fn close(&mut self) -> Result<(), RelayClientError> {
        self.stream
            .close(None)
            .await
            .map_err(|e| RelayClientError::TransportUnavailable(e.to_string()))
    }
}

// ---------------------------------------------------------------------------
// In-memory pair
// ---------------------------------------------------------------------------

/// Client end of an in-memory channel.
#[derive(Debug)]
pub struct MemoryTransport {
    outbound: Option<mpsc::UnboundedSender<ClientMessage>>,
    inbound: mpsc::UnboundedReceiver<ServerMessage>,
}

/// Relay end of an in-memory channel, driven by tests.
#[derive(Debug)]
pub struct MemoryPeer {
    outbound: Option<mpsc::UnboundedSender<ServerMessage>>,
    inbound: mpsc::UnboundedReceiver<ClientMessage>,
}

impl MemoryTransport {
    pub fn pair() -> (MemoryTransport, MemoryPeer) {
        let (to_peer, from_client) = mpsc::unbounded_channel();
        let (to_client, from_peer) = mpsc::unbounded_channel();
        (
            MemoryTransport {
                outbound: Some(to_peer),
                inbound: from_peer,
            },
            MemoryPeer {
                outbound: Some(to_client),
                inbound: from_client,
            },
        )
    }
}

#[async_trait]
impl ChannelTransport for MemoryTransport {
    async fn send(&mut self, message: &ClientMessage) -> Result<(), RelayClientError> {
        let closed = || RelayClientError::TransportUnavailable("Channel closed".to_string());
        self.outbound
            .as_ref()
            .ok_or_else(closed)?
            .send(message.clone())
            .map_err(|_| closed())
    }

    async fn recv(&mut self) -> Option<Result<ServerMessage, RelayClientError>> {
        self.inbound.recv().await.map(Ok)
    }

    async fn close(&mut self) -> Result<(), RelayClientError> {
        self.outbound = None;
        self.inbound.close();
        Ok(())
    }
}

impl MemoryPeer {
    /// Deliver a frame to the client. Returns `false` once the client is gone.
    pub fn send(&self, message: ServerMessage) -> bool {
        self.outbound
            .as_ref()
            .is_some_and(|tx| tx.send(message).is_ok())
    }

    /// Next frame from the client. `None` once the client closed its end.
    pub async fn recv(&mut self) -> Option<ClientMessage> {
        self.inbound.recv().await
    }

    /// Drop the relay side, as if the server went away.
    pub fn disconnect(&mut self) {
        self.outbound = None;
    }
}

#[cfg(test)]
mod tests {
    use pricedesk_core::protocol::DataTable;

    use super::*;

    #[tokio::test]
    async fn memory_pair_carries_frames_both_ways() {
        let (mut client, mut peer) = MemoryTransport::pair();

        client
            .send(&ClientMessage::DataChange { table: DataTable::Settings })
            .await
            .unwrap();
        assert_eq!(
            peer.recv().await,
            Some(ClientMessage::DataChange { table: DataTable::Settings })
        );

        assert!(peer.send(ServerMessage::Attached { connection_key: "k".into() }));
        let frame = client.recv().await.unwrap().unwrap();
        assert_eq!(frame, ServerMessage::Attached { connection_key: "k".into() });
    }

    #[tokio::test]
    async fn closed_client_end_rejects_sends() {
        let (mut client, mut peer) = MemoryTransport::pair();
        client.close().await.unwrap();

        assert!(client.send(&ClientMessage::Untrack).await.is_err());
        assert!(peer.recv().await.is_none());
        assert!(!peer.send(ServerMessage::Sync { records: vec![] }));
    }

    #[tokio::test]
    async fn peer_disconnect_ends_client_stream() {
        let (mut client, mut peer) = MemoryTransport::pair();
        peer.disconnect();
        assert!(client.recv().await.is_none());
    }
}
