//! WebSocket client for the relay endpoint.
//!
//! [`RelayClient`] holds the endpoint URL and the optional access token.
//! Call [`RelayClient::connect`] to open a [`WsTransport`], then hand it to
//! [`PresenceChannel::attach`](crate::PresenceChannel::attach).

use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::http::StatusCode;
use tokio_tungstenite::tungstenite::Error as WsError;

use crate::transport::WsTransport;

/// Connection settings for one relay endpoint.
#[derive(Debug, Clone)]
pub struct RelayClient {
    ws_url: String,
    access_token: Option<String>,
}

impl RelayClient {
    /// `ws_url` is the full endpoint, e.g. `ws://host:3000/api/v1/ws`.
    pub fn new(ws_url: impl Into<String>) -> Self {
        Self {
            ws_url: ws_url.into(),
            access_token: None,
        }
    }

    /// Attach with a login token. Without one the connection can observe
    /// and track presence but the relay refuses moderation and data-change
    /// frames.
    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    pub fn ws_url(&self) -> &str {
        &self.ws_url
    }

    fn endpoint(&self) -> String {
        match &self.access_token {
            Some(token) => format!("{}?token={}", self.ws_url, token),
            None => self.ws_url.clone(),
        }
    }

    /// Open the WebSocket.
    pub async fn connect(&self) -> Result<WsTransport, RelayClientError> {
        let (stream, _response) = connect_async(self.endpoint()).await.map_err(|e| match e {
            WsError::Http(response) if response.status() == StatusCode::UNAUTHORIZED => {
                RelayClientError::Unauthorized
            }
            other => RelayClientError::TransportUnavailable(format!(
                "Failed to connect to relay at {}: {other}",
                self.ws_url
            )),
        })?;

        tracing::info!(
            url = %self.ws_url,
            authenticated = self.access_token.is_some(),
            "Connected to relay",
        );

        Ok(WsTransport::new(stream))
    }
}

/// Errors surfaced by the client library.
#[derive(Debug, thiserror::Error)]
pub enum RelayClientError {
    /// The channel could not be reached or has gone away.
    #[error("Transport unavailable: {0}")]
    TransportUnavailable(String),

    /// The relay refused the access token (invalid, expired or stale).
    #[error("Access token rejected by relay")]
    Unauthorized,

    /// A frame could not be encoded or decoded.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// A moderation target without a session token or full identity.
    #[error("Invalid target: {0}")]
    InvalidTarget(String),
}
