//! Relay WebSocket message protocol.
//!
//! JSON text frames with an internally-tagged `"type"` discriminator so the
//! browser can route messages by type string. Presence, moderation and
//! data-change traffic share one channel.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::moderation::ModerationCommand;
use crate::presence::{PresenceRecord, TrackPresence};
use crate::types::Timestamp;

/// Tables whose mutations are announced on the channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataTable {
    Products,
    Settings,
}

impl DataTable {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataTable::Products => "products",
            DataTable::Settings => "settings",
        }
    }
}

impl fmt::Display for DataTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Frames sent by a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    /// Publish or replace this attachment's presence record.
    #[serde(rename = "presence.track")]
    Track { record: TrackPresence },

    /// Withdraw this attachment's presence record (logout).
    #[serde(rename = "presence.untrack")]
    Untrack,

    /// Ask the relay to fan out a moderation command.
    #[serde(rename = "moderation.send")]
    Moderation { command: ModerationCommand },

    /// Announce that a table changed and peers should re-fetch it.
    #[serde(rename = "data.change")]
    DataChange { table: DataTable },
}

/// Frames sent by the relay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    /// First frame after upgrade; carries the server-assigned key.
    #[serde(rename = "channel.attached")]
    Attached { connection_key: String },

    /// Full presence snapshot, in attach order.
    #[serde(rename = "presence.sync")]
    Sync { records: Vec<PresenceRecord> },

    #[serde(rename = "moderation.command")]
    Moderation { command: ModerationCommand },

    /// Cache-invalidation signal. Carries no diff.
    #[serde(rename = "data.changed")]
    DataChanged {
        table: DataTable,
        changed_at: Timestamp,
    },

    /// A client frame was rejected. The socket stays open.
    #[serde(rename = "error")]
    Error { code: String, message: String },
}

/// Error codes carried by [`ServerMessage::Error`].
pub mod error_codes {
    pub const BAD_REQUEST: &str = "BAD_REQUEST";
    pub const UNAUTHORIZED: &str = "UNAUTHORIZED";
    pub const FORBIDDEN: &str = "FORBIDDEN";
}

impl ServerMessage {
    pub fn error(code: &str, message: impl Into<String>) -> Self {
        ServerMessage::Error {
            code: code.to_string(),
            message: message.into(),
        }
    }
}

pub fn parse_client_message(text: &str) -> Result<ClientMessage, serde_json::Error> {
    serde_json::from_str(text)
}

pub fn parse_server_message(text: &str) -> Result<ServerMessage, serde_json::Error> {
    serde_json::from_str(text)
}
