//! Presence records and connected-user deduplication.
//!
//! The channel delivers the full set of [`PresenceRecord`]s on every
//! membership change. Consumers re-derive the connected-user list from
//! scratch with [`dedup_connected_users`] instead of merging deltas.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::identity::{dedup_key, Identity};
use crate::roles::Role;
use crate::session::SessionToken;
use crate::types::Timestamp;

/// Presence entries silent for longer than this many seconds are evicted.
pub const PRESENCE_STALE_TIMEOUT_SECS: u64 = 90;

/// One record per channel attachment.
///
/// `connection_key` is assigned by the server per attachment and is not
/// stable across reconnects. Timestamps are client-set and unverified.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresenceRecord {
    pub connection_key: String,
    pub session_token: SessionToken,
    pub role: Role,
    pub name: Option<String>,
    pub last_name: Option<String>,
    pub connected_at: Timestamp,
    pub last_activity: Timestamp,
}

impl PresenceRecord {
    pub fn dedup_key(&self) -> String {
        dedup_key(self.name.as_deref(), self.last_name.as_deref(), self.role)
    }

    pub fn identity(&self) -> Identity {
        Identity {
            name: self.name.clone(),
            last_name: self.last_name.clone(),
            role: self.role,
        }
    }
}

/// Payload a client publishes for its own attachment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackPresence {
    pub session_token: SessionToken,
    pub role: Role,
    pub name: Option<String>,
    pub last_name: Option<String>,
    pub connected_at: Timestamp,
    pub last_activity: Timestamp,
}

impl TrackPresence {
    /// Attach the server-assigned connection key.
    pub fn into_record(self, connection_key: impl Into<String>) -> PresenceRecord {
        PresenceRecord {
            connection_key: connection_key.into(),
            session_token: self.session_token,
            role: self.role,
            name: self.name,
            last_name: self.last_name,
            connected_at: self.connected_at,
            last_activity: self.last_activity,
        }
    }
}

/// A deduplicated entry of the connected-user list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectedUser {
    pub name: Option<String>,
    pub last_name: Option<String>,
    pub role: Role,
    pub connected_at: Timestamp,
}

impl From<&PresenceRecord> for ConnectedUser {
    fn from(record: &PresenceRecord) -> Self {
        Self {
            name: record.name.clone(),
            last_name: record.last_name.clone(),
            role: record.role,
            connected_at: record.connected_at,
        }
    }
}

/// Collapse a snapshot to one entry per dedup key.
///
/// Iterates in delivery order and keeps the first record seen for each key.
/// Which duplicate wins therefore depends on the transport's ordering, not
/// on `connected_at`.
pub fn dedup_connected_users(records: &[PresenceRecord]) -> Vec<ConnectedUser> {
    let mut by_key: IndexMap<String, &PresenceRecord> = IndexMap::with_capacity(records.len());
    for record in records {
        by_key.entry(record.dedup_key()).or_insert(record);
    }
    by_key.into_values().map(ConnectedUser::from).collect()
}
