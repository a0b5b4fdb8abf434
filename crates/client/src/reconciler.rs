//! Client-side presence state machine.
//!
//! ```text
//! Disconnected -> Attaching -> Attached(unidentified) -> Attached(identified)
//!      ^                                |                        |
//!      +------ eviction / logout / detach ----------------------+
//! ```
//!
//! The reconciler does no I/O. Transitions that require a frame to be sent
//! return the payload for the caller to deliver.

use std::fmt;

use chrono::Utc;
use pricedesk_core::identity::Identity;
use pricedesk_core::moderation::{ModerationCommand, ModerationKind};
use pricedesk_core::presence::{dedup_connected_users, ConnectedUser, PresenceRecord, TrackPresence};
use pricedesk_core::types::Timestamp;

use crate::session::SessionIdentity;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Disconnected,
    Attaching,
    Attached { identified: bool },
}

impl fmt::Display for ChannelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelState::Disconnected => f.write_str("disconnected"),
            ChannelState::Attaching => f.write_str("attaching"),
            ChannelState::Attached { identified: false } => f.write_str("attached(unidentified)"),
            ChannelState::Attached { identified: true } => f.write_str("attached(identified)"),
        }
    }
}

/// Outcome of a moderation command addressed to this session.
#[derive(Debug, Clone, PartialEq)]
pub struct Eviction {
    pub kind: ModerationKind,
    pub issued_by: Option<String>,
    /// Identity that was cached when the command arrived.
    pub cleared_identity: Option<Identity>,
}

#[derive(Debug)]
pub struct Reconciler {
    session: SessionIdentity,
    state: ChannelState,
    connection_key: Option<String>,
    attached_at: Option<Timestamp>,
    records: Vec<PresenceRecord>,
}

impl Reconciler {
    pub fn new(session: SessionIdentity) -> Self {
        Self {
            session,
            state: ChannelState::Disconnected,
            connection_key: None,
            attached_at: None,
            records: Vec::new(),
        }
    }

    pub fn state(&self) -> ChannelState {
        self.state
    }

    pub fn session(&self) -> &SessionIdentity {
        &self.session
    }

    pub fn connection_key(&self) -> Option<&str> {
        self.connection_key.as_deref()
    }

    /// `Disconnected -> Attaching`. Returns `false` from any other state.
    pub fn start(&mut self) -> bool {
        if self.state != ChannelState::Disconnected {
            return false;
        }
        self.state = ChannelState::Attaching;
        true
    }

    /// The channel acknowledged the subscription.
    ///
    /// Returns the track payload when an identity was remembered before
    /// the attachment completed.
    pub fn attached(&mut self, connection_key: impl Into<String>) -> Option<TrackPresence> {
        if self.state != ChannelState::Attaching {
            tracing::debug!(state = %self.state, "Attach acknowledgement outside of Attaching");
        }
        self.connection_key = Some(connection_key.into());
        self.attached_at = Some(Utc::now());
        self.state = ChannelState::Attached {
            identified: self.session.is_identified(),
        };
        self.track_payload()
    }

    /// Record who is logged in.
    ///
    /// Returns the track payload when attached. Otherwise the identity is
    /// remembered and tracked on the next [`attached`](Self::attached).
    pub fn identify(&mut self, identity: Identity) -> Option<TrackPresence> {
        self.session.set_identity(identity);
        match self.state {
            ChannelState::Attached { .. } => {
                self.state = ChannelState::Attached { identified: true };
                self.track_payload()
            }
            ChannelState::Disconnected | ChannelState::Attaching => None,
        }
    }

    /// Build this session's presence record from the cached identity.
    pub fn track_payload(&self) -> Option<TrackPresence> {
        let identity = self.session.identity()?;
        let now = Utc::now();
        Some(TrackPresence {
            session_token: self.session.token().clone(),
            role: identity.role,
            name: identity.name.clone(),
            last_name: identity.last_name.clone(),
            connected_at: self.attached_at.unwrap_or(now),
            last_activity: now,
        })
    }

    /// Replace the known record set with a full snapshot and return the
    /// re-derived user list.
    pub fn on_sync(&mut self, records: Vec<PresenceRecord>) -> Vec<ConnectedUser> {
        self.records = records;
        self.connected_users()
    }

    pub fn connected_users(&self) -> Vec<ConnectedUser> {
        dedup_connected_users(&self.records)
    }

    /// Raw records from the last snapshot, in delivery order.
    pub fn records(&self) -> &[PresenceRecord] {
        &self.records
    }

    /// Apply a moderation command.
    ///
    /// A command addressed to this session clears the cached identity and
    /// drops to `Disconnected`. Anything else is a silent no-op.
    pub fn on_moderation(&mut self, command: &ModerationCommand) -> Option<Eviction> {
        if !matches!(self.state, ChannelState::Attached { .. }) {
            return None;
        }
        if !command.matches(self.session.token(), self.session.identity()) {
            return None;
        }
        let cleared_identity = self.session.clear_identity();
        tracing::info!(
            kind = %command.kind.as_str(),
            issued_by = ?command.issued_by,
            "Session evicted by moderation command",
        );
        self.reset();
        Some(Eviction {
            kind: command.kind,
            issued_by: command.issued_by.clone(),
            cleared_identity,
        })
    }

    /// Explicit logout. Returns `true` if a presence record was tracked
    /// and must be withdrawn.
    pub fn logout(&mut self) -> bool {
        let was_tracked = self.state == ChannelState::Attached { identified: true };
        self.session.clear_identity();
        self.reset();
        was_tracked
    }

    /// The transport went away. The identity is kept so the next
    /// attachment re-tracks it.
    pub fn detached(&mut self) {
        self.reset();
    }

    fn reset(&mut self) {
        self.state = ChannelState::Disconnected;
        self.connection_key = None;
        self.attached_at = None;
        self.records.clear();
    }
}
