//! Presence channel handle.
//!
//! [`PresenceChannel::attach`] spawns a driver task that owns the transport.
//! The driver applies every inbound frame to the shared [`Reconciler`] in
//! arrival order and publishes a [`ClientEvent`] for each observable change.
//! Outbound frames are queued to the driver so sends never race reads.

use std::sync::Arc;

use pricedesk_core::identity::Identity;
use pricedesk_core::moderation::{ModerationCommand, ModerationKind, TargetSelector};
use pricedesk_core::presence::ConnectedUser;
use pricedesk_core::protocol::{ClientMessage, DataTable, ServerMessage};
use pricedesk_core::types::Timestamp;
use tokio::sync::{broadcast, mpsc, oneshot, RwLock};
use tokio::task::JoinHandle;

use crate::client::RelayClientError;
use crate::reconciler::{ChannelState, Eviction, Reconciler};
use crate::session::SessionIdentity;
use crate::transport::ChannelTransport;

const EVENT_CAPACITY: usize = 64;

/// Observable changes on a channel.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    /// A new snapshot arrived; carries the deduplicated user list.
    Synced(Vec<ConnectedUser>),
    /// This session was kicked. The channel closes right after.
    Kicked(Eviction),
    /// This session was demoted. The channel closes right after.
    Demoted(Eviction),
    /// Re-read `table`.
    DataChanged {
        table: DataTable,
        changed_at: Timestamp,
    },
    /// The relay refused one of our frames.
    Rejected { code: String, message: String },
    /// The channel is gone and the reconciler is `Disconnected`.
    Closed,
}

enum Outbound {
    Frame {
        message: ClientMessage,
        ack: Option<oneshot::Sender<Result<(), RelayClientError>>>,
    },
    Close,
}

pub struct PresenceChannel {
    reconciler: Arc<RwLock<Reconciler>>,
    outbound: mpsc::UnboundedSender<Outbound>,
    events: broadcast::Sender<ClientEvent>,
    task: JoinHandle<()>,
}

impl PresenceChannel {
    /// Start attaching over `transport`.
    ///
    /// If `session` already carries an identity it is tracked as soon as
    /// the relay acknowledges the attachment.
    pub fn attach<T: ChannelTransport>(transport: T, session: SessionIdentity) -> Self {
        let mut reconciler = Reconciler::new(session);
        reconciler.start();
        let reconciler = Arc::new(RwLock::new(reconciler));

        let (outbound, queue) = mpsc::unbounded_channel();
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        let driver = Driver {
            transport,
            reconciler: Arc::clone(&reconciler),
            queue,
            events: events.clone(),
        };
        let task = tokio::spawn(driver.run());

        Self {
            reconciler,
            outbound,
            events,
            task,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ClientEvent> {
        self.events.subscribe()
    }

    pub async fn state(&self) -> ChannelState {
        self.reconciler.read().await.state()
    }

    /// A copy of the current session (token plus cached identity).
    pub async fn session(&self) -> SessionIdentity {
        self.reconciler.read().await.session().clone()
    }

    /// Deduplicated users from the last snapshot.
    pub async fn connected_users(&self) -> Vec<ConnectedUser> {
        self.reconciler.read().await.connected_users()
    }

    /// Record the logged-in identity and track it once attached.
    ///
    /// Never fails: a track that cannot be delivered is logged and retried
    /// on the next attachment.
    pub async fn identify_user(&self, identity: Identity) {
        let track = self.reconciler.write().await.identify(identity);
        if let Some(record) = track {
            self.enqueue(ClientMessage::Track { record });
        }
    }

    /// Withdraw presence, clear the identity and close the channel.
    pub async fn logout(&self) {
        if self.reconciler.write().await.logout() {
            self.enqueue(ClientMessage::Untrack);
        }
        let _ = self.outbound.send(Outbound::Close);
    }

    pub async fn kick_user(&self, target: TargetSelector) -> Result<(), RelayClientError> {
        self.send_moderation(ModerationKind::Kick, target).await
    }

    pub async fn demote_admin(&self, target: TargetSelector) -> Result<(), RelayClientError> {
        self.send_moderation(ModerationKind::Demote, target).await
    }

    /// Ask peers to re-read `table`.
    pub async fn send_data_change(&self, table: DataTable) -> Result<(), RelayClientError> {
        self.ensure_attached().await?;
        self.send_acked(ClientMessage::DataChange { table }).await
    }

    /// Close the channel and wait for the driver to finish.
    ///
    /// Returns the session so a later attachment keeps the same token.
    pub async fn detach(self) -> SessionIdentity {
        let _ = self.outbound.send(Outbound::Close);
        if let Err(e) = self.task.await {
            tracing::warn!(error = %e, "Presence channel driver ended abnormally");
        }
        self.reconciler.read().await.session().clone()
    }

    /// `true` once the driver has stopped.
    pub fn is_closed(&self) -> bool {
        self.task.is_finished()
    }

    async fn send_moderation(
        &self,
        kind: ModerationKind,
        target: TargetSelector,
    ) -> Result<(), RelayClientError> {
        target.validate().map_err(RelayClientError::InvalidTarget)?;
        self.ensure_attached().await?;
        let command = ModerationCommand::new(kind, target);
        self.send_acked(ClientMessage::Moderation { command }).await
    }

    async fn ensure_attached(&self) -> Result<(), RelayClientError> {
        match self.state().await {
            ChannelState::Attached { .. } => Ok(()),
            state => Err(RelayClientError::TransportUnavailable(format!(
                "Channel is {state}"
            ))),
        }
    }

    fn enqueue(&self, message: ClientMessage) {
        if self
            .outbound
            .send(Outbound::Frame { message, ack: None })
            .is_err()
        {
            tracing::debug!("Presence channel closed, frame dropped");
        }
    }

    async fn send_acked(&self, message: ClientMessage) -> Result<(), RelayClientError> {
        let closed = || RelayClientError::TransportUnavailable("Channel closed".to_string());
        let (ack, done) = oneshot::channel();
        self.outbound
            .send(Outbound::Frame {
                message,
                ack: Some(ack),
            })
            .map_err(|_| closed())?;
        done.await.map_err(|_| closed())?
    }
}

// ---------------------------------------------------------------------------
// Driver
// ---------------------------------------------------------------------------

struct Driver<T> {
    transport: T,
    reconciler: Arc<RwLock<Reconciler>>,
    queue: mpsc::UnboundedReceiver<Outbound>,
    events: broadcast::Sender<ClientEvent>,
}

impl<T: ChannelTransport> Driver<T> {
    async fn run(mut self) {
        loop {
            tokio::select! {
                outbound = self.queue.recv() => match outbound {
                    Some(Outbound::Frame { message, ack }) => self.deliver(message, ack).await,
                    Some(Outbound::Close) | None => break,
                },
                frame = self.transport.recv() => match frame {
                    Some(Ok(message)) => {
                        if !self.handle(message).await {
                            break;
                        }
                    }
                    Some(Err(RelayClientError::Protocol(e))) => {
                        tracing::warn!(error = %e, "Ignoring undecodable relay frame");
                    }
                    Some(Err(e)) => {
                        tracing::info!(error = %e, "Presence channel transport failed");
                        break;
                    }
                    None => {
                        tracing::info!("Relay closed the presence channel");
                        break;
                    }
                },
            }
        }

        if let Err(e) = self.transport.close().await {
            tracing::debug!(error = %e, "Error while closing transport");
        }
        self.reconciler.write().await.detached();
        self.emit(ClientEvent::Closed);
    }

    async fn deliver(
        &mut self,
        message: ClientMessage,
        ack: Option<oneshot::Sender<Result<(), RelayClientError>>>,
    ) {
        let result = self.transport.send(&message).await;
        match ack {
            Some(ack) => {
                let _ = ack.send(result);
            }
            None => {
                if let Err(e) = result {
                    tracing::debug!(error = %e, "Failed to deliver presence frame");
                }
            }
        }
    }

    /// Apply one relay frame. Returns `false` when the channel must close.
    async fn handle(&mut self, message: ServerMessage) -> bool {
        match message {
            ServerMessage::Attached { connection_key } => {
                tracing::info!(connection_key = %connection_key, "Presence channel attached");
                let track = self.reconciler.write().await.attached(connection_key);
                if let Some(record) = track {
                    self.deliver(ClientMessage::Track { record }, None).await;
                }
            }
            ServerMessage::Sync { records } => {
                let users = self.reconciler.write().await.on_sync(records);
                self.emit(ClientEvent::Synced(users));
            }
            ServerMessage::Moderation { command } => {
                let eviction = self.reconciler.write().await.on_moderation(&command);
                if let Some(eviction) = eviction {
                    self.deliver(ClientMessage::Untrack, None).await;
                    self.emit(match eviction.kind {
                        ModerationKind::Kick => ClientEvent::Kicked(eviction),
                        ModerationKind::Demote => ClientEvent::Demoted(eviction),
                    });
                    return false;
                }
            }
            ServerMessage::DataChanged { table, changed_at } => {
                self.emit(ClientEvent::DataChanged { table, changed_at });
            }
            ServerMessage::Error { code, message } => {
                tracing::warn!(code = %code, message = %message, "Relay rejected a frame");
                self.emit(ClientEvent::Rejected { code, message });
            }
        }
        true
    }

    fn emit(&self, event: ClientEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use assert_matches::assert_matches;
    use chrono::Utc;
    use pricedesk_core::presence::PresenceRecord;
    use pricedesk_core::roles::Role;
    use pricedesk_core::session::SessionToken;

    use super::*;
    use crate::transport::{MemoryPeer, MemoryTransport};

    async fn next_event(rx: &mut broadcast::Receiver<ClientEvent>) -> ClientEvent {
        tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("event should arrive")
            .expect("event channel open")
    }

    async fn next_frame(peer: &mut MemoryPeer) -> ClientMessage {
        tokio::time::timeout(Duration::from_secs(2), peer.recv())
            .await
            .expect("frame should arrive")
            .expect("client end open")
    }

    fn record(key: &str, token: &str, name: &str, last_name: &str, role: Role) -> PresenceRecord {
        let now = Utc::now();
        PresenceRecord {
            connection_key: key.to_string(),
            session_token: SessionToken::from(token),
            role,
            name: Some(name.to_string()),
            last_name: Some(last_name.to_string()),
            connected_at: now,
            last_activity: now,
        }
    }

    fn session(token: &str) -> SessionIdentity {
        SessionIdentity::with_token(SessionToken::from(token))
    }

    /// Attach and complete the handshake. Returns once the client is attached.
    async fn attached(session: SessionIdentity) -> (PresenceChannel, MemoryPeer, broadcast::Receiver<ClientEvent>) {
        let (transport, peer) = MemoryTransport::pair();
        let channel = PresenceChannel::attach(transport, session);
        let mut rx = channel.subscribe();
        assert_eq!(channel.state().await, ChannelState::Attaching);

        peer.send(ServerMessage::Attached { connection_key: "conn-1".into() });
        peer.send(ServerMessage::Sync { records: vec![] });
        assert_matches!(next_event(&mut rx).await, ClientEvent::Synced(users) => assert!(users.is_empty()));
        (channel, peer, rx)
    }

    #[tokio::test]
    async fn identify_after_attach_sends_track() {
        let (channel, mut peer, _rx) = attached(session("tab-1")).await;
        assert_eq!(channel.state().await, ChannelState::Attached { identified: false });

        channel
            .identify_user(Identity::new("Luis", "Gómez", Role::Worker))
            .await;

        assert_matches!(next_frame(&mut peer).await, ClientMessage::Track { record } => {
            assert_eq!(record.session_token.as_str(), "tab-1");
            assert_eq!(record.name.as_deref(), Some("Luis"));
        });
        assert_eq!(channel.state().await, ChannelState::Attached { identified: true });
    }

    #[tokio::test]
    async fn remembered_identity_is_tracked_on_attach() {
        let mut s = session("tab-2");
        s.set_identity(Identity::new("Ana", "Pérez", Role::Admin));
        let (transport, mut peer) = MemoryTransport::pair();
        let _channel = PresenceChannel::attach(transport, s);

        peer.send(ServerMessage::Attached { connection_key: "conn-2".into() });
        assert_matches!(next_frame(&mut peer).await, ClientMessage::Track { record } => {
            assert_eq!(record.role, Role::Admin);
        });
    }

    #[tokio::test]
    async fn sync_publishes_deduplicated_users() {
        let (channel, peer, mut rx) = attached(session("tab-3")).await;

        peer.send(ServerMessage::Sync {
            records: vec![
                record("c1", "t1", "Luis", "Gómez", Role::Worker),
                record("c2", "t2", "Luis", "Gómez", Role::Worker),
            ],
        });
        assert_matches!(next_event(&mut rx).await, ClientEvent::Synced(users) => assert_eq!(users.len(), 1));
        assert_eq!(channel.connected_users().await.len(), 1);
    }

    #[tokio::test]
    async fn matching_kick_evicts_and_closes() {
        let (channel, mut peer, mut rx) = attached(session("tab-4")).await;
        channel
            .identify_user(Identity::new("Luis", "Gómez", Role::Worker))
            .await;
        assert_matches!(next_frame(&mut peer).await, ClientMessage::Track { .. });

        let command = ModerationCommand::new(
            ModerationKind::Kick,
            TargetSelector::identity("luis", "gómez", Role::Worker),
        );
        peer.send(ServerMessage::Moderation { command });

        assert_matches!(next_event(&mut rx).await, ClientEvent::Kicked(e) => {
            assert!(e.cleared_identity.is_some());
        });
        assert_matches!(next_event(&mut rx).await, ClientEvent::Closed);
        assert_matches!(next_frame(&mut peer).await, ClientMessage::Untrack);

        assert_eq!(channel.state().await, ChannelState::Disconnected);
        assert!(!channel.session().await.is_identified());
    }

    #[tokio::test]
    async fn command_for_someone_else_is_ignored() {
        let (channel, peer, mut rx) = attached(session("tab-5")).await;
        channel
            .identify_user(Identity::new("Ana", "Pérez", Role::Admin))
            .await;

        peer.send(ServerMessage::Moderation {
            command: ModerationCommand::new(
                ModerationKind::Demote,
                TargetSelector::session(SessionToken::from("other-tab")),
            ),
        });
        peer.send(ServerMessage::DataChanged {
            table: DataTable::Products,
            changed_at: Utc::now(),
        });

        assert_matches!(next_event(&mut rx).await, ClientEvent::DataChanged { table, .. } => {
            assert_eq!(table, DataTable::Products);
        });
        assert_eq!(channel.state().await, ChannelState::Attached { identified: true });
    }

    #[tokio::test]
    async fn moderation_send_requires_a_valid_target() {
        let (channel, _peer, _rx) = attached(session("tab-6")).await;
        let result = channel.kick_user(TargetSelector::default()).await;
        assert_matches!(result, Err(RelayClientError::InvalidTarget(_)));
    }

    #[tokio::test]
    async fn moderation_is_forwarded_and_rejection_surfaces() {
        let (channel, mut peer, mut rx) = attached(session("tab-7")).await;

        channel
            .demote_admin(TargetSelector::identity("Ana", "Pérez", Role::Admin))
            .await
            .unwrap();
        assert_matches!(next_frame(&mut peer).await, ClientMessage::Moderation { command } => {
            assert_eq!(command.kind, ModerationKind::Demote);
        });

        peer.send(ServerMessage::error("FORBIDDEN", "Super-admin rights required"));
        assert_matches!(next_event(&mut rx).await, ClientEvent::Rejected { code, .. } => {
            assert_eq!(code, "FORBIDDEN");
        });
    }

    #[tokio::test]
    async fn sends_fail_once_the_relay_is_gone() {
        let (channel, mut peer, mut rx) = attached(session("tab-8")).await;
        peer.disconnect();

        assert_matches!(next_event(&mut rx).await, ClientEvent::Closed);
        assert_eq!(channel.state().await, ChannelState::Disconnected);
        assert_matches!(
            channel.send_data_change(DataTable::Settings).await,
            Err(RelayClientError::TransportUnavailable(_))
        );
    }

    #[tokio::test]
    async fn logout_untracks_and_closes() {
        let (channel, mut peer, mut rx) = attached(session("tab-9")).await;
        channel
            .identify_user(Identity::new("Luis", "Gómez", Role::Worker))
            .await;
        assert_matches!(next_frame(&mut peer).await, ClientMessage::Track { .. });

        channel.logout().await;
        assert_matches!(next_frame(&mut peer).await, ClientMessage::Untrack);
        assert_matches!(next_event(&mut rx).await, ClientEvent::Closed);
        assert!(!channel.session().await.is_identified());
    }

    #[tokio::test]
    async fn detach_returns_session_with_same_token() {
        let (channel, _peer, _rx) = attached(session("tab-10")).await;
        channel
            .identify_user(Identity::new("Luis", "Gómez", Role::Worker))
            .await;

        let session = channel.detach().await;
        assert_eq!(session.token().as_str(), "tab-10");
        assert!(session.is_identified());
    }
}
