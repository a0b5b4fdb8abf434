use std::sync::Arc;

use pricedesk_events::EventBus;

use crate::config::ServerConfig;
use crate::credentials::CredentialStore;
use crate::ws::{Relay, WsManager};

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: pricedesk_db::DbPool,
    pub config: Arc<ServerConfig>,
    /// Role password hashes and the current credential revision.
    pub credentials: Arc<CredentialStore>,
    /// Presence channel connections.
    pub ws_manager: Arc<WsManager>,
    /// Fan-out of presence, moderation and data-change frames.
    pub relay: Arc<Relay>,
    /// In-process table change notifications.
    pub event_bus: Arc<EventBus>,
}

impl AppState {
    /// Wire up a fresh relay and event bus around the given pool.
    ///
    /// The relay's event-bus forwarder is not started; spawn
    /// [`Relay::run`] with [`EventBus::subscribe`] to enable it.
    pub fn new(
        pool: pricedesk_db::DbPool,
        config: ServerConfig,
        credentials: CredentialStore,
    ) -> Self {
        let ws_manager = Arc::new(WsManager::new());
        let relay = Arc::new(Relay::new(Arc::clone(&ws_manager)));
        Self {
            pool,
            config: Arc::new(config),
            credentials: Arc::new(credentials),
            ws_manager,
            relay,
            event_bus: Arc::new(EventBus::default()),
        }
    }
}
