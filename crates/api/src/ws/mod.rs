//! The realtime presence channel.
//!
//! Provides connection and presence bookkeeping, the relay that fans out
//! presence, moderation and data-change frames, heartbeat monitoring, and the
//! HTTP upgrade handler.

mod handler;
mod heartbeat;
pub mod manager;
pub mod relay;

pub use handler::ws_handler;
pub use heartbeat::start_heartbeat;
pub use manager::WsManager;
pub use relay::Relay;
