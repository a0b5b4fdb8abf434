//! Client side of the presence channel.
//!
//! A [`PresenceChannel`] drives a [`Reconciler`] from frames received over a
//! [`ChannelTransport`]: it keeps the deduplicated connected-user list,
//! tracks this session once it is identified and evicts itself when a
//! matching moderation command arrives.

pub mod channel;
pub mod client;
pub mod reconciler;
pub mod reconnect;
pub mod session;
pub mod transport;

pub use channel::{ClientEvent, PresenceChannel};
pub use client::{RelayClient, RelayClientError};
pub use reconciler::{ChannelState, Eviction, Reconciler};
pub use session::SessionIdentity;
pub use transport::{ChannelTransport, MemoryPeer, MemoryTransport, WsTransport};
