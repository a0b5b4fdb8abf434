//! Pricedesk change-event bus.
//!
//! - [`EventBus`] — in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`.
//! - [`ChangeEvent`] — "this table changed, re-fetch it". Handlers publish
//!   one after every successful write; the relay forwards them to every
//!   connected client.

pub mod bus;

pub use bus::{ChangeEvent, EventBus};
