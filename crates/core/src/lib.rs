//! Pricedesk domain types.
//!
//! Everything here is free of I/O so the server, the client library and
//! the repository layer can share the same roles, presence records,
//! moderation commands, relay protocol and pricing arithmetic.

pub mod catalog;
pub mod error;
pub mod identity;
pub mod moderation;
pub mod presence;
pub mod pricing;
pub mod protocol;
pub mod roles;
pub mod session;
pub mod types;
