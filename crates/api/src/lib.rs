//! pricedesk API server library.
//!
//! Exposes the building blocks (config, state, credentials, error handling,
//! routes, the presence channel) so integration tests and the binary
//! entrypoint can both access them.

pub mod auth;
pub mod config;
pub mod credentials;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod response;
pub mod router;
pub mod routes;
pub mod state;
pub mod ws;
