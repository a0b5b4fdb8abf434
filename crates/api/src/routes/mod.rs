pub mod admin;
pub mod auth;
pub mod health;
pub mod moderation;
pub mod presence;
pub mod products;
pub mod settings;

use axum::routing::get;
use axum::Router;

use crate::state::AppState;
use crate::ws;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /ws                           presence channel (?token= optional)
///
/// /auth/login                   login (public)
/// /auth/me                      current identity (auth)
///
/// /presence/users               deduplicated connected users (admin)
/// /presence/records             raw presence records (admin)
///
/// /moderation/kick              kick a session or identity (super-admin)
/// /moderation/demote            demote a session or identity (super-admin)
///
/// /products                     list (auth), create (admin)
/// /products/{id}                get (auth), upsert, delete (admin)
///
/// /settings                     list public settings (admin)
/// /settings/pricing             get (auth), update (admin)
/// /settings/credentials         replace a role password (super-admin)
///
/// /admin/super-admins           list, add (super-admin)
/// /admin/super-admins/{id}      remove (super-admin)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/ws", get(ws::ws_handler))
        .nest("/auth", auth::router())
        .nest("/presence", presence::router())
        .nest("/moderation", moderation::router())
        .nest("/products", products::router())
        .nest("/settings", settings::router())
        .nest("/admin", admin::router())
}
