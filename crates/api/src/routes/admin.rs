use axum::routing::{delete, get};
use axum::Router;

use crate::handlers::super_admins;
use crate::state::AppState;

/// Routes mounted at `/admin`.
///
/// ```text
/// GET    /super-admins         -> list
/// POST   /super-admins         -> add
/// DELETE /super-admins/{id}    -> remove
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/super-admins",
            get(super_admins::list).post(super_admins::add),
        )
        .route("/super-admins/{id}", delete(super_admins::remove))
}
