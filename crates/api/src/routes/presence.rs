use axum::routing::get;
use axum::Router;

use crate::handlers::presence;
use crate::state::AppState;

/// Routes mounted at `/presence`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users", get(presence::list_users))
        .route("/records", get(presence::list_records))
}
