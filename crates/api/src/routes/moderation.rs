use axum::routing::post;
use axum::Router;

use crate::handlers::moderation;
use crate::state::AppState;

/// Routes mounted at `/moderation`.
///
/// ```text
/// POST /kick     -> kick (super-admin)
/// POST /demote   -> demote (super-admin)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/kick", post(moderation::kick))
        .route("/demote", post(moderation::demote))
}
