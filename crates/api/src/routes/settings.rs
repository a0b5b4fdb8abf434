use axum::routing::{get, put};
use axum::Router;

use crate::handlers::settings;
use crate::state::AppState;

/// Routes mounted at `/settings`.
///
/// ```text
/// GET /               -> list
/// GET /pricing        -> get_pricing
/// PUT /pricing        -> update_pricing
/// PUT /credentials    -> update_credential
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(settings::list))
        .route(
            "/pricing",
            get(settings::get_pricing).put(settings::update_pricing),
        )
        .route("/credentials", put(settings::update_credential))
}
