//! Read-only views of the presence channel for admin screens.

use axum::extract::State;
use axum::Json;
use pricedesk_core::presence::{ConnectedUser, PresenceRecord};

use crate::middleware::rbac::RequireAdmin;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/presence/users
///
/// One entry per `(name, last_name, role)`, however many tabs are open.
pub async fn list_users(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
) -> Json<DataResponse<Vec<ConnectedUser>>> {
    Json(DataResponse {
        data: state.relay.connected_users().await,
    })
}

/// GET /api/v1/presence/records
///
/// Raw records, one per tracking connection. Carries session tokens, which
/// are what targeted moderation needs.
pub async fn list_records(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
) -> Json<DataResponse<Vec<PresenceRecord>>> {
    Json(DataResponse {
        data: state.ws_manager.snapshot().await,
    })
}
