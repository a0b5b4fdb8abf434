//! Handlers for the super-admin allow-list.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use pricedesk_core::error::CoreError;
use pricedesk_core::protocol::DataTable;
use pricedesk_core::types::DbId;
use pricedesk_db::models::super_admin::CreateSuperAdmin;
use pricedesk_db::repositories::SuperAdminRepo;
use pricedesk_events::ChangeEvent;

use crate::error::{AppError, AppResult};
use crate::middleware::rbac::RequireSuperAdmin;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/admin/super-admins
pub async fn list(
    RequireSuperAdmin(_admin): RequireSuperAdmin,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let entries = SuperAdminRepo::list(&state.pool).await?;
    Ok(Json(DataResponse { data: entries }))
}

/// POST /api/v1/admin/super-admins
///
/// Adding an identity that is already listed returns the existing entry.
/// Takes effect at that identity's next admin login.
pub async fn add(
    RequireSuperAdmin(admin): RequireSuperAdmin,
    State(state): State<AppState>,
    Json(input): Json<CreateSuperAdmin>,
) -> AppResult<impl IntoResponse> {
    if input.name.trim().is_empty() || input.last_name.trim().is_empty() {
        return Err(AppError::Core(CoreError::Validation(
            "name and last_name must not be empty".into(),
        )));
    }
    let entry = SuperAdminRepo::add(&state.pool, &input.name, &input.last_name).await?;

    tracing::info!(
        entry_id = entry.id,
        by = %admin.display_name(),
        "Super-admin allow-list entry added"
    );
    state
        .event_bus
        .publish(ChangeEvent::new(DataTable::Settings).with_actor(admin.display_name()));

    Ok((StatusCode::CREATED, Json(DataResponse { data: entry })))
}

/// DELETE /api/v1/admin/super-admins/{id}
///
/// Takes effect immediately: allow-list grants are re-checked per request.
pub async fn remove(
    RequireSuperAdmin(admin): RequireSuperAdmin,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    if !SuperAdminRepo::remove(&state.pool, id).await? {
        return Err(AppError::Core(CoreError::NotFound {
            entity: "SuperAdmin",
            id,
        }));
    }

    tracing::info!(entry_id = id, by = %admin.display_name(), "Super-admin allow-list entry removed");
    state
        .event_bus
        .publish(ChangeEvent::new(DataTable::Settings).with_actor(admin.display_name()));

    Ok(StatusCode::NO_CONTENT)
}
