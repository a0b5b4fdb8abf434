//! Super-admin moderation over HTTP.
//!
//! Equivalent to sending a `moderation.send` frame on the channel, for
//! callers that are not attached.

use axum::extract::State;
use axum::Json;
use pricedesk_core::moderation::{ModerationCommand, ModerationKind, TargetSelector};
use serde::Serialize;

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::RequireSuperAdmin;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ModerationReceipt {
    pub kind: ModerationKind,
    /// Connections the command was queued for. Says nothing about whether
    /// any of them matched the target.
    pub delivered: usize,
}

/// POST /api/v1/moderation/kick
pub async fn kick(
    RequireSuperAdmin(user): RequireSuperAdmin,
    State(state): State<AppState>,
    Json(target): Json<TargetSelector>,
) -> AppResult<Json<DataResponse<ModerationReceipt>>> {
    issue(&state, &user, ModerationKind::Kick, target).await
}

/// POST /api/v1/moderation/demote
pub async fn demote(
    RequireSuperAdmin(user): RequireSuperAdmin,
    State(state): State<AppState>,
    Json(target): Json<TargetSelector>,
) -> AppResult<Json<DataResponse<ModerationReceipt>>> {
    issue(&state, &user, ModerationKind::Demote, target).await
}

async fn issue(
    state: &AppState,
    user: &AuthUser,
    kind: ModerationKind,
    target: TargetSelector,
) -> AppResult<Json<DataResponse<ModerationReceipt>>> {
    let command = ModerationCommand::new(kind, target).with_issuer(user.display_name());
    let delivered = state.relay.send_moderation(command).await?;
    Ok(Json(DataResponse {
        data: ModerationReceipt { kind, delivered },
    }))
}
