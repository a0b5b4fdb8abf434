//! Handlers for global settings: pricing defaults and role credentials.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use pricedesk_core::error::CoreError;
use pricedesk_core::pricing::{plan_default_change, AdjustmentPolicy, PricingDefaults};
use pricedesk_core::protocol::DataTable;
use pricedesk_db::repositories::{ProductRepo, SettingRepo};
use pricedesk_events::ChangeEvent;
use serde::{Deserialize, Serialize};

use crate::auth::password::{hash_password, validate_password_strength, MIN_CREDENTIAL_LENGTH};
use crate::credentials::CredentialKind;
use crate::error::{AppError, AppResult};
use crate::middleware::rbac::{RequireAdmin, RequireAuth, RequireSuperAdmin};
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct PricingView {
    #[serde(flatten)]
    pub defaults: PricingDefaults,
    /// Server-wide policy applied when the default adjustment changes.
    pub adjustment_policy: AdjustmentPolicy,
}

#[derive(Debug, Serialize)]
pub struct PricingUpdate {
    #[serde(flatten)]
    pub pricing: PricingView,
    /// Products whose adjustment was pinned to the previous default.
    pub pinned_products: u64,
}

#[derive(Debug, Deserialize)]
pub struct UpdateCredentialRequest {
    pub kind: CredentialKind,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct CredentialUpdate {
    pub kind: CredentialKind,
    /// New credential revision. Every previously issued token is now stale.
    pub revision: i64,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /api/v1/settings
///
/// All settings rows except credential hashes.
pub async fn list(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let settings = SettingRepo::list_public(&state.pool).await?;
    Ok(Json(DataResponse { data: settings }))
}

/// GET /api/v1/settings/pricing
pub async fn get_pricing(
    RequireAuth(_user): RequireAuth,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let defaults = SettingRepo::pricing_defaults(&state.pool).await?;
    Ok(Json(DataResponse {
        data: PricingView {
            defaults,
            adjustment_policy: state.config.adjustment_policy,
        },
    }))
}

/// PUT /api/v1/settings/pricing
///
/// Under the `snapshot` policy, products that inherit the default adjustment
/// are first pinned to the old default so their prices do not move.
pub async fn update_pricing(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Json(input): Json<PricingDefaults>,
) -> AppResult<impl IntoResponse> {
    input
        .validate()
        .map_err(|msg| AppError::Core(CoreError::Validation(msg)))?;

    let policy = state.config.adjustment_policy;
    let current = SettingRepo::pricing_defaults(&state.pool).await?;
    let pins = plan_default_change(
        &ProductRepo::list_adjustments(&state.pool).await?,
        current.default_adjustment_percent,
        input.default_adjustment_percent,
        policy,
    );
    let pinned_products = ProductRepo::pin_adjustments(&state.pool, &pins).await?;
    SettingRepo::set_pricing_defaults(&state.pool, &input).await?;

    tracing::info!(
        by = %admin.display_name(),
        policy = %policy,
        pinned_products,
        "Pricing defaults updated"
    );
    state
        .event_bus
        .publish(ChangeEvent::new(DataTable::Settings).with_actor(admin.display_name()));
    if pinned_products > 0 {
        state
            .event_bus
            .publish(ChangeEvent::new(DataTable::Products).with_actor(admin.display_name()));
    }

    Ok(Json(DataResponse {
        data: PricingUpdate {
            pricing: PricingView {
                defaults: input,
                adjustment_policy: policy,
            },
            pinned_products,
        },
    }))
}

/// PUT /api/v1/settings/credentials
///
/// Replace one role password. Bumps the credential revision and reloads the
/// in-memory store, so every outstanding token (the caller's included) must
/// log in again.
pub async fn update_credential(
    RequireSuperAdmin(admin): RequireSuperAdmin,
    State(state): State<AppState>,
    Json(input): Json<UpdateCredentialRequest>,
) -> AppResult<impl IntoResponse> {
    validate_password_strength(&input.password, MIN_CREDENTIAL_LENGTH)
        .map_err(|msg| AppError::Core(CoreError::Validation(msg)))?;

    let hash = hash_password(&input.password)
        .map_err(|e| AppError::InternalError(format!("Password hashing failed: {e}")))?;
    SettingRepo::replace_credential(&state.pool, input.kind.hash_key(), &hash).await?;
    let revision = state.credentials.reload(&state.pool).await?;

    tracing::info!(
        by = %admin.display_name(),
        kind = input.kind.hash_key(),
        revision,
        "Credential replaced"
    );
    state
        .event_bus
        .publish(ChangeEvent::new(DataTable::Settings).with_actor(admin.display_name()));

    Ok(Json(DataResponse {
        data: CredentialUpdate {
            kind: input.kind,
            revision,
        },
    }))
}
