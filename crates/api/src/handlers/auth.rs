//! Handlers for the `/auth` resource.

use axum::extract::State;
use axum::Json;
use pricedesk_core::identity::Identity;
use pricedesk_core::roles::Role;
use pricedesk_db::repositories::SuperAdminRepo;
use serde::{Deserialize, Serialize};

use crate::auth::jwt::{generate_access_token, SuperGrant};
use crate::credentials::CredentialKind;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::state::AppState;

/// Maximum length of a name or last name typed at login.
const MAX_NAME_LENGTH: usize = 80;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for `POST /auth/login`.
///
/// The password selects the role. Name and last name are the display
/// identity used for presence and moderation targeting.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub name: String,
    pub last_name: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
    pub user: UserInfo,
}

#[derive(Debug, Serialize)]
pub struct UserInfo {
    pub name: Option<String>,
    pub last_name: Option<String>,
    pub role: Role,
    pub is_super_admin: bool,
}

impl From<&AuthUser> for UserInfo {
    fn from(user: &AuthUser) -> Self {
        Self {
            name: user.name.clone(),
            last_name: user.last_name.clone(),
            role: user.role,
            is_super_admin: user.super_grant.is_some(),
        }
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(input): Json<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    let name = validate_name("name", &input.name)?;
    let last_name = validate_name("last_name", &input.last_name)?;

    let kind = state
        .credentials
        .verify(&input.password)
        .await
        .ok_or_else(|| AppError::unauthorized("Invalid credentials"))?;

    let super_grant = match kind {
        CredentialKind::SuperAdmin => Some(SuperGrant::Credential),
        CredentialKind::Admin => SuperAdminRepo::is_member(&state.pool, name, last_name)
            .await?
            .then_some(SuperGrant::AllowList),
        CredentialKind::Worker => None,
    };

    let identity = Identity::new(name, last_name, kind.role());
    let revision = state.credentials.revision().await;
    let access_token =
        generate_access_token(&identity, super_grant, revision, &state.config.jwt)
            .map_err(|e| AppError::InternalError(format!("Token generation failed: {e}")))?;

    tracing::info!(
        user = %identity.display_name(),
        role = %identity.role,
        super_admin = super_grant.is_some(),
        "Login succeeded"
    );

    Ok(Json(LoginResponse {
        access_token,
        expires_in: state.config.jwt.access_token_expiry_mins * 60,
        user: UserInfo {
            name: identity.name,
            last_name: identity.last_name,
            role: identity.role,
            is_super_admin: super_grant.is_some(),
        },
    }))
}

/// GET /api/v1/auth/me
pub async fn me(user: AuthUser) -> Json<UserInfo> {
    Json(UserInfo::from(&user))
}

fn validate_name<'a>(field: &str, value: &'a str) -> AppResult<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::BadRequest(format!("{field} must not be empty")));
    }
    if trimmed.chars().count() > MAX_NAME_LENGTH {
        return Err(AppError::BadRequest(format!(
            "{field} must be at most {MAX_NAME_LENGTH} characters"
        )));
    }
    Ok(trimmed)
}
