//! Role-based access control (RBAC) extractors.
//!
//! Each extractor wraps [`AuthUser`] and rejects requests whose role does not
//! meet the minimum requirement.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use pricedesk_db::repositories::SuperAdminRepo;

use super::auth::AuthUser;
use crate::auth::jwt::SuperGrant;
use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// Requires the `admin` role. Rejects with 403 Forbidden otherwise.
pub struct RequireAdmin(pub AuthUser);

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if !user.role.is_admin() {
            return Err(AppError::forbidden("Admin role required"));
        }
        Ok(RequireAdmin(user))
    }
}

/// Requires super-admin rights. Rejects with 403 Forbidden otherwise.
///
/// ```ignore
/// async fn kick(RequireSuperAdmin(user): RequireSuperAdmin) -> AppResult<Json<()>> {
///     Ok(Json(()))
/// }
/// ```
pub struct RequireSuperAdmin(pub AuthUser);

impl FromRequestParts<AppState> for RequireSuperAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        ensure_super_admin(&user, state).await?;
        Ok(RequireSuperAdmin(user))
    }
}

/// Requires any authenticated user (any valid role).
pub struct RequireAuth(pub AuthUser);

impl FromRequestParts<AppState> for RequireAuth {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        Ok(RequireAuth(user))
    }
}

/// Server-side super-admin check.
///
/// The token must still be current. A credential grant is then trusted as
/// issued. An allow-list grant is re-checked against the database so
/// removing an entry revokes access at once.
pub async fn ensure_super_admin(user: &AuthUser, state: &AppState) -> AppResult<()> {
    user.ensure_current(state).await?;
    if !user.role.is_admin() {
        return Err(AppError::forbidden("Super-admin rights required"));
    }
    match user.super_grant {
        Some(SuperGrant::Credential) => Ok(()),
        Some(SuperGrant::AllowList) => {
            let (Some(name), Some(last_name)) = (user.name.as_deref(), user.last_name.as_deref())
            else {
                return Err(AppError::forbidden("Super-admin rights required"));
            };
            if SuperAdminRepo::is_member(&state.pool, name, last_name).await? {
                Ok(())
            } else {
                Err(AppError::forbidden("Super-admin rights have been revoked"))
            }
        }
        None => Err(AppError::forbidden("Super-admin rights required")),
    }
}
