//! JWT-based authentication extractor for Axum handlers.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use pricedesk_core::identity::Identity;
use pricedesk_core::roles::Role;

use crate::auth::jwt::{validate_token, SuperGrant};
use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// Authenticated identity extracted from a JWT Bearer token in the
/// `Authorization` header.
///
/// ```ignore
/// async fn my_handler(user: AuthUser) -> AppResult<Json<()>> {
///     tracing::info!(user = %user.display_name(), role = %user.role, "handling request");
///     Ok(Json(()))
/// }
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct AuthUser {
    pub name: Option<String>,
    pub last_name: Option<String>,
    pub role: Role,
    /// Present only on admin tokens that carry super-admin rights.
    pub super_grant: Option<SuperGrant>,
    /// Credential revision the token was issued under.
    pub revision: i64,
    /// Token expiry (UTC Unix timestamp).
    pub expires_at: i64,
}

impl AuthUser {
    /// Validate `token` and check it against the live credential revision.
    ///
    /// Shared by the header extractor and the WebSocket upgrade, which takes
    /// the token as a query parameter.
    pub async fn from_token(token: &str, state: &AppState) -> AppResult<Self> {
        let claims = validate_token(token, &state.config.jwt)
            .map_err(|_| AppError::unauthorized("Invalid or expired token"))?;

        let user = AuthUser {
            name: claims.name,
            last_name: claims.last_name,
            role: claims.role,
            super_grant: claims.super_grant,
            revision: claims.rev,
            expires_at: claims.exp,
        };
        user.ensure_current(state).await?;
        Ok(user)
    }

    /// Re-check a token that may have been validated long ago, as on an
    /// open WebSocket, against the live credential revision and the clock.
    pub async fn ensure_current(&self, state: &AppState) -> AppResult<()> {
        check_current(
            self.revision,
            self.expires_at,
            state.credentials.revision().await,
            chrono::Utc::now().timestamp(),
        )
    }

    pub fn identity(&self) -> Identity {
        Identity {
            name: self.name.clone(),
            last_name: self.last_name.clone(),
            role: self.role,
        }
    }

    pub fn display_name(&self) -> String {
        self.identity().display_name()
    }
}

fn check_current(revision: i64, expires_at: i64, live_revision: i64, now: i64) -> AppResult<()> {
    if revision != live_revision {
        return Err(AppError::unauthorized(
            "Credentials have changed. Please log in again",
        ));
    }
    if expires_at <= now {
        return Err(AppError::unauthorized("Token has expired. Please log in again"));
    }
    Ok(())
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::unauthorized("Missing Authorization header"))?;

        let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
            AppError::unauthorized("Invalid Authorization format. Expected: Bearer <token>")
        })?;

        AuthUser::from_token(token, state).await
    }
}
