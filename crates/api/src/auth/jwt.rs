//! JWT access-token generation and validation.
//!
//! Access tokens are HS256-signed JWTs containing a [`Claims`] payload. There
//! is no per-user account: a token binds the identity typed at login to the
//! role unlocked by the shared password, plus the credential revision that
//! was current when it was issued.

use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use pricedesk_core::identity::Identity;
use pricedesk_core::roles::Role;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// How an admin token acquired super-admin rights.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuperGrant {
    /// Logged in with the super-admin password.
    Credential,
    /// Logged in as admin with an identity on the allow-list. Re-checked on
    /// every privileged request so removal takes effect immediately.
    AllowList,
}

/// JWT claims embedded in every access token.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject -- the identity's display name.
    pub sub: String,
    pub name: Option<String>,
    pub last_name: Option<String>,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub super_grant: Option<SuperGrant>,
    /// Credential revision at issue time. A mismatch means a password was
    /// changed since and the token is no longer honoured.
    pub rev: i64,
    /// Expiration time (UTC Unix timestamp).
    pub exp: i64,
    /// Issued-at time (UTC Unix timestamp).
    pub iat: i64,
    /// Unique token identifier (UUID v4) for audit.
    pub jti: String,
}

impl Claims {
    pub fn identity(&self) -> Identity {
        Identity {
            name: self.name.clone(),
            last_name: self.last_name.clone(),
            role: self.role,
        }
    }
}

/// Configuration for JWT token generation and validation.
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// HMAC-SHA256 secret used to sign and verify tokens.
    pub secret: String,
    /// Access token lifetime in minutes (default: 720, one shift).
    pub access_token_expiry_mins: i64,
}

/// Default access token expiry in minutes.
const DEFAULT_ACCESS_EXPIRY_MINS: i64 = 720;

impl JwtConfig {
    /// Load JWT configuration from environment variables.
    ///
    /// | Env Var                    | Required | Default |
    /// |----------------------------|----------|---------|
    /// | `JWT_SECRET`               | **yes**  | --      |
    /// | `JWT_ACCESS_EXPIRY_MINS`   | no       | `720`   |
    ///
    /// # Panics
    ///
    /// Panics if `JWT_SECRET` is not set or is empty.
    pub fn from_env() -> Self {
        let secret =
            std::env::var("JWT_SECRET").expect("JWT_SECRET must be set in the environment");
        assert!(!secret.is_empty(), "JWT_SECRET must not be empty");

        let access_token_expiry_mins: i64 = std::env::var("JWT_ACCESS_EXPIRY_MINS")
            .unwrap_or_else(|_| DEFAULT_ACCESS_EXPIRY_MINS.to_string())
            .parse()
            .expect("JWT_ACCESS_EXPIRY_MINS must be a valid i64");

        Self {
            secret,
            access_token_expiry_mins,
        }
    }
}

/// Generate an HS256 access token for the given identity.
pub fn generate_access_token(
    identity: &Identity,
    super_grant: Option<SuperGrant>,
    revision: i64,
    config: &JwtConfig,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = chrono::Utc::now().timestamp();
    let exp = now + config.access_token_expiry_mins * 60;

    let claims = Claims {
        sub: identity.display_name(),
        name: identity.name.clone(),
        last_name: identity.last_name.clone(),
        role: identity.role,
        super_grant,
        rev: revision,
        exp,
        iat: now,
        jti: Uuid::new_v4().to_string(),
    };

    encode(
        &Header::default(), // HS256
        &claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )
}

/// Validate and decode an access token, returning the embedded [`Claims`].
///
/// Validates the signature and expiration. The credential revision is
/// checked by the caller against the live [`CredentialStore`].
///
/// [`CredentialStore`]: crate::credentials::CredentialStore
pub fn validate_token(
    token: &str,
    config: &JwtConfig,
) -> Result<Claims, jsonwebtoken::errors::Error> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.secret.as_bytes()),
        &Validation::default(), // HS256, validates exp
    )?;
    Ok(token_data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> JwtConfig {
        JwtConfig {
            secret: "test-secret-that-is-long-enough-for-hmac".to_string(),
            access_token_expiry_mins: 15,
        }
    }

    #[test]
    fn test_generate_and_validate_access_token() {
        let config = test_config();
        let identity = Identity::new("Ana", "Pérez", Role::Admin);
        let token = generate_access_token(&identity, Some(SuperGrant::AllowList), 3, &config)
            .expect("token generation should succeed");

        let claims = validate_token(&token, &config).expect("token validation should succeed");
        assert_eq!(claims.sub, "Ana Pérez");
        assert_eq!(claims.role, Role::Admin);
        assert_eq!(claims.super_grant, Some(SuperGrant::AllowList));
        assert_eq!(claims.rev, 3);
        assert_eq!(claims.identity(), identity);
        assert!(claims.exp > claims.iat);
        assert!(!claims.jti.is_empty());
    }

    #[test]
    fn test_expired_token_fails() {
        let config = test_config();

        // Use a margin well beyond the default 60-second leeway.
        let now = chrono::Utc::now().timestamp();
        let claims = Claims {
            sub: "Luis Gómez".to_string(),
            name: Some("Luis".to_string()),
            last_name: Some("Gómez".to_string()),
            role: Role::Worker,
            super_grant: None,
            rev: 1,
            exp: now - 300,
            iat: now - 600,
            jti: Uuid::new_v4().to_string(),
        };

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(config.secret.as_bytes()),
        )
        .expect("encoding should succeed");

        let result = validate_token(&token, &config);
        assert!(result.is_err(), "expired token must fail validation");
    }

    #[test]
    fn test_different_secrets_fail() {
        let config_a = JwtConfig {
            secret: "secret-alpha".to_string(),
            access_token_expiry_mins: 15,
        };
        let config_b = JwtConfig {
            secret: "secret-bravo".to_string(),
            access_token_expiry_mins: 15,
        };

        let identity = Identity::new("Luis", "Gómez", Role::Worker);
        let token = generate_access_token(&identity, None, 1, &config_a)
            .expect("token generation should succeed");

        let result = validate_token(&token, &config_b);
        assert!(
            result.is_err(),
            "token signed with a different secret must fail"
        );
    }

    #[test]
    fn test_worker_token_omits_super_grant() {
        let config = test_config();
        let identity = Identity::new("Luis", "Gómez", Role::Worker);
        let token = generate_access_token(&identity, None, 1, &config).unwrap();
        let claims = validate_token(&token, &config).unwrap();
        assert!(claims.super_grant.is_none());
    }
}
