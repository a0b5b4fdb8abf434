use pricedesk_core::presence::PRESENCE_STALE_TIMEOUT_SECS;
use pricedesk_core::pricing::AdjustmentPolicy;

use crate::auth::jwt::JwtConfig;

/// Longest accepted `PRESENCE_STALE_TIMEOUT_SECS` (one day).
pub const MAX_PRESENCE_STALE_TIMEOUT_SECS: u64 = 86_400;

/// A stale timeout shorter than the ping interval would evict healthy
/// connections between two pings.
pub fn validate_presence_timeouts(
    heartbeat_interval_secs: u64,
    presence_stale_timeout_secs: u64,
) -> Result<(), String> {
    if presence_stale_timeout_secs > MAX_PRESENCE_STALE_TIMEOUT_SECS {
        return Err(format!(
            "PRESENCE_STALE_TIMEOUT_SECS must be at most {MAX_PRESENCE_STALE_TIMEOUT_SECS}"
        ));
    }
    if presence_stale_timeout_secs < heartbeat_interval_secs {
        return Err(format!(
            "PRESENCE_STALE_TIMEOUT_SECS ({presence_stale_timeout_secs}) must be at least \
             HEARTBEAT_INTERVAL_SECS ({heartbeat_interval_secs})"
        ));
    }
    Ok(())
}

/// Plaintext passwords used to seed credential hashes that are not yet
/// stored in the database. Existing hashes are never overwritten.
#[derive(Debug, Clone, Default)]
pub struct BootstrapCredentials {
    pub worker: Option<String>,
    pub admin: Option<String>,
    pub super_admin: Option<String>,
}

impl BootstrapCredentials {
    /// | Env Var                       |
    /// |-------------------------------|
    /// | `BOOTSTRAP_WORKER_PASSWORD`   |
    /// | `BOOTSTRAP_ADMIN_PASSWORD`    |
    /// | `BOOTSTRAP_SUPER_PASSWORD`    |
    pub fn from_env() -> Self {
        let read = |key: &str| std::env::var(key).ok().filter(|v| !v.is_empty());
        Self {
            worker: read("BOOTSTRAP_WORKER_PASSWORD"),
            admin: read("BOOTSTRAP_ADMIN_PASSWORD"),
            super_admin: read("BOOTSTRAP_SUPER_PASSWORD"),
        }
    }
}

/// Server configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
/// In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// How long background tasks get to drain after the listener stops.
    pub shutdown_timeout_secs: u64,
    /// Interval between WebSocket pings (default: `30`).
    pub heartbeat_interval_secs: u64,
    /// Connections silent for longer than this are evicted from presence.
    pub presence_stale_timeout_secs: u64,
    /// What happens to inheriting products when the default adjustment changes.
    pub adjustment_policy: AdjustmentPolicy,
    /// JWT token configuration (secret, expiry).
    pub jwt: JwtConfig,
    pub bootstrap: BootstrapCredentials,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                       | Default                    |
    /// |-------------------------------|----------------------------|
    /// | `HOST`                        | `0.0.0.0`                  |
    /// | `PORT`                        | `3000`                     |
    /// | `CORS_ORIGINS`                | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS`        | `30`                       |
    /// | `SHUTDOWN_TIMEOUT_SECS`       | `30`                       |
    /// | `HEARTBEAT_INTERVAL_SECS`     | `30`                       |
    /// | `PRESENCE_STALE_TIMEOUT_SECS` | `90`                       |
    /// | `ADJUSTMENT_POLICY`           | `inherit`                  |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let shutdown_timeout_secs: u64 = std::env::var("SHUTDOWN_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("SHUTDOWN_TIMEOUT_SECS must be a valid u64");

        let heartbeat_interval_secs: u64 = std::env::var("HEARTBEAT_INTERVAL_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("HEARTBEAT_INTERVAL_SECS must be a valid u64");
        assert!(heartbeat_interval_secs > 0, "HEARTBEAT_INTERVAL_SECS must be positive");

        let presence_stale_timeout_secs: u64 = std::env::var("PRESENCE_STALE_TIMEOUT_SECS")
            .unwrap_or_else(|_| PRESENCE_STALE_TIMEOUT_SECS.to_string())
            .parse()
            .expect("PRESENCE_STALE_TIMEOUT_SECS must be a valid u64");
        validate_presence_timeouts(heartbeat_interval_secs, presence_stale_timeout_secs)
            .unwrap_or_else(|e| panic!("{e}"));

        let adjustment_policy: AdjustmentPolicy = std::env::var("ADJUSTMENT_POLICY")
            .unwrap_or_else(|_| "inherit".into())
            .parse()
            .unwrap_or_else(|e| panic!("ADJUSTMENT_POLICY: {e}"));

        let jwt = JwtConfig::from_env();
        let bootstrap = BootstrapCredentials::from_env();

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            shutdown_timeout_secs,
            heartbeat_interval_secs,
            presence_stale_timeout_secs,
            adjustment_policy,
            jwt,
            bootstrap,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_timeouts_are_valid() {
        assert!(validate_presence_timeouts(30, PRESENCE_STALE_TIMEOUT_SECS).is_ok());
        assert!(validate_presence_timeouts(30, 30).is_ok());
    }

    #[test]
    fn stale_timeout_below_interval_is_rejected() {
        let err = validate_presence_timeouts(30, 10).unwrap_err();
        assert!(err.contains("HEARTBEAT_INTERVAL_SECS"));
    }

    #[test]
    fn oversized_stale_timeout_is_rejected() {
        assert!(validate_presence_timeouts(30, MAX_PRESENCE_STALE_TIMEOUT_SECS).is_ok());
        assert!(validate_presence_timeouts(30, MAX_PRESENCE_STALE_TIMEOUT_SECS + 1).is_err());
        assert!(validate_presence_timeouts(30, u64::MAX).is_err());
    }
}
