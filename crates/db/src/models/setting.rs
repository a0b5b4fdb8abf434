//! Key/value settings rows and well-known keys.

use pricedesk_core::types::Timestamp;
use serde::Serialize;
use sqlx::FromRow;

/// Well-known keys of the `settings` table.
pub mod keys {
    pub const TAX_PERCENT: &str = "tax_percent";
    pub const DEFAULT_ADJUSTMENT_PERCENT: &str = "default_adjustment_percent";
    pub const ROUNDING_DECIMALS: &str = "rounding_decimals";
    pub const CREDENTIAL_REVISION: &str = "credential_revision";
    pub const WORKER_PASSWORD_HASH: &str = "worker_password_hash";
    pub const ADMIN_PASSWORD_HASH: &str = "admin_password_hash";
    pub const SUPER_PASSWORD_HASH: &str = "super_password_hash";
}

/// A row from the `settings` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Setting {
    pub key: String,
    pub value: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}
