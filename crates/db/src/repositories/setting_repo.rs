//! Repository for the `settings` key/value table.

use pricedesk_core::pricing::{PricingDefaults, DEFAULT_ROUNDING_DECIMALS};
use sqlx::PgPool;

use crate::models::setting::{keys, Setting};

const COLUMNS: &str = "key, value, created_at, updated_at";

/// Provides read/write access to settings.
pub struct SettingRepo;

impl SettingRepo {
    pub async fn get(pool: &PgPool, key: &str) -> Result<Option<String>, sqlx::Error> {
        sqlx::query_scalar::<_, String>("SELECT value FROM settings WHERE key = $1")
            .bind(key)
            .fetch_optional(pool)
            .await
    }

    /// List all settings except credential hashes.
    pub async fn list_public(pool: &PgPool) -> Result<Vec<Setting>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM settings \
             WHERE key NOT LIKE '%_password_hash' ORDER BY key ASC"
        );
        sqlx::query_as::<_, Setting>(&query).fetch_all(pool).await
    }

    /// Insert or overwrite a setting (last write wins).
    pub async fn set(pool: &PgPool, key: &str, value: &str) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO settings (key, value) VALUES ($1, $2) \
             ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value, updated_at = NOW()",
        )
        .bind(key)
        .bind(value)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Load pricing defaults, falling back per field when a value is
    /// missing or unparsable.
    pub async fn pricing_defaults(pool: &PgPool) -> Result<PricingDefaults, sqlx::Error> {
        let defaults = PricingDefaults::default();
        let tax_percent = Self::get(pool, keys::TAX_PERCENT)
            .await?
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.tax_percent);
        let default_adjustment_percent = Self::get(pool, keys::DEFAULT_ADJUSTMENT_PERCENT)
            .await?
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.default_adjustment_percent);
        let rounding_decimals = Self::get(pool, keys::ROUNDING_DECIMALS)
            .await?
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_ROUNDING_DECIMALS);
        Ok(PricingDefaults {
            tax_percent,
            default_adjustment_percent,
            rounding_decimals,
        })
    }

    /// Persist all pricing defaults in one transaction.
    pub async fn set_pricing_defaults(
        pool: &PgPool,
        defaults: &PricingDefaults,
    ) -> Result<(), sqlx::Error> {
        let mut tx = pool.begin().await?;
        for (key, value) in [
            (keys::TAX_PERCENT, defaults.tax_percent.to_string()),
            (
                keys::DEFAULT_ADJUSTMENT_PERCENT,
                defaults.default_adjustment_percent.to_string(),
            ),
            (keys::ROUNDING_DECIMALS, defaults.rounding_decimals.to_string()),
        ] {
            sqlx::query(
                "INSERT INTO settings (key, value) VALUES ($1, $2) \
                 ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value, updated_at = NOW()",
            )
            .bind(key)
            .bind(value)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await
    }

    /// Current credential revision (`1` when unset).
    pub async fn credential_revision(pool: &PgPool) -> Result<i64, sqlx::Error> {
        Ok(Self::get(pool, keys::CREDENTIAL_REVISION)
            .await?
            .and_then(|v| v.parse().ok())
            .unwrap_or(1))
    }

    /// Store a credential hash and bump the credential revision atomically.
    ///
    /// Returns the new revision.
    pub async fn replace_credential(
        pool: &PgPool,
        hash_key: &str,
        hash: &str,
    ) -> Result<i64, sqlx::Error> {
        let mut tx = pool.begin().await?;
        sqlx::query(
            "INSERT INTO settings (key, value) VALUES ($1, $2) \
             ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value, updated_at = NOW()",
        )
        .bind(hash_key)
        .bind(hash)
        .execute(&mut *tx)
        .await?;
        let revision: String = sqlx::query_scalar(
            "INSERT INTO settings (key, value) VALUES ($1, '2') \
             ON CONFLICT (key) DO UPDATE \
                SET value = (settings.value::BIGINT + 1)::TEXT, updated_at = NOW() \
             RETURNING value",
        )
        .bind(keys::CREDENTIAL_REVISION)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(revision.parse().unwrap_or(1))
    }
}
