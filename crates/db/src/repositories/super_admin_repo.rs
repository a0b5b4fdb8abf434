//! Repository for the `super_admins` allow-list.

use pricedesk_core::types::DbId;
use sqlx::PgPool;

use crate::models::super_admin::SuperAdmin;

const COLUMNS: &str = "id, name, last_name, created_at";

/// Read/write access to the super-admin allow-list.
///
/// Identity comparisons are case-insensitive and ignore surrounding
/// whitespace, matching the unique index.
pub struct SuperAdminRepo;

impl SuperAdminRepo {
    pub async fn list(pool: &PgPool) -> Result<Vec<SuperAdmin>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM super_admins ORDER BY id ASC");
        sqlx::query_as::<_, SuperAdmin>(&query).fetch_all(pool).await
    }

    pub async fn is_member(
        pool: &PgPool,
        name: &str,
        last_name: &str,
    ) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM super_admins \
             WHERE LOWER(TRIM(name)) = LOWER(TRIM($1)) \
               AND LOWER(TRIM(last_name)) = LOWER(TRIM($2)))",
        )
        .bind(name)
        .bind(last_name)
        .fetch_one(pool)
        .await
    }

    /// Add an identity. Adding an existing identity returns the existing row.
    pub async fn add(pool: &PgPool, name: &str, last_name: &str) -> Result<SuperAdmin, sqlx::Error> {
        let query = format!(
            "INSERT INTO super_admins (name, last_name) VALUES (TRIM($1), TRIM($2)) \
             ON CONFLICT ((LOWER(TRIM(name))), (LOWER(TRIM(last_name)))) DO NOTHING \
             RETURNING {COLUMNS}"
        );
        if let Some(row) = sqlx::query_as::<_, SuperAdmin>(&query)
            .bind(name)
            .bind(last_name)
            .fetch_optional(pool)
            .await?
        {
            return Ok(row);
        }
        let query = format!(
            "SELECT {COLUMNS} FROM super_admins \
             WHERE LOWER(TRIM(name)) = LOWER(TRIM($1)) \
               AND LOWER(TRIM(last_name)) = LOWER(TRIM($2))"
        );
        sqlx::query_as::<_, SuperAdmin>(&query)
            .bind(name)
            .bind(last_name)
            .fetch_one(pool)
            .await
    }

    /// Remove an entry. Returns `true` if a row was removed.
    pub async fn remove(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM super_admins WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
