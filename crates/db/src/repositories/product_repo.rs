//! Repository for the `products` table.

use pricedesk_core::types::DbId;
use sqlx::PgPool;

use crate::models::product::{Product, UpsertProduct};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, category, brand, model, size, base_cost, adjustment_percent, \
                       stock, created_at, updated_at";

/// Provides CRUD operations for products.
///
/// Writes are last-write-wins: there is no version column and no
/// optimistic-concurrency check.
pub struct ProductRepo;

impl ProductRepo {
    /// List all products, optionally filtered by category, ordered by brand then model.
    pub async fn list(pool: &PgPool, category: Option<&str>) -> Result<Vec<Product>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM products \
             WHERE ($1::TEXT IS NULL OR category = $1) \
             ORDER BY brand ASC, model ASC, id ASC"
        );
        sqlx::query_as::<_, Product>(&query)
            .bind(category)
            .fetch_all(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Product>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM products WHERE id = $1");
        sqlx::query_as::<_, Product>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn create(pool: &PgPool, input: &UpsertProduct) -> Result<Product, sqlx::Error> {
        let query = format!(
            "INSERT INTO products \
                (category, brand, model, size, base_cost, adjustment_percent, stock) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Product>(&query)
            .bind(&input.category)
            .bind(&input.brand)
            .bind(&input.model)
            .bind(&input.size)
            .bind(input.base_cost)
            .bind(input.adjustment_percent)
            .bind(input.stock)
            .fetch_one(pool)
            .await
    }

    /// Insert or fully replace the product with the given id.
    pub async fn upsert(
        pool: &PgPool,
        id: DbId,
        input: &UpsertProduct,
    ) -> Result<Product, sqlx::Error> {
        let query = format!(
            "INSERT INTO products \
                (id, category, brand, model, size, base_cost, adjustment_percent, stock) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             ON CONFLICT (id) DO UPDATE SET \
                category = EXCLUDED.category, \
                brand = EXCLUDED.brand, \
                model = EXCLUDED.model, \
                size = EXCLUDED.size, \
                base_cost = EXCLUDED.base_cost, \
                adjustment_percent = EXCLUDED.adjustment_percent, \
                stock = EXCLUDED.stock, \
                updated_at = NOW() \
             RETURNING {COLUMNS}"
        );
        let product = sqlx::query_as::<_, Product>(&query)
            .bind(id)
            .bind(&input.category)
            .bind(&input.brand)
            .bind(&input.model)
            .bind(&input.size)
            .bind(input.base_cost)
            .bind(input.adjustment_percent)
            .bind(input.stock)
            .fetch_one(pool)
            .await?;

        // An explicit id bypasses the sequence; keep it ahead of MAX(id).
        sqlx::query(
            "SELECT setval(pg_get_serial_sequence('products', 'id'), \
                    GREATEST((SELECT MAX(id) FROM products), 1))",
        )
        .execute(pool)
        .await?;

        Ok(product)
    }

    /// Delete a product. Returns `true` if a row was removed.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// `(id, adjustment_percent)` for every product, used to plan default changes.
    pub async fn list_adjustments(pool: &PgPool) -> Result<Vec<(DbId, Option<f64>)>, sqlx::Error> {
        sqlx::query_as::<_, (DbId, Option<f64>)>(
            "SELECT id, adjustment_percent FROM products ORDER BY id ASC",
        )
        .fetch_all(pool)
        .await
    }

    /// Pin the adjustment of the given products. Only rows that still
    /// inherit (NULL override) are touched. Returns the number of rows updated.
    pub async fn pin_adjustments(
        pool: &PgPool,
        pins: &[(DbId, f64)],
    ) -> Result<u64, sqlx::Error> {
        if pins.is_empty() {
            return Ok(0);
        }
        let ids: Vec<DbId> = pins.iter().map(|(id, _)| *id).collect();
        let values: Vec<f64> = pins.iter().map(|(_, v)| *v).collect();
        let result = sqlx::query(
            "UPDATE products p SET adjustment_percent = pin.value, updated_at = NOW() \
             FROM UNNEST($1::BIGINT[], $2::DOUBLE PRECISION[]) AS pin(id, value) \
             WHERE p.id = pin.id AND p.adjustment_percent IS NULL",
        )
        .bind(&ids)
        .bind(&values)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }
}
