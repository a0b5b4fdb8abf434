//! Product models and DTOs.

use pricedesk_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `products` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Product {
    pub id: DbId,
    pub category: String,
    pub brand: String,
    pub model: String,
    pub size: Option<String>,
    pub base_cost: f64,
    /// Per-product override of the global adjustment. `None` inherits.
    pub adjustment_percent: Option<f64>,
    pub stock: i32,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating or replacing a product.
#[derive(Debug, Clone, Deserialize)]
pub struct UpsertProduct {
    pub category: String,
    pub brand: String,
    pub model: String,
    pub size: Option<String>,
    pub base_cost: f64,
    pub adjustment_percent: Option<f64>,
    #[serde(default)]
    pub stock: i32,
}
