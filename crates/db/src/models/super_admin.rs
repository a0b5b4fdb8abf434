//! Super-admin allow-list models.

use pricedesk_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `super_admins` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct SuperAdmin {
    pub id: DbId,
    pub name: String,
    pub last_name: String,
    pub created_at: Timestamp,
}

/// DTO for adding an identity to the allow-list.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateSuperAdmin {
    pub name: String,
    pub last_name: String,
}
