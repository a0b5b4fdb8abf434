//! Handlers for the product catalog.
//!
//! Any authenticated user can read; only admins write. Every write publishes
//! a [`ChangeEvent`] so attached clients re-read the table.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use pricedesk_core::catalog::{is_valid_category, validate_product_fields, VALID_CATEGORIES};
use pricedesk_core::error::CoreError;
use pricedesk_core::pricing::{effective_adjustment, PricingDefaults};
use pricedesk_core::protocol::DataTable;
use pricedesk_core::types::DbId;
use pricedesk_db::models::product::{Product, UpsertProduct};
use pricedesk_db::repositories::{ProductRepo, SettingRepo};
use pricedesk_events::ChangeEvent;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::middleware::rbac::{RequireAdmin, RequireAuth};
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct ListProductsParams {
    pub category: Option<String>,
}

/// A product together with its computed price.
#[derive(Debug, Serialize)]
pub struct ProductView {
    #[serde(flatten)]
    pub product: Product,
    /// The override when set, otherwise the global default.
    pub effective_adjustment_percent: f64,
    pub final_price: f64,
}

impl ProductView {
    fn new(product: Product, defaults: &PricingDefaults) -> Self {
        let effective_adjustment_percent = effective_adjustment(
            product.adjustment_percent,
            defaults.default_adjustment_percent,
        );
        let final_price = defaults.price(product.base_cost, product.adjustment_percent);
        Self {
            product,
            effective_adjustment_percent,
            final_price,
        }
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /api/v1/products?category=
pub async fn list(
    RequireAuth(_user): RequireAuth,
    State(state): State<AppState>,
    Query(params): Query<ListProductsParams>,
) -> AppResult<impl IntoResponse> {
    if let Some(category) = params.category.as_deref() {
        if !is_valid_category(category) {
            return Err(AppError::BadRequest(format!(
                "Invalid category '{category}'. Must be one of: {}",
                VALID_CATEGORIES.join(", ")
            )));
        }
    }

    let defaults = SettingRepo::pricing_defaults(&state.pool).await?;
    let products = ProductRepo::list(&state.pool, params.category.as_deref()).await?;
    let data: Vec<ProductView> = products
        .into_iter()
        .map(|p| ProductView::new(p, &defaults))
        .collect();

    Ok(Json(DataResponse { data }))
}

/// GET /api/v1/products/{id}
pub async fn get(
    RequireAuth(_user): RequireAuth,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let product = ProductRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Product",
            id,
        }))?;
    let defaults = SettingRepo::pricing_defaults(&state.pool).await?;

    Ok(Json(DataResponse {
        data: ProductView::new(product, &defaults),
    }))
}

/// POST /api/v1/products
pub async fn create(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Json(input): Json<UpsertProduct>,
) -> AppResult<impl IntoResponse> {
    validate(&input)?;
    let product = ProductRepo::create(&state.pool, &input).await?;
    let defaults = SettingRepo::pricing_defaults(&state.pool).await?;

    tracing::info!(product_id = product.id, by = %admin.display_name(), "Product created");
    state
        .event_bus
        .publish(ChangeEvent::new(DataTable::Products).with_actor(admin.display_name()));

    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: ProductView::new(product, &defaults),
        }),
    ))
}

/// PUT /api/v1/products/{id}
///
/// Creates the product with that id or replaces it entirely. Concurrent
/// writers are not detected; the last write wins.
pub async fn upsert(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<UpsertProduct>,
) -> AppResult<impl IntoResponse> {
    if id <= 0 {
        return Err(AppError::BadRequest(format!("Invalid product id {id}")));
    }
    validate(&input)?;
    let product = ProductRepo::upsert(&state.pool, id, &input).await?;
    let defaults = SettingRepo::pricing_defaults(&state.pool).await?;

    tracing::info!(product_id = id, by = %admin.display_name(), "Product saved");
    state
        .event_bus
        .publish(ChangeEvent::new(DataTable::Products).with_actor(admin.display_name()));

    Ok(Json(DataResponse {
        data: ProductView::new(product, &defaults),
    }))
}

/// DELETE /api/v1/products/{id}
pub async fn delete(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    if !ProductRepo::delete(&state.pool, id).await? {
        return Err(AppError::Core(CoreError::NotFound {
            entity: "Product",
            id,
        }));
    }

    tracing::info!(product_id = id, by = %admin.display_name(), "Product deleted");
    state
        .event_bus
        .publish(ChangeEvent::new(DataTable::Products).with_actor(admin.display_name()));

    Ok(StatusCode::NO_CONTENT)
}

fn validate(input: &UpsertProduct) -> AppResult<()> {
    validate_product_fields(
        &input.category,
        &input.brand,
        &input.model,
        input.base_cost,
        input.adjustment_percent,
        input.stock,
    )
    .map_err(|msg| AppError::Core(CoreError::Validation(msg)))
}
