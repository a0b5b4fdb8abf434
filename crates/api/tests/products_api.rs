//! Product catalog and pricing settings over HTTP.

mod common;

use axum::http::StatusCode;
use common::{body_json, delete_auth, get_auth, post_json_auth, put_json_auth};
use pricedesk_core::pricing::AdjustmentPolicy;
use pricedesk_core::protocol::DataTable;
use serde_json::json;
use sqlx::PgPool;

fn battery(base_cost: f64, adjustment: Option<f64>) -> serde_json::Value {
    json!({
        "category": "battery",
        "brand": "LTH",
        "model": "L-47-575",
        "size": null,
        "base_cost": base_cost,
        "adjustment_percent": adjustment,
        "stock": 3,
    })
}

// ---------------------------------------------------------------------------
// Products
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn admin_creates_product_with_computed_price(pool: PgPool) {
    let state = common::build_test_state(pool).await;
    let mut events = state.event_bus.subscribe();
    let token = common::admin_token(&state).await;

    let response =
        post_json_auth(common::app_for(&state), "/api/v1/products", battery(100.0, None), &token)
            .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    // Seeded tax is 16%, default adjustment 0%.
    assert_eq!(json["data"]["final_price"], 116.0);
    assert_eq!(json["data"]["effective_adjustment_percent"], 0.0);
    assert!(json["data"]["adjustment_percent"].is_null());

    let event = events.try_recv().expect("a change event should be published");
    assert_eq!(event.table, DataTable::Products);
    assert_eq!(event.actor.as_deref(), Some("Marta Ruiz"));
}

#[sqlx::test(migrations = "../db/migrations")]
async fn workers_read_but_cannot_write(pool: PgPool) {
    let state = common::build_test_state(pool).await;
    let worker = common::worker_token(&state).await;

    let response =
        post_json_auth(common::app_for(&state), "/api/v1/products", battery(50.0, None), &worker)
            .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = get_auth(common::app_for(&state), "/api/v1/products", &worker).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"], json!([]));
}

#[sqlx::test(migrations = "../db/migrations")]
async fn invalid_product_fields_are_rejected(pool: PgPool) {
    let state = common::build_test_state(pool).await;
    let token = common::admin_token(&state).await;

    let mut body = battery(100.0, None);
    body["category"] = json!("rim");
    let response = post_json_auth(common::app_for(&state), "/api/v1/products", body, &token).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = post_json_auth(
        common::app_for(&state),
        "/api/v1/products",
        battery(-1.0, None),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response =
        get_auth(common::app_for(&state), "/api/v1/products?category=rim", &token).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn upsert_then_delete(pool: PgPool) {
    let state = common::build_test_state(pool).await;
    let token = common::admin_token(&state).await;

    let response = put_json_auth(
        common::app_for(&state),
        "/api/v1/products/7",
        battery(200.0, Some(10.0)),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["id"], 7);
    // 200 * 1.10 * 1.16
    assert_eq!(json["data"]["final_price"], 255.2);

    let response = get_auth(common::app_for(&state), "/api/v1/products/7", &token).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = delete_auth(common::app_for(&state), "/api/v1/products/7", &token).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = delete_auth(common::app_for(&state), "/api/v1/products/7", &token).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// Pricing defaults
// ---------------------------------------------------------------------------

fn pricing(default_adjustment: f64) -> serde_json::Value {
    json!({
        "tax_percent": 16.0,
        "default_adjustment_percent": default_adjustment,
        "rounding_decimals": 2,
    })
}

#[sqlx::test(migrations = "../db/migrations")]
async fn inherit_policy_moves_inheriting_prices(pool: PgPool) {
    let state = common::build_test_state(pool).await;
    let token = common::admin_token(&state).await;
    post_json_auth(common::app_for(&state), "/api/v1/products", battery(100.0, None), &token).await;

    let response =
        put_json_auth(common::app_for(&state), "/api/v1/settings/pricing", pricing(10.0), &token)
            .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["adjustment_policy"], "inherit");
    assert_eq!(json["data"]["pinned_products"], 0);

    let response = get_auth(common::app_for(&state), "/api/v1/products", &token).await;
    let json = body_json(response).await;
    assert_eq!(json["data"][0]["final_price"], 127.6);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn snapshot_policy_pins_inheriting_products(pool: PgPool) {
    let mut config = common::test_config();
    config.adjustment_policy = AdjustmentPolicy::Snapshot;
    let state = common::build_test_state_with(pool, config).await;
    let mut events = state.event_bus.subscribe();
    let token = common::admin_token(&state).await;
    post_json_auth(common::app_for(&state), "/api/v1/products", battery(100.0, None), &token).await;
    post_json_auth(common::app_for(&state), "/api/v1/products", battery(100.0, Some(5.0)), &token)
        .await;

    let response =
        put_json_auth(common::app_for(&state), "/api/v1/settings/pricing", pricing(10.0), &token)
            .await;
    let json = body_json(response).await;
    assert_eq!(json["data"]["adjustment_policy"], "snapshot");
    assert_eq!(json["data"]["pinned_products"], 1);

    let response = get_auth(common::app_for(&state), "/api/v1/products", &token).await;
    let json = body_json(response).await;
    let prices: Vec<f64> = json["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["final_price"].as_f64().unwrap())
        .collect();
    // The inheriting product kept its old 0% adjustment.
    assert!(prices.contains(&116.0));
    assert!(prices.contains(&121.8));

    let tables: Vec<DataTable> = std::iter::from_fn(|| events.try_recv().ok())
        .map(|e| e.table)
        .collect();
    assert!(tables.contains(&DataTable::Settings));
}

#[sqlx::test(migrations = "../db/migrations")]
async fn out_of_range_pricing_is_rejected(pool: PgPool) {
    let state = common::build_test_state(pool).await;
    let token = common::admin_token(&state).await;

    let response =
        put_json_auth(common::app_for(&state), "/api/v1/settings/pricing", pricing(5000.0), &token)
            .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let worker = common::worker_token(&state).await;
    let response = get_auth(common::app_for(&state), "/api/v1/settings/pricing", &worker).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["default_adjustment_percent"], 0.0);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn settings_listing_hides_credential_hashes(pool: PgPool) {
    let state = common::build_seeded_state(pool).await;
    let token = common::admin_token(&state).await;

    let response = get_auth(common::app_for(&state), "/api/v1/settings", &token).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let keys: Vec<&str> = json["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["key"].as_str().unwrap())
        .collect();
    assert!(keys.contains(&"tax_percent"));
    assert!(keys.iter().all(|k| !k.ends_with("_password_hash")));
}
