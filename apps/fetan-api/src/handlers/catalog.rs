use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use serde::Deserialize;
use serde_json::{Value, json};

use fetan_db::models::store::{PaymentMethod, Product, ProductSubscriptionDiscount, Subscription};

use crate::AppState;
use crate::error::ApiError;
use crate::services::catalog_service::{
    CreatePaymentMethodInput, CreateProductInput, CreateSubscriptionInput, SubscriptionView,
    UpdateProductInput,
};

// --- Customer surface ---

pub async fn list_products(State(state): State<AppState>) -> Result<Json<Vec<Product>>, ApiError> {
    Ok(Json(state.catalog.list_products().await?))
}

pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Product>, ApiError> {
    Ok(Json(state.catalog.view_product(id).await?))
}

#[derive(Deserialize)]
pub struct RateRequest {
    pub rating: i32,
}

pub async fn rate_product(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<RateRequest>,
) -> Result<Json<Value>, ApiError> {
    state.catalog.rate_product(id, payload.rating).await?;
    Ok(Json(json!({ "rated": true })))
}

pub async fn list_subscriptions(
    State(state): State<AppState>,
) -> Result<Json<Vec<SubscriptionView>>, ApiError> {
    Ok(Json(state.catalog.list_subscriptions().await?))
}

pub async fn list_payment_methods(
    State(state): State<AppState>,
) -> Result<Json<Vec<PaymentMethod>>, ApiError> {
    Ok(Json(state.catalog.list_payment_methods().await?))
}

// --- Admin: products ---

pub async fn list_products_admin(
    State(state): State<AppState>,
) -> Result<Json<Vec<Product>>, ApiError> {
    Ok(Json(state.catalog.list_products_admin().await?))
}

pub async fn create_product(
    State(state): State<AppState>,
    Json(payload): Json<CreateProductInput>,
) -> Result<(StatusCode, Json<Product>), ApiError> {
    let product = state.catalog.create_product(payload).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

pub async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateProductInput>,
) -> Result<Json<Product>, ApiError> {
    Ok(Json(state.catalog.update_product(id, payload).await?))
}

pub async fn delete_product(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    state.catalog.delete_product(id).await?;
    Ok(Json(json!({ "deleted": true })))
}

pub async fn product_discounts(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<ProductSubscriptionDiscount>>, ApiError> {
    Ok(Json(state.catalog.product_discounts(id).await?))
}

#[derive(Deserialize)]
pub struct DiscountRequest {
    pub subscription_id: i64,
    pub discount_percentage: i32,
}

pub async fn set_product_discount(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<DiscountRequest>,
) -> Result<Json<Value>, ApiError> {
    state
        .catalog
        .set_product_discount(id, payload.subscription_id, payload.discount_percentage)
        .await?;
    Ok(Json(json!({ "updated": true })))
}

// --- Admin: subscriptions ---

pub async fn list_subscriptions_admin(
    State(state): State<AppState>,
) -> Result<Json<Vec<Subscription>>, ApiError> {
    Ok(Json(state.catalog.list_subscriptions_admin().await?))
}

pub async fn create_subscription(
    State(state): State<AppState>,
    Json(payload): Json<CreateSubscriptionInput>,
) -> Result<(StatusCode, Json<Subscription>), ApiError> {
    let sub = state.catalog.create_subscription(payload).await?;
    Ok((StatusCode::CREATED, Json(sub)))
}

#[derive(Deserialize)]
pub struct ActiveRequest {
    pub is_active: bool,
}

pub async fn set_subscription_active(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<ActiveRequest>,
) -> Result<Json<Value>, ApiError> {
    state
        .catalog
        .set_subscription_active(id, payload.is_active)
        .await?;
    Ok(Json(json!({ "updated": true })))
}

pub async fn delete_subscription(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    state.catalog.delete_subscription(id).await?;
    Ok(Json(json!({ "deleted": true })))
}

// --- Admin: payment methods ---

pub async fn list_payment_methods_admin(
    State(state): State<AppState>,
) -> Result<Json<Vec<PaymentMethod>>, ApiError> {
    Ok(Json(state.catalog.list_payment_methods_admin().await?))
}

pub async fn create_payment_method(
    State(state): State<AppState>,
    Json(payload): Json<CreatePaymentMethodInput>,
) -> Result<(StatusCode, Json<PaymentMethod>), ApiError> {
    let method = state.catalog.create_payment_method(payload).await?;
    Ok((StatusCode::CREATED, Json(method)))
}

pub async fn set_payment_method_active(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<ActiveRequest>,
) -> Result<Json<Value>, ApiError> {
    state
        .catalog
        .set_payment_method_active(id, payload.is_active)
        .await?;
    Ok(Json(json!({ "updated": true })))
}

pub async fn delete_payment_method(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    state.catalog.delete_payment_method(id).await?;
    Ok(Json(json!({ "deleted": true })))
}
