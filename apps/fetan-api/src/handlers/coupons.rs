use axum::Json;
use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;
use serde::Deserialize;
use serde_json::{Value, json};

use fetan_db::models::coupon::Coupon;

use crate::AppState;
use crate::auth::Claims;
use crate::error::ApiError;
use crate::services::coupon_service::{CouponQuote, CreateCouponInput};

use super::current_user;

#[derive(Deserialize)]
pub struct ValidateRequest {
    pub code: String,
}

/// `POST /api/coupons/validate` — previews a coupon against the
/// customer's current cart subtotal. Nothing is consumed.
pub async fn validate(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<ValidateRequest>,
) -> Result<Json<CouponQuote>, ApiError> {
    let user = current_user(&state, &claims).await?;
    let cart = state.users.get_cart(user.id).await?;
    let subtotal: i64 = cart
        .iter()
        .map(|line| line.unit_price * line.quantity as i64)
        .sum();
    Ok(Json(state.coupons.quote(&payload.code, subtotal).await?))
}

// --- Admin ---

pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<Coupon>>, ApiError> {
    Ok(Json(state.coupons.list().await?))
}

pub async fn create(
    State(state): State<AppState>,
    Json(payload): Json<CreateCouponInput>,
) -> Result<(StatusCode, Json<Coupon>), ApiError> {
    let coupon = state.coupons.create(payload).await?;
    Ok((StatusCode::CREATED, Json(coupon)))
}

#[derive(Deserialize)]
pub struct ActiveRequest {
    pub is_active: bool,
}

pub async fn set_active(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<ActiveRequest>,
) -> Result<Json<Value>, ApiError> {
    state.coupons.set_active(id, payload.is_active).await?;
    Ok(Json(json!({ "updated": true })))
}

pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    state.coupons.delete(id).await?;
    Ok(Json(json!({ "deleted": true })))
}
