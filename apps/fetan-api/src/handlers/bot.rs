//! Internal surface for the Telegram bot backend, authenticated by API
//! key. The bot addresses users by Telegram ID; everything funnels into
//! the same services as the web surface.

use axum::Json;
use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use serde::Deserialize;
use serde_json::{Value, json};

use fetan_db::StoreError;
use fetan_db::models::order::{Order, OrderWithItems};
use fetan_db::models::user::{CartLine, PaymentScreenshot, User};

use crate::AppState;
use crate::error::ApiError;
use crate::uploads;

use super::cart::CartItemRequest;
use super::orders::place_order;

#[derive(Deserialize)]
pub struct UpsertUserRequest {
    pub tg_id: i64,
    pub username: Option<String>,
    pub full_name: Option<String>,
    pub referral_code: Option<String>,
    pub phone: Option<String>,
}

/// `POST /api/bot/users` — called on /start and on contact sharing.
pub async fn upsert_user(
    State(state): State<AppState>,
    Json(payload): Json<UpsertUserRequest>,
) -> Result<Json<User>, ApiError> {
    let mut user = state
        .users
        .upsert(
            payload.tg_id,
            payload.username.as_deref(),
            payload.full_name.as_deref(),
            payload.referral_code.as_deref(),
        )
        .await?;
    if payload.phone.is_some() {
        user = state
            .users
            .register(user.id, payload.phone.as_deref())
            .await?;
    }
    Ok(Json(user))
}

pub async fn get_user(
    State(state): State<AppState>,
    Path(tg_id): Path<i64>,
) -> Result<Json<User>, ApiError> {
    Ok(Json(state.users.get_by_tg_id(tg_id).await?))
}

pub async fn get_cart(
    State(state): State<AppState>,
    Path(tg_id): Path<i64>,
) -> Result<Json<Vec<CartLine>>, ApiError> {
    let user = state.users.get_by_tg_id(tg_id).await?;
    Ok(Json(state.users.get_cart(user.id).await?))
}

pub async fn add_cart_item(
    State(state): State<AppState>,
    Path(tg_id): Path<i64>,
    Json(payload): Json<CartItemRequest>,
) -> Result<Json<Vec<CartLine>>, ApiError> {
    let user = state.users.get_by_tg_id(tg_id).await?;
    let cart = state
        .users
        .add_to_cart(user.id, payload.product_id, payload.quantity)
        .await?;
    Ok(Json(cart))
}

pub async fn clear_cart(
    State(state): State<AppState>,
    Path(tg_id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    let user = state.users.get_by_tg_id(tg_id).await?;
    state.users.clear_cart(user.id).await?;
    Ok(Json(json!({ "cleared": true })))
}

/// `POST /api/bot/users/{tg_id}/screenshots` — payment proof for a
/// subscription purchase (or a bare top-up when no `subscription_id`
/// field is sent). Multipart: one `screenshot` image plus optional
/// text fields.
pub async fn add_screenshot(
    State(state): State<AppState>,
    Path(tg_id): Path<i64>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<PaymentScreenshot>), ApiError> {
    let user = state.users.get_by_tg_id(tg_id).await?;

    let mut subscription_id: Option<i64> = None;
    let mut upload = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| StoreError::validation(format!("invalid multipart body: {e}")))?
    {
        match field.name().unwrap_or_default() {
            "screenshot" => {
                let stored = uploads::save_screenshot(&state.upload_dir, field).await?;
                if let Some(previous) = upload.replace(stored) {
                    uploads::discard(&previous).await;
                }
            }
            "subscription_id" => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| StoreError::validation(format!("invalid field: {e}")))?;
                subscription_id = Some(value.parse().map_err(|_| {
                    StoreError::validation("subscription_id must be a number")
                })?);
            }
            _ => {}
        }
    }

    let upload =
        upload.ok_or_else(|| StoreError::validation("payment screenshot is required"))?;

    match state
        .users
        .add_screenshot(user.id, subscription_id, &upload.url)
        .await
    {
        Ok(shot) => Ok((StatusCode::CREATED, Json(shot))),
        Err(e) => {
            uploads::discard(&upload).await;
            Err(e.into())
        }
    }
}

/// `GET /api/bot/users/{tg_id}/screenshots` — review history the bot
/// shows the customer (status and reject reason included).
pub async fn list_screenshots(
    State(state): State<AppState>,
    Path(tg_id): Path<i64>,
) -> Result<Json<Vec<PaymentScreenshot>>, ApiError> {
    let user = state.users.get_by_tg_id(tg_id).await?;
    Ok(Json(state.users.screenshots(user.id).await?))
}

/// `POST /api/bot/users/{tg_id}/checkout` — same creation path as the
/// web checkout.
pub async fn checkout(
    State(state): State<AppState>,
    Path(tg_id): Path<i64>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<OrderWithItems>), ApiError> {
    let user = state.users.get_by_tg_id(tg_id).await?;
    let order = place_order(&state, user.id, user.tg_id, multipart).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

pub async fn list_orders(
    State(state): State<AppState>,
    Path(tg_id): Path<i64>,
) -> Result<Json<Vec<Order>>, ApiError> {
    let user = state.users.get_by_tg_id(tg_id).await?;
    Ok(Json(state.orders.list_for_user(user.id).await?))
}
