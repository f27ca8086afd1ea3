use axum::extract::{Extension, Multipart, Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde_json::{Value, json};

use fetan_db::StoreError;
use fetan_db::models::order::{Order, OrderWithItems};
use fetan_db::repositories::order_repo::OrderStats;

use crate::AppState;
use crate::auth::Claims;
use crate::error::ApiError;
use crate::services::order_service::{CreateOrderInput, ShippingAddress, UpdateStatusInput};
use crate::uploads::{self, StoredUpload};

use super::current_user;

#[derive(Debug, Default)]
pub(crate) struct CheckoutFields {
    pub payment_method_id: Option<i64>,
    pub coupon_code: Option<String>,
    pub full_name: String,
    pub phone: String,
    pub address: String,
    pub city: String,
    pub notes: String,
}

/// Pulls the checkout form out of a multipart body: text fields plus
/// exactly one `screenshot` image, which is stored as it streams in.
pub(crate) async fn parse_checkout(
    state: &AppState,
    multipart: &mut Multipart,
) -> Result<(CheckoutFields, StoredUpload), ApiError> {
    let mut fields = CheckoutFields::default();
    let mut upload: Option<StoredUpload> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| StoreError::validation(format!("invalid multipart body: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "screenshot" => {
                let stored = uploads::save_screenshot(&state.upload_dir, field).await;
                match stored {
                    Ok(stored) => {
                        if let Some(previous) = upload.replace(stored) {
                            uploads::discard(&previous).await;
                        }
                    }
                    Err(e) => {
                        if let Some(previous) = upload.take() {
                            uploads::discard(&previous).await;
                        }
                        return Err(e.into());
                    }
                }
            }
            _ => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| StoreError::validation(format!("invalid field '{name}': {e}")))?;
                match name.as_str() {
                    "payment_method_id" => {
                        fields.payment_method_id = Some(value.parse().map_err(|_| {
                            StoreError::validation("payment_method_id must be a number")
                        })?);
                    }
                    "coupon_code" => fields.coupon_code = Some(value),
                    "full_name" => fields.full_name = value,
                    "phone" => fields.phone = value,
                    "address" => fields.address = value,
                    "city" => fields.city = value,
                    "notes" => fields.notes = value,
                    _ => {}
                }
            }
        }
    }

    let upload = upload.ok_or_else(|| StoreError::validation("payment screenshot is required"))?;

    if fields.full_name.trim().is_empty()
        || fields.phone.trim().is_empty()
        || fields.address.trim().is_empty()
        || fields.city.trim().is_empty()
    {
        uploads::discard(&upload).await;
        return Err(StoreError::validation(
            "full_name, phone, address and city are required",
        )
        .into());
    }
    if fields.payment_method_id.is_none() {
        uploads::discard(&upload).await;
        return Err(StoreError::validation("payment_method_id is required").into());
    }

    Ok((fields, upload))
}

pub(crate) async fn place_order(
    state: &AppState,
    user_id: i64,
    tg_id: i64,
    mut multipart: Multipart,
) -> Result<OrderWithItems, ApiError> {
    let (fields, upload) = parse_checkout(state, &mut multipart).await?;

    let input = CreateOrderInput {
        user_id,
        // Validated by parse_checkout.
        payment_method_id: fields.payment_method_id.unwrap_or_default(),
        coupon_code: fields.coupon_code,
        shipping: ShippingAddress {
            full_name: fields.full_name.trim().to_string(),
            phone: fields.phone.trim().to_string(),
            address: fields.address.trim().to_string(),
            city: fields.city.trim().to_string(),
        },
        notes: fields.notes,
        screenshot_url: upload.url.clone(),
    };

    match state.orders.create_order(input).await {
        Ok(order) => {
            state.notifications.order_created(tg_id, &order.order).await;
            Ok(order)
        }
        Err(e) => {
            // The file was stored before the transaction ran; drop it
            // so failed checkouts do not accumulate orphans.
            uploads::discard(&upload).await;
            Err(e.into())
        }
    }
}

/// `POST /api/orders` — web checkout for the authenticated customer.
pub async fn create(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<OrderWithItems>), ApiError> {
    let user = current_user(&state, &claims).await?;
    let order = place_order(&state, user.id, user.tg_id, multipart).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

/// `GET /api/orders/my-orders`
pub async fn my_orders(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<Order>>, ApiError> {
    let user = current_user(&state, &claims).await?;
    Ok(Json(state.orders.list_for_user(user.id).await?))
}

/// `GET /api/orders/{id}` — customers only see their own orders.
pub async fn get(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<Json<OrderWithItems>, ApiError> {
    let user = current_user(&state, &claims).await?;
    Ok(Json(state.orders.get_for_user(id, user.id).await?))
}

// --- Admin ---

pub async fn list_all(State(state): State<AppState>) -> Result<Json<Vec<Order>>, ApiError> {
    Ok(Json(state.orders.list_all().await?))
}

pub async fn stats(State(state): State<AppState>) -> Result<Json<OrderStats>, ApiError> {
    Ok(Json(state.orders.stats().await?))
}

pub async fn get_admin(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<OrderWithItems>, ApiError> {
    Ok(Json(state.orders.get_admin(id).await?))
}

/// `PUT /api/orders/admin/{id}/status`
pub async fn update_status(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateStatusInput>,
) -> Result<Json<OrderWithItems>, ApiError> {
    let before = state.orders.get_admin(id).await?;
    let updated = state.orders.update_status(id, payload).await?;

    if updated.order.status != before.order.status {
        match state.users.get(updated.order.user_id).await {
            Ok(user) => {
                state
                    .notifications
                    .order_status_changed(user.tg_id, &updated.order)
                    .await;
            }
            Err(e) => tracing::warn!("could not notify order {id} owner: {e}"),
        }
    }

    Ok(Json(updated))
}

pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    state.orders.delete(id).await?;
    Ok(Json(json!({ "deleted": true })))
}
