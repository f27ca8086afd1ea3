use axum::Json;
use axum::extract::{Extension, State};
use serde::Deserialize;
use serde_json::{Value, json};

use fetan_db::models::user::CartLine;

use crate::AppState;
use crate::auth::Claims;
use crate::error::ApiError;

use super::current_user;

#[derive(Deserialize)]
pub struct CartItemRequest {
    pub product_id: i64,
    pub quantity: i32,
}

pub async fn get(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<CartLine>>, ApiError> {
    let user = current_user(&state, &claims).await?;
    Ok(Json(state.users.get_cart(user.id).await?))
}

/// `POST /api/cart/items` — adds to the cart, stacking quantities.
pub async fn add_item(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CartItemRequest>,
) -> Result<Json<Vec<CartLine>>, ApiError> {
    let user = current_user(&state, &claims).await?;
    let cart = state
        .users
        .add_to_cart(user.id, payload.product_id, payload.quantity)
        .await?;
    Ok(Json(cart))
}

/// `PUT /api/cart/items` — sets a line's quantity; zero removes it.
pub async fn set_item(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CartItemRequest>,
) -> Result<Json<Vec<CartLine>>, ApiError> {
    let user = current_user(&state, &claims).await?;
    let cart = state
        .users
        .set_cart_quantity(user.id, payload.product_id, payload.quantity)
        .await?;
    Ok(Json(cart))
}

pub async fn clear(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Value>, ApiError> {
    let user = current_user(&state, &claims).await?;
    state.users.clear_cart(user.id).await?;
    Ok(Json(json!({ "cleared": true })))
}
