use axum::Json;
use axum::extract::State;
use serde::Deserialize;
use serde_json::{Value, json};

use fetan_db::StoreError;

use crate::AppState;
use crate::auth::{ROLE_ADMIN, ROLE_CLIENT, issue_token, verify_init_data};
use crate::error::ApiError;

#[derive(Deserialize)]
pub struct TelegramLoginRequest {
    pub init_data: String,
}

#[derive(Deserialize)]
pub struct AdminLoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(sqlx::FromRow)]
struct AdminRow {
    username: String,
    password_hash: String,
}

/// Verifies Telegram WebApp initData, upserts the user and issues a
/// client JWT.
pub async fn telegram_login(
    State(state): State<AppState>,
    Json(payload): Json<TelegramLoginRequest>,
) -> Result<Json<Value>, ApiError> {
    let bot_token = state
        .bot_token
        .as_deref()
        .ok_or_else(|| StoreError::Internal(anyhow::anyhow!("BOT_TOKEN is not configured")))?;

    let (tg_id, params) =
        verify_init_data(&payload.init_data, bot_token).ok_or(StoreError::Unauthorized)?;

    let user_json: Value = params
        .get("user")
        .and_then(|raw| serde_json::from_str(raw).ok())
        .unwrap_or(Value::Null);
    let username = user_json.get("username").and_then(Value::as_str);
    let full_name = match (
        user_json.get("first_name").and_then(Value::as_str),
        user_json.get("last_name").and_then(Value::as_str),
    ) {
        (Some(first), Some(last)) => Some(format!("{first} {last}")),
        (Some(first), None) => Some(first.to_string()),
        _ => None,
    };
    let start_param = params.get("start_param").map(String::as_str);

    let user = state
        .users
        .upsert(tg_id, username, full_name.as_deref(), start_param)
        .await?;

    let token = issue_token(&state.session_secret, tg_id.to_string(), ROLE_CLIENT)?;
    Ok(Json(json!({ "token": token, "user": user })))
}

/// Admin username/password login against the `admins` table.
pub async fn admin_login(
    State(state): State<AppState>,
    Json(payload): Json<AdminLoginRequest>,
) -> Result<Json<Value>, ApiError> {
    let admin = sqlx::query_as::<_, AdminRow>(
        "SELECT username, password_hash FROM admins WHERE username = $1",
    )
    .bind(&payload.username)
    .fetch_optional(&state.pool)
    .await
    .map_err(StoreError::Database)?
    .ok_or(StoreError::Unauthorized)?;

    let matches = bcrypt::verify(&payload.password, &admin.password_hash)
        .map_err(|e| StoreError::Internal(anyhow::anyhow!("bcrypt verify failed: {e}")))?;
    if !matches {
        return Err(StoreError::Unauthorized.into());
    }

    let token = issue_token(&state.session_secret, admin.username.clone(), ROLE_ADMIN)?;
    tracing::info!("admin '{}' logged in", admin.username);
    Ok(Json(json!({ "token": token, "username": admin.username })))
}
