use axum::extract::{Request, State};
use axum::http::{StatusCode, header};
use axum::middleware::Next;
use axum::response::IntoResponse;
use hmac::{Hmac, Mac};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::collections::HashMap;

use crate::AppState;

pub const ROLE_CLIENT: &str = "client";
pub const ROLE_ADMIN: &str = "admin";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // Telegram ID (client) or admin username
    pub exp: usize,
    pub role: String,
}

pub fn issue_token(secret: &str, sub: String, role: &str) -> anyhow::Result<String> {
    let exp = chrono::Utc::now()
        .checked_add_signed(chrono::Duration::days(7))
        .ok_or_else(|| anyhow::anyhow!("invalid expiry timestamp"))?
        .timestamp() as usize;

    let claims = Claims {
        sub,
        exp,
        role: role.to_string(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| anyhow::anyhow!("failed to sign token: {e}"))
}

/// Verifies a Telegram WebApp initData payload and returns the user's
/// Telegram ID plus the parsed fields. Secret key chain per Telegram
/// docs: HMAC-SHA256("WebAppData", bot_token), then HMAC over the
/// sorted data-check-string.
pub fn verify_init_data(init_data: &str, bot_token: &str) -> Option<(i64, HashMap<String, String>)> {
    let mut params: HashMap<String, String> = HashMap::new();
    for (key, value) in url::form_urlencoded::parse(init_data.as_bytes()) {
        params.insert(key.into_owned(), value.into_owned());
    }

    let hash = params.get("hash")?.clone();

    let mut data_check_vec: Vec<String> = params
        .iter()
        .filter(|(k, _)| k.as_str() != "hash")
        .map(|(k, v)| format!("{}={}", k, v))
        .collect();
    data_check_vec.sort();
    let data_check_string = data_check_vec.join("\n");

    let secret_key = {
        let mut mac = Hmac::<Sha256>::new_from_slice(b"WebAppData").ok()?;
        mac.update(bot_token.as_bytes());
        mac.finalize().into_bytes()
    };

    let calculated_hash = {
        let mut mac = Hmac::<Sha256>::new_from_slice(&secret_key).ok()?;
        mac.update(data_check_string.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    };

    if calculated_hash != hash {
        tracing::warn!("initData signature mismatch");
        return None;
    }

    let user_json: serde_json::Value = serde_json::from_str(params.get("user")?).ok()?;
    let tg_id = user_json.get("id").and_then(|v| v.as_i64())?;

    Some((tg_id, params))
}

/// Bearer-token middleware; decodes the JWT and stashes the claims in
/// request extensions for handlers.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<impl IntoResponse, StatusCode> {
    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|header| header.to_str().ok());

    let token = match auth_header {
        Some(auth_header) if auth_header.starts_with("Bearer ") => &auth_header[7..],
        _ => return Err(StatusCode::UNAUTHORIZED),
    };

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(state.session_secret.as_bytes()),
        &Validation::new(Algorithm::HS256),
    )
    .map_err(|_| StatusCode::UNAUTHORIZED)?;

    req.extensions_mut().insert(token_data.claims);

    Ok(next.run(req).await)
}

/// Role gate layered after `auth_middleware` on admin routes.
pub async fn require_admin(req: Request, next: Next) -> Result<impl IntoResponse, StatusCode> {
    match req.extensions().get::<Claims>() {
        Some(claims) if claims.role == ROLE_ADMIN => Ok(next.run(req).await),
        Some(_) => Err(StatusCode::FORBIDDEN),
        None => Err(StatusCode::UNAUTHORIZED),
    }
}

/// API-key middleware for the bot backend surface.
pub async fn bot_auth_middleware(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<impl IntoResponse, StatusCode> {
    let key = req
        .headers()
        .get("x-api-key")
        .and_then(|v| v.to_str().ok())
        .ok_or(StatusCode::UNAUTHORIZED)?;

    match state.api_keys.validate(key).await {
        Ok(Some(_)) => Ok(next.run(req).await),
        Ok(None) => Err(StatusCode::UNAUTHORIZED),
        Err(e) => {
            tracing::error!("API key validation failed: {e}");
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}
