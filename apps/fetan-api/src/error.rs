use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use fetan_db::StoreError;
use serde_json::json;

/// Converts service failures into the JSON error envelope. Customers
/// get a generic message for anything internal; the detail goes to the
/// log only.
pub struct ApiError(pub StoreError);

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError(err)
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError(StoreError::Internal(err))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match &self.0 {
            StoreError::Validation(msg) => {
                (StatusCode::BAD_REQUEST, json!({ "error": msg }))
            }
            StoreError::NotFound(what) => (
                StatusCode::NOT_FOUND,
                json!({ "error": format!("{what} not found") }),
            ),
            StoreError::InsufficientStock { product_id } => (
                StatusCode::BAD_REQUEST,
                json!({ "error": "insufficient stock", "product_id": product_id }),
            ),
            StoreError::Unauthorized => {
                (StatusCode::UNAUTHORIZED, json!({ "error": "unauthorized" }))
            }
            StoreError::Forbidden => (StatusCode::FORBIDDEN, json!({ "error": "forbidden" })),
            StoreError::Database(e) => {
                tracing::error!("database error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "Server error" }),
                )
            }
            StoreError::Internal(e) => {
                tracing::error!("internal error: {e:#}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "Server error" }),
                )
            }
        };
        (status, Json(body)).into_response()
    }
}
