use axum::Json;
use axum::extract::{Path, State};
use serde::Deserialize;

use fetan_db::models::user::{PaymentScreenshot, User};

use crate::AppState;
use crate::error::ApiError;
use crate::services::user_service::UserStats;

pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<User>>, ApiError> {
    Ok(Json(state.users.list().await?))
}

pub async fn stats(State(state): State<AppState>) -> Result<Json<UserStats>, ApiError> {
    Ok(Json(state.users.stats().await?))
}

pub async fn pending_screenshots(
    State(state): State<AppState>,
) -> Result<Json<Vec<PaymentScreenshot>>, ApiError> {
    Ok(Json(state.payments.list_pending().await?))
}

#[derive(Deserialize)]
pub struct ApproveRequest {
    pub screenshot_id: i64,
}

/// `POST /api/users/{id}/approve-payment` — the body names which of
/// the user's screenshots to approve.
pub async fn approve_payment(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<ApproveRequest>,
) -> Result<Json<PaymentScreenshot>, ApiError> {
    Ok(Json(
        state.payments.approve(id, payload.screenshot_id).await?,
    ))
}

#[derive(Deserialize)]
pub struct RejectRequest {
    pub screenshot_id: i64,
    pub reason: Option<String>,
}

/// `POST /api/users/{id}/reject-payment`
pub async fn reject_payment(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<RejectRequest>,
) -> Result<Json<PaymentScreenshot>, ApiError> {
    Ok(Json(
        state
            .payments
            .reject(id, payload.screenshot_id, payload.reason.as_deref())
            .await?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn review_requests_address_a_specific_screenshot() {
        let approve: ApproveRequest =
            serde_json::from_str(r#"{ "screenshot_id": 7 }"#).unwrap();
        assert_eq!(approve.screenshot_id, 7);

        let reject: RejectRequest =
            serde_json::from_str(r#"{ "screenshot_id": 9, "reason": "blurry" }"#).unwrap();
        assert_eq!(reject.screenshot_id, 9);
        assert_eq!(reject.reason.as_deref(), Some("blurry"));

        // A body that does not name the screenshot is invalid.
        assert!(serde_json::from_str::<ApproveRequest>(r#"{}"#).is_err());
        assert!(serde_json::from_str::<RejectRequest>(r#"{ "reason": "x" }"#).is_err());
    }
}
