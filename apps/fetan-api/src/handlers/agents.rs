use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use serde_json::{Value, json};

use fetan_db::models::agent::{Agent, AgentReferral};

use crate::AppState;
use crate::error::ApiError;
use crate::services::agent_service::CreateAgentInput;

pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<Agent>>, ApiError> {
    Ok(Json(state.agents.list().await?))
}

pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Agent>, ApiError> {
    Ok(Json(state.agents.get(id).await?))
}

pub async fn referrals(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<AgentReferral>>, ApiError> {
    Ok(Json(state.agents.referrals(id).await?))
}

pub async fn create(
    State(state): State<AppState>,
    Json(payload): Json<CreateAgentInput>,
) -> Result<(StatusCode, Json<Agent>), ApiError> {
    let agent = state.agents.create(payload).await?;
    Ok((StatusCode::CREATED, Json(agent)))
}

pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    state.agents.delete(id).await?;
    Ok(Json(json!({ "deleted": true })))
}
