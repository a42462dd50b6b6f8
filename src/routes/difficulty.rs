use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::Router;
use serde::Deserialize;

use crate::adaptive::engine::AdjustRequest;
use crate::adaptive::types::AbilitySnapshot;
use crate::extractors::JsonBody;
use crate::response::{ok, AppError};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/adjust", post(adjust_difficulty))
        .route("/sessions/:session_id", get(get_session).delete(reset_session))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AdjustBody {
    session_id: Option<String>,
    #[serde(alias = "betaOld")]
    previous_difficulty: f64,
    /// Parsed leniently; see `AbilitySnapshot::from_json`.
    #[serde(default = "empty_snapshot")]
    snapshot: serde_json::Value,
    #[serde(default)]
    success_count: i64,
    #[serde(default)]
    fail_count: i64,
    target_performance: Option<f64>,
    adjustment_rate: Option<f64>,
}

fn empty_snapshot() -> serde_json::Value {
    serde_json::json!({})
}

async fn adjust_difficulty(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<AdjustBody>,
) -> Result<impl IntoResponse, AppError> {
    let snapshot = AbilitySnapshot::from_json(&req.snapshot)?;
    let outcome = state
        .engine()
        .adjust_difficulty(AdjustRequest {
            session_id: req.session_id,
            previous_difficulty: req.previous_difficulty,
            snapshot,
            success_count: req.success_count,
            fail_count: req.fail_count,
            target_performance: req.target_performance,
            adjustment_rate: req.adjustment_rate,
        })
        .await?;
    Ok(ok(outcome))
}

async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let session = state
        .engine()
        .session_state(&session_id)
        .await
        .ok_or_else(|| AppError::not_found("Session not found"))?;
    Ok(ok(serde_json::json!({
        "sessionId": session_id,
        "state": session,
    })))
}

async fn reset_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    if !state.engine().reset_session(&session_id).await {
        return Err(AppError::not_found("Session not found"));
    }
    Ok(ok(serde_json::json!({
        "sessionId": session_id,
        "reset": true,
    })))
}
