use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::Router;
use serde::Deserialize;

use crate::adaptive::engine::PuzzleRequest;
use crate::extractors::JsonBody;
use crate::response::{ok, AppError};
use crate::state::AppState;

use super::estimate::PlayerBody;

pub fn router() -> Router<AppState> {
    Router::new().route("/adjust", post(adjust_puzzle))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PuzzleBody {
    session_id: Option<String>,
    level_id: Option<String>,
    #[serde(flatten)]
    player: PlayerBody,
    target_performance: Option<f64>,
    adjustment_rate: Option<f64>,
}

async fn adjust_puzzle(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<PuzzleBody>,
) -> Result<impl IntoResponse, AppError> {
    let outcome = state
        .engine()
        .adjust_puzzle(PuzzleRequest {
            session_id: req.session_id,
            player: req.player.into(),
            target_performance: req.target_performance,
            adjustment_rate: req.adjustment_rate,
        })
        .await?;
    tracing::info!(
        level_id = req.level_id.as_deref().unwrap_or("unknown"),
        session_id = %outcome.adjustment.session_id,
        new_difficulty = outcome.summary.new_difficulty,
        "puzzle adjusted"
    );
    Ok(ok(serde_json::json!({
        "levelId": req.level_id,
        "estimate": outcome.estimate,
        "adjustment": outcome.adjustment,
        "summary": outcome.summary,
    })))
}
