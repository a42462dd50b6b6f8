use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::Router;
use serde::Deserialize;

use crate::adaptive::engine::{MatchRequest, OpponentRequest};
use crate::adaptive::types::PlayerStats;
use crate::extractors::JsonBody;
use crate::response::{ok, AppError};
use crate::state::AppState;

use super::blocking;
use super::estimate::PlayerBody;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/matches", post(form_matches))
        .route("/clusters", post(cluster_players))
        .route("/opponent", post(find_opponent))
}

/// Players sent without an id are named by their position in the batch.
fn into_stats(players: Vec<PlayerBody>) -> Vec<PlayerStats> {
    players
        .into_iter()
        .enumerate()
        .map(|(idx, body)| {
            let mut stats = PlayerStats::from(body);
            if stats.id.trim().is_empty() {
                stats.id = format!("player_{idx}");
            }
            stats
        })
        .collect()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MatchBody {
    players: Vec<PlayerBody>,
    match_size: Option<usize>,
    allow_cross_cluster: Option<bool>,
    min_score: Option<f64>,
    cluster_count: Option<usize>,
}

async fn form_matches(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<MatchBody>,
) -> Result<impl IntoResponse, AppError> {
    let engine = state.engine_handle();
    let request = MatchRequest {
        match_size: req.match_size,
        allow_cross_cluster: req.allow_cross_cluster,
        min_score: req.min_score,
        cluster_count: req.cluster_count,
    };
    let players = into_stats(req.players);
    let outcome = blocking(move || Ok(engine.form_matches(&players, request)?)).await?;
    Ok(ok(outcome))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ClusterBody {
    players: Vec<PlayerBody>,
    cluster_count: Option<usize>,
}

async fn cluster_players(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<ClusterBody>,
) -> Result<impl IntoResponse, AppError> {
    let engine = state.engine_handle();
    let players = into_stats(req.players);
    let cluster_count = req.cluster_count;
    let outcome =
        blocking(move || Ok(engine.cluster_players(&players, cluster_count)?)).await?;
    Ok(ok(outcome))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OpponentBody {
    players: Vec<PlayerBody>,
    player_id: String,
    cluster_count: Option<usize>,
    target_performance: Option<f64>,
    adjustment_rate: Option<f64>,
}

async fn find_opponent(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<OpponentBody>,
) -> Result<impl IntoResponse, AppError> {
    let engine = state.engine_handle();
    let request = OpponentRequest {
        player_id: req.player_id,
        cluster_count: req.cluster_count,
        target_performance: req.target_performance,
        adjustment_rate: req.adjustment_rate,
    };
    let players = into_stats(req.players);
    let found = blocking(move || Ok(engine.find_opponent(&players, &request)?)).await?;
    Ok(ok(serde_json::json!({
        "found": found.is_some(),
        "match": found,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(value: serde_json::Value) -> PlayerBody {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn missing_ids_default_to_batch_position() {
        let stats = into_stats(vec![
            body(serde_json::json!({ "ability": 0.1 })),
            body(serde_json::json!({ "id": "named", "ability": 0.2 })),
            body(serde_json::json!({ "id": "  ", "ability": 0.3 })),
        ]);
        let ids: Vec<&str> = stats.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, ["player_0", "named", "player_2"]);
    }
}
