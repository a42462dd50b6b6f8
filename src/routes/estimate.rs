use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::Router;
use serde::Deserialize;

use crate::adaptive::tiers::achievement;
use crate::adaptive::types::{sanitize_count, PlayerStats};
use crate::extractors::JsonBody;
use crate::response::{ok, AppError};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/ability", post(estimate_ability))
}

/// One player's raw stats as sent by clients. `theta`/`beta` are accepted
/// as aliases for ability and difficulty.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PlayerBody {
    #[serde(default, alias = "playerId", alias = "userId")]
    pub id: Option<String>,
    #[serde(default, alias = "theta")]
    pub ability: f64,
    #[serde(default = "default_difficulty", alias = "beta", alias = "betaOld")]
    pub difficulty: f64,
    #[serde(default)]
    pub success_count: i64,
    #[serde(default)]
    pub fail_count: i64,
    #[serde(default = "default_sessions")]
    pub sessions_played: i64,
    pub previous_ability: Option<f64>,
    pub rank_name: Option<String>,
    pub experience: Option<i64>,
    pub achievements_completed: Option<i64>,
}

fn default_difficulty() -> f64 {
    0.5
}

fn default_sessions() -> i64 {
    1
}

impl From<PlayerBody> for PlayerStats {
    fn from(body: PlayerBody) -> Self {
        Self {
            id: body.id.unwrap_or_default(),
            ability: body.ability,
            difficulty: body.difficulty,
            success_count: body.success_count,
            fail_count: body.fail_count,
            sessions_played: body.sessions_played,
            previous_ability: body.previous_ability,
            rank_name: body.rank_name,
            experience: body.experience,
            achievements_completed: body.achievements_completed,
        }
    }
}

async fn estimate_ability(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<PlayerBody>,
) -> Result<impl IntoResponse, AppError> {
    let stats: PlayerStats = req.into();
    let estimate = state.engine().estimate_ability(&stats)?;
    let completed = sanitize_count(stats.achievements_completed.unwrap_or(0)).min(u64::from(u32::MAX));
    let progress = achievement::progress(completed as u32);
    Ok(ok(serde_json::json!({
        "estimate": estimate,
        "achievements": progress,
    })))
}
