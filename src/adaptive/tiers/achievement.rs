use serde::Serialize;

use crate::adaptive::precision::ser_round3;

pub const TOTAL_ACHIEVEMENTS: u32 = 30;

/// Ability bonus never exceeds this regardless of completed achievements.
pub const BONUS_CAP: f64 = 0.1;

const BIAS_THRESHOLDS: [(f64, f64); 5] = [
    (0.25, 0.00),
    (0.50, 0.02),
    (0.75, 0.05),
    (0.90, 0.08),
    (1.01, 0.12),
];

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AchievementProgress {
    pub completed: u32,
    #[serde(serialize_with = "ser_round3")]
    pub progress: f64,
    pub bias: f64,
}

pub fn progress(completed: u32) -> AchievementProgress {
    let completed = completed.min(TOTAL_ACHIEVEMENTS);
    let progress = completed as f64 / TOTAL_ACHIEVEMENTS as f64;
    let bias = BIAS_THRESHOLDS
        .iter()
        .find(|(t, _)| progress < *t)
        .map(|(_, b)| *b)
        .unwrap_or(0.0);
    AchievementProgress {
        completed,
        progress,
        bias,
    }
}

pub fn bonus(completed: u32) -> f64 {
    (completed as f64 * 0.01).min(BONUS_CAP)
}

/// Supplies a player's completed-achievement count when the caller does not.
pub trait AchievementSource: Send + Sync {
    fn completed(&self, player_id: &str) -> u32;
}

/// Placeholder until achievement tracking exists; every player has zero.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoAchievements;

impl AchievementSource for NoAchievements {
    fn completed(&self, _player_id: &str) -> u32 {
        0
    }
}
