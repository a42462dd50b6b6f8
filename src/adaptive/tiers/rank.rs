//! Rank ladder. Thresholds follow a power curve over normalized experience so
//! the upper ranks need disproportionately more experience.

use serde::Serialize;

use crate::adaptive::precision::round4;

pub const MAX_EXPERIENCE: i64 = 10_000;
const RANK_POWER: f64 = 1.6;

pub const RANK_LEVELS: [&str; 10] = [
    "novice",
    "apprentice",
    "bronze_coder",
    "silver_coder",
    "gold_developer",
    "platinum_engineer",
    "diamond_hacker",
    "master_coder",
    "grandmaster_dev",
    "code_overlord",
];

const RANK_BIAS: [f64; 10] = [-0.05, -0.05, -0.03, 0.0, 0.0, 0.03, 0.03, 0.05, 0.06, 0.07];

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankInfo {
    pub name: &'static str,
    pub index: usize,
    pub threshold: f64,
    pub bonus: f64,
}

pub fn threshold(index: usize) -> f64 {
    if index == 0 {
        return 0.0;
    }
    let top = (RANK_LEVELS.len() - 1) as f64;
    round4((index as f64 / top).powf(RANK_POWER))
}

fn info(index: usize) -> RankInfo {
    RankInfo {
        name: RANK_LEVELS[index],
        index,
        threshold: threshold(index),
        bonus: RANK_BIAS[index],
    }
}

pub fn normalized_experience(experience: i64) -> f64 {
    experience.clamp(0, MAX_EXPERIENCE) as f64 / MAX_EXPERIENCE as f64
}

/// Case and whitespace insensitive; unknown names fall back to the lowest rank.
pub fn rank_from_name(name: &str) -> RankInfo {
    let key = name.trim().to_lowercase().replace(' ', "_");
    let index = RANK_LEVELS.iter().position(|r| *r == key).unwrap_or(0);
    info(index)
}

/// Highest rank whose threshold the normalized experience meets.
pub fn rank_from_experience(experience: i64) -> RankInfo {
    let value = normalized_experience(experience);
    let index = (0..RANK_LEVELS.len())
        .rev()
        .find(|i| value >= threshold(*i))
        .unwrap_or(0);
    info(index)
}

pub fn default_rank() -> RankInfo {
    info(0)
}
