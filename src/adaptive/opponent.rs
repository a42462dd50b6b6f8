//! Best single opponent for one player within a clustered batch.

use serde::Serialize;

use crate::adaptive::clustering::{squared_distance, ClusterResult};
use crate::adaptive::matchmaker::PlayerProfile;
use crate::adaptive::precision::{ser_round3, ser_round4};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchWeights {
    #[serde(serialize_with = "ser_round4")]
    pub ability: f64,
    #[serde(serialize_with = "ser_round4")]
    pub difficulty: f64,
}

/// Inconsistent players are matched mostly on ability; consistent ones lean
/// more on difficulty. The two weights always sum to one.
pub fn adaptive_weights(consistency: f64) -> MatchWeights {
    let c = consistency.clamp(0.0, 1.0);
    let ability = (1.0 - c).max(0.4);
    let difficulty = (c + 0.3).min(0.6);
    let total = ability + difficulty;
    MatchWeights {
        ability: ability / total,
        difficulty: difficulty / total,
    }
}

pub fn match_score(
    ability: f64,
    difficulty: f64,
    other_ability: f64,
    other_difficulty: f64,
    weights: MatchWeights,
) -> f64 {
    let gap = weights.ability * (ability - other_ability).abs()
        + weights.difficulty * (difficulty - other_difficulty).abs();
    1.0 - gap.min(1.0)
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OpponentMatch {
    pub player_id: String,
    pub opponent: PlayerProfile,
    #[serde(serialize_with = "ser_round3")]
    pub score: f64,
    pub cluster: usize,
    pub searched_cluster: usize,
    pub weights: MatchWeights,
    #[serde(serialize_with = "ser_round3")]
    pub consistency: f64,
    #[serde(serialize_with = "ser_round3")]
    pub projected_ability: f64,
    #[serde(serialize_with = "ser_round3")]
    pub projected_difficulty: f64,
}

/// The player's own projection: estimated ability and the difficulty a
/// fresh controller would move them to.
#[derive(Debug, Clone, Copy)]
pub struct Projection {
    pub ability: f64,
    pub difficulty: f64,
    pub consistency: f64,
}

/// Indices of candidate opponents for `player`, and the cluster they came
/// from. Falls back to the nearest other populated cluster when the
/// player's own cluster has no one else in it.
pub fn candidates(
    player: usize,
    normalized: &[Vec<f64>],
    clusters: &ClusterResult,
) -> Option<(usize, Vec<usize>)> {
    let members = clusters.members();
    let own = *clusters.assignments.get(player)?;

    let same: Vec<usize> = members[own].iter().copied().filter(|&i| i != player).collect();
    if !same.is_empty() {
        return Some((own, same));
    }

    let point = normalized.get(player)?;
    let mut best: Option<(usize, f64)> = None;
    for (idx, centroid) in clusters.centroids.iter().enumerate() {
        if idx == own || !members[idx].iter().any(|&i| i != player) {
            continue;
        }
        let d = squared_distance(point, centroid);
        if best.map_or(true, |(_, bd)| d < bd) {
            best = Some((idx, d));
        }
    }
    let (nearest, _) = best?;
    let pool = members[nearest].iter().copied().filter(|&i| i != player).collect();
    Some((nearest, pool))
}

/// Picks the first candidate with the highest score.
pub fn find_best_opponent(
    player: usize,
    profiles: &[PlayerProfile],
    normalized: &[Vec<f64>],
    clusters: &ClusterResult,
    projection: Projection,
) -> Option<OpponentMatch> {
    if profiles.len() < 2 {
        return None;
    }
    let (searched, pool) = candidates(player, normalized, clusters)?;
    let weights = adaptive_weights(projection.consistency);

    let mut best: Option<(usize, f64)> = None;
    for idx in pool {
        let other = &profiles[idx];
        let score = match_score(
            projection.ability,
            projection.difficulty,
            other.ability,
            other.difficulty,
            weights,
        );
        if best.map_or(true, |(_, s)| score > s) {
            best = Some((idx, score));
        }
    }

    let (idx, score) = best?;
    Some(OpponentMatch {
        player_id: profiles[player].id.clone(),
        opponent: profiles[idx].clone(),
        score,
        cluster: clusters.assignments[player],
        searched_cluster: searched,
        weights,
        consistency: projection.consistency,
        projected_ability: projection.ability,
        projected_difficulty: projection.difficulty,
    })
}
