//! Item-response probability model.
//!
//! Success probability follows the logistic curve `P = σ(D·(θ − β))`,
//! evaluated through `tanh` so it stays finite for large inputs. The
//! ability estimate is refined in stages (count update, tier bonuses,
//! confidence weighting, decay, smoothing) and clamped after each one.

use serde::Serialize;

use crate::adaptive::config::IrtConfig;
use crate::adaptive::precision::{ser_round3, ser_round4};
use crate::adaptive::tiers::rank::RankInfo;
use crate::adaptive::tiers::{FailMetrics, SuccessMetrics};
use crate::adaptive::types::AbilitySnapshot;

/// Beyond this magnitude the logistic curve is treated as saturated.
const SATURATION: f64 = 20.0;

pub fn logistic(x: f64) -> f64 {
    if x < -SATURATION {
        0.0
    } else if x > SATURATION {
        1.0
    } else {
        0.5 * (1.0 + (x / 2.0).tanh())
    }
}

pub fn probability(cfg: &IrtConfig, ability: f64, difficulty: f64) -> f64 {
    logistic(cfg.scaling * (ability - difficulty))
}

pub fn clamp_ability(cfg: &IrtConfig, ability: f64) -> f64 {
    ability.clamp(cfg.ability_min, cfg.ability_max)
}

/// Nudges ability toward the observed success share. No attempts, no change.
pub fn update_ability(cfg: &IrtConfig, ability: f64, success_count: u64, fail_count: u64) -> f64 {
    let total = success_count + fail_count;
    if total == 0 {
        return ability;
    }
    let ratio = success_count as f64 / total as f64;
    clamp_ability(cfg, ability + (ratio - 0.5) * cfg.learning_rate)
}

/// 1.0 when one outcome dominates, falling toward 0.0 as the two rates converge.
pub fn confidence(success_rate: f64, fail_rate: f64) -> f64 {
    (1.0 - (success_rate - fail_rate).abs()).clamp(0.0, 1.0)
}

/// Past `1 / decay_rate` sessions the factor turns negative and the result
/// flips sign before clamping.
pub fn apply_decay(cfg: &IrtConfig, ability: f64, sessions_played: u64) -> f64 {
    let factor = 1.0 - cfg.decay_rate * sessions_played as f64;
    clamp_ability(cfg, ability * factor)
}

pub fn smooth(alpha: f64, current: f64, previous: f64) -> f64 {
    alpha * current + (1.0 - alpha) * previous
}

#[derive(Debug, Clone)]
pub struct EstimateInput {
    pub ability: f64,
    /// Expected to be within the configured difficulty bounds already.
    pub difficulty: f64,
    pub success_count: u64,
    pub fail_count: u64,
    pub sessions_played: u64,
    pub previous_ability: Option<f64>,
    pub success: SuccessMetrics,
    pub fail: FailMetrics,
    pub rank: RankInfo,
    pub achievement_bonus: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AbilityEstimate {
    #[serde(serialize_with = "ser_round4")]
    pub probability: f64,
    #[serde(serialize_with = "ser_round3")]
    pub adjusted_ability: f64,
    #[serde(serialize_with = "ser_round3")]
    pub confidence: f64,
    #[serde(serialize_with = "ser_round3")]
    pub success_rate: f64,
    #[serde(serialize_with = "ser_round3")]
    pub fail_rate: f64,
    pub success_level: &'static str,
    pub fail_level: &'static str,
    pub rank: &'static str,
    pub rank_bonus: f64,
    #[serde(serialize_with = "ser_round4")]
    pub success_bonus: f64,
    #[serde(serialize_with = "ser_round4")]
    pub fail_penalty: f64,
    #[serde(serialize_with = "ser_round3")]
    pub achievement_bonus: f64,
    pub sessions_played: u64,
}

impl AbilityEstimate {
    pub fn snapshot(&self) -> AbilitySnapshot {
        AbilitySnapshot {
            probability: self.probability,
            adjusted_ability: self.adjusted_ability,
        }
    }
}

pub fn estimate(cfg: &IrtConfig, input: &EstimateInput) -> AbilityEstimate {
    let ability = clamp_ability(cfg, input.ability);
    let sessions = input.sessions_played.max(1);
    let achievement_bonus = input.achievement_bonus.clamp(0.0, 0.1);

    let probability = probability(cfg, ability, input.difficulty);

    let mut theta = update_ability(cfg, ability, input.success_count, input.fail_count);

    theta = clamp_ability(
        cfg,
        theta + input.rank.bonus + input.success.bias - input.fail.penalty + achievement_bonus,
    );

    let confidence = confidence(input.success.rate, input.fail.rate);
    theta = clamp_ability(cfg, theta * confidence);

    theta = apply_decay(cfg, theta, sessions);

    if let Some(previous) = input.previous_ability {
        theta = clamp_ability(cfg, smooth(cfg.smoothing_alpha, theta, clamp_ability(cfg, previous)));
    }

    AbilityEstimate {
        probability,
        adjusted_ability: theta,
        confidence,
        success_rate: input.success.rate,
        fail_rate: input.fail.rate,
        success_level: input.success.level,
        fail_level: input.fail.level,
        rank: input.rank.name,
        rank_bonus: input.rank.bonus,
        success_bonus: input.success.bias,
        fail_penalty: input.fail.penalty,
        achievement_bonus,
        sessions_played: sessions,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adaptive::tiers::{fail, rank, success};

    fn cfg() -> IrtConfig {
        IrtConfig::default()
    }

    fn input(ability: f64, difficulty: f64, s: u64, f: u64) -> EstimateInput {
        EstimateInput {
            ability,
            difficulty,
            success_count: s,
            fail_count: f,
            sessions_played: 1,
            previous_ability: None,
            success: success::success_metrics(s),
            fail: fail::fail_metrics(f),
            rank: rank::rank_from_name("silver_coder"),
            achievement_bonus: 0.0,
        }
    }

    #[test]
    fn probability_is_half_at_equal_skill() {
        assert!((probability(&cfg(), 0.5, 0.5) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn probability_saturates() {
        assert_eq!(logistic(-25.0), 0.0);
        assert_eq!(logistic(25.0), 1.0);
        assert!(logistic(19.0) < 1.0);
    }

    #[test]
    fn probability_increases_with_ability() {
        let c = cfg();
        assert!(probability(&c, 1.0, 0.5) > probability(&c, 0.0, 0.5));
    }

    #[test]
    fn update_ability_respects_bounds() {
        let c = cfg();
        assert_eq!(update_ability(&c, 1.0, 0, 0), 1.0);
        assert!((update_ability(&c, 0.0, 10, 0) - 0.025).abs() < 1e-12);
        assert_eq!(update_ability(&c, 3.0, 10, 0), 3.0);
        assert_eq!(update_ability(&c, -3.0, 0, 10), -3.0);
    }

    #[test]
    fn confidence_bounds() {
        assert_eq!(confidence(0.5, 0.5), 1.0);
        assert_eq!(confidence(1.0, 0.0), 0.0);
        assert!((confidence(0.2, 0.05) - 0.85).abs() < 1e-12);
    }

    #[test]
    fn decay_scales_linearly_with_sessions() {
        let c = cfg();
        assert!((apply_decay(&c, 2.0, 1) - 1.98).abs() < 1e-12);
        assert!((apply_decay(&c, 2.0, 50) - 1.0).abs() < 1e-12);
        assert!(apply_decay(&c, 2.0, 100).abs() < 1e-12);
    }

    #[test]
    fn decay_past_one_hundred_sessions_flips_sign() {
        let c = cfg();
        assert!((apply_decay(&c, 1.0, 150) + 0.5).abs() < 1e-12);
        assert_eq!(apply_decay(&c, 2.0, 500), -3.0);
        assert_eq!(apply_decay(&c, -2.0, 500), 3.0);
    }

    #[test]
    fn smoothing_is_ema() {
        assert!((smooth(0.3, 1.0, 0.0) - 0.3).abs() < 1e-12);
    }

    #[test]
    fn estimate_stays_in_domain() {
        let c = cfg();
        let mut i = input(3.0, 0.1, 100, 0);
        i.rank = rank::rank_from_name("code_overlord");
        i.achievement_bonus = 0.5;
        let e = estimate(&c, &i);
        assert!((-3.0..=3.0).contains(&e.adjusted_ability));
        assert!((0.0..=1.0).contains(&e.probability));
        assert!(e.achievement_bonus <= 0.1);
    }

    #[test]
    fn estimate_smooths_toward_previous() {
        let c = cfg();
        let base = estimate(&c, &input(1.0, 0.5, 5, 5));
        let mut with_prev = input(1.0, 0.5, 5, 5);
        with_prev.previous_ability = Some(-1.0);
        let smoothed = estimate(&c, &with_prev);
        assert!(smoothed.adjusted_ability < base.adjusted_ability);
        let expected = 0.3 * base.adjusted_ability + 0.7 * -1.0;
        assert!((smoothed.adjusted_ability - expected).abs() < 1e-12);
    }

    #[test]
    fn long_history_flips_estimate_through_decay() {
        let c = cfg();
        let base = estimate(&c, &input(1.0, 0.5, 5, 5));
        let mut veteran = input(1.0, 0.5, 5, 5);
        veteran.sessions_played = 150;
        let long = estimate(&c, &veteran);

        let before_decay = base.adjusted_ability / 0.99;
        let expected = (before_decay * -0.5).clamp(-3.0, 3.0);
        assert!((long.adjusted_ability - expected).abs() < 1e-9);
        assert_eq!(long.sessions_played, 150);
    }

    #[test]
    fn snapshot_carries_probability_and_ability() {
        let e = estimate(&cfg(), &input(0.0, 0.5, 0, 5));
        let snap = e.snapshot();
        assert_eq!(snap.probability, e.probability);
        assert_eq!(snap.adjusted_ability, e.adjusted_ability);
    }
}
