//! Stateful difficulty controller.
//!
//! Turns the gap between target and predicted performance into a bounded
//! difficulty step. Momentum carries direction across calls; a stability
//! gate and damping keep the value from oscillating once it is close.

use serde::Serialize;

use crate::adaptive::config::DdaConfig;
use crate::adaptive::precision::{ser_round3, ser_round3_opt, ser_round4};
use crate::adaptive::tiers::{FailMetrics, SuccessMetrics};
use crate::adaptive::types::{AbilitySnapshot, DifficultyLevel};

/// Share of the momentum accumulator added back to each raw adjustment.
const MOMENTUM_CARRY: f64 = 0.5;
/// How strongly behaviour metrics amplify or mute the raw adjustment.
const BEHAVIOR_SCALE: f64 = 0.3;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DifficultyState {
    #[serde(serialize_with = "ser_round3_opt")]
    pub last_applied: Option<f64>,
    #[serde(serialize_with = "ser_round4")]
    pub momentum: f64,
    #[serde(serialize_with = "ser_round3")]
    pub stability_threshold: f64,
    #[serde(serialize_with = "ser_round3")]
    pub momentum_factor: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Adjustment {
    #[serde(serialize_with = "ser_round3")]
    pub new_difficulty: f64,
    #[serde(serialize_with = "ser_round3")]
    pub previous_difficulty: f64,
    pub level: DifficultyLevel,
    #[serde(serialize_with = "ser_round3")]
    pub applied_delta: f64,
    #[serde(serialize_with = "ser_round3")]
    pub target_performance: f64,
    #[serde(serialize_with = "ser_round3")]
    pub actual_performance: f64,
    #[serde(serialize_with = "ser_round3")]
    pub performance_gap: f64,
    #[serde(serialize_with = "ser_round3")]
    pub adjusted_ability: f64,
    #[serde(serialize_with = "ser_round4")]
    pub momentum: f64,
    #[serde(serialize_with = "ser_round3")]
    pub behavior_weight: f64,
    pub gated: bool,
    pub damped: bool,
    pub guarded: bool,
}

#[derive(Debug, Clone)]
pub struct DifficultyController {
    config: DdaConfig,
    last_applied: Option<f64>,
    momentum: f64,
}

impl DifficultyController {
    pub fn new(config: DdaConfig) -> Self {
        Self {
            config,
            last_applied: None,
            momentum: 0.0,
        }
    }

    pub fn state(&self) -> DifficultyState {
        DifficultyState {
            last_applied: self.last_applied,
            momentum: self.momentum,
            stability_threshold: self.config.stability_threshold,
            momentum_factor: self.config.momentum_factor,
        }
    }

    pub fn adjust(
        &mut self,
        previous_difficulty: f64,
        snapshot: &AbilitySnapshot,
        success: &SuccessMetrics,
        fail: &FailMetrics,
        target_performance: f64,
        rate: f64,
    ) -> Adjustment {
        let cfg = &self.config;
        let old = cfg.clamp_difficulty(previous_difficulty);
        let probability = snapshot.probability.clamp(0.0, 1.0);

        let gap = target_performance - probability;
        let sensitivity = 1.0 - snapshot.adjusted_ability.clamp(-3.0, 3.0) / 6.0;
        let mut raw = rate * gap * sensitivity;

        let behavior_weight = behavior_weight(success, fail);
        raw *= 1.0 + behavior_weight * BEHAVIOR_SCALE;

        let gated = gap.abs() < cfg.stability_threshold;
        if gated {
            raw = 0.0;
        }

        self.momentum = cfg.momentum_factor * self.momentum + (1.0 - cfg.momentum_factor) * raw;
        raw += self.momentum * MOMENTUM_CARRY;

        let damped = self
            .last_applied
            .is_some_and(|last| (old - last).abs() < cfg.stability_threshold);
        if damped {
            raw *= cfg.damping;
        }

        let proposed = cfg.clamp_difficulty(old + raw.tanh() * cfg.tanh_gain);
        let mut new = cap_step(cfg, old, proposed);

        let guarded =
            probability >= cfg.perfect_probability && new < old && old >= cfg.perfect_floor;
        if guarded {
            new = old;
        }

        self.last_applied = Some(new);

        Adjustment {
            new_difficulty: new,
            previous_difficulty: old,
            level: DifficultyLevel::from_difficulty(new),
            applied_delta: new - old,
            target_performance,
            actual_performance: probability,
            performance_gap: gap,
            adjusted_ability: snapshot.adjusted_ability,
            momentum: self.momentum,
            behavior_weight,
            gated,
            damped,
            guarded,
        }
    }
}

pub fn behavior_weight(success: &SuccessMetrics, fail: &FailMetrics) -> f64 {
    0.6 * success.rate + 0.4 * success.consistency - 0.5 * fail.penalty
}

fn cap_step(cfg: &DdaConfig, old: f64, proposed: f64) -> f64 {
    if (proposed - old).abs() > cfg.max_step {
        let direction = if proposed > old { 1.0 } else { -1.0 };
        cfg.clamp_difficulty(old + direction * cfg.max_step)
    } else {
        cfg.clamp_difficulty(proposed)
    }
}
