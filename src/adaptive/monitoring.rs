use std::collections::HashSet;
use std::panic::{catch_unwind, AssertUnwindSafe};

use serde::Serialize;

use crate::adaptive::config::DdaConfig;
use crate::adaptive::dda::Adjustment;
use crate::adaptive::types::MatchGroup;

/// Slack for float comparisons against configured bounds.
const EPS: f64 = 1e-9;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvariantViolation {
    pub field: String,
    pub value: f64,
    pub expected_range: String,
}

pub fn check_adjustment(adj: &Adjustment, cfg: &DdaConfig) -> Vec<InvariantViolation> {
    let mut violations = Vec::new();
    check_range(
        &mut violations,
        "new_difficulty",
        adj.new_difficulty,
        cfg.difficulty_min,
        cfg.difficulty_max,
    );
    check_range(
        &mut violations,
        "applied_delta",
        adj.applied_delta,
        -cfg.max_step,
        cfg.max_step,
    );
    if !adj.momentum.is_finite() {
        violations.push(InvariantViolation {
            field: "momentum".to_string(),
            value: adj.momentum,
            expected_range: "finite".to_string(),
        });
    }
    violations
}

pub fn check_groups(groups: &[MatchGroup], match_size: usize) -> Vec<InvariantViolation> {
    let mut violations = Vec::new();
    let mut seen = HashSet::new();
    for g in groups {
        if g.member_ids.len() != match_size {
            violations.push(InvariantViolation {
                field: "group_size".to_string(),
                value: g.member_ids.len() as f64,
                expected_range: format!("== {match_size}"),
            });
        }
        check_range(&mut violations, "score", g.score, 0.0, 1.0);
        for id in &g.member_ids {
            if !seen.insert(id.as_str()) {
                violations.push(InvariantViolation {
                    field: format!("member:{id}"),
                    value: 2.0,
                    expected_range: "unique".to_string(),
                });
            }
        }
    }
    violations
}

fn check_range(
    violations: &mut Vec<InvariantViolation>,
    field: &str,
    value: f64,
    min: f64,
    max: f64,
) {
    if value.is_nan() || value < min - EPS || value > max + EPS {
        violations.push(InvariantViolation {
            field: field.to_string(),
            value,
            expected_range: format!("[{min}, {max}]"),
        });
    }
}

/// Receives every applied difficulty adjustment. Failures are reported
/// back to the caller and never affect the adjustment itself.
pub trait AdjustmentObserver: Send + Sync {
    fn on_adjustment(&self, session_id: &str, adjustment: &Adjustment) -> Result<(), String>;
}

/// Emits each adjustment as a structured tracing event.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl AdjustmentObserver for TracingObserver {
    fn on_adjustment(&self, session_id: &str, adj: &Adjustment) -> Result<(), String> {
        tracing::info!(
            event = "difficulty_adjusted",
            session_id,
            previous = adj.previous_difficulty,
            new = adj.new_difficulty,
            delta = adj.applied_delta,
            target = adj.target_performance,
            actual = adj.actual_performance,
            momentum = adj.momentum,
            behavior_weight = adj.behavior_weight,
            gated = adj.gated,
            damped = adj.damped,
            guarded = adj.guarded,
            "difficulty adjusted"
        );
        Ok(())
    }
}

/// Calls the observer, swallowing both errors and panics.
pub fn notify(observer: &dyn AdjustmentObserver, session_id: &str, adj: &Adjustment) {
    match catch_unwind(AssertUnwindSafe(|| observer.on_adjustment(session_id, adj))) {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::warn!(error = %e, session_id, "adjustment observer failed"),
        Err(_) => tracing::warn!(session_id, "adjustment observer panicked"),
    }
}

pub fn report(context: &str, violations: &[InvariantViolation]) {
    if !violations.is_empty() {
        tracing::warn!(context, violations = ?violations, "engine invariant violation");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adaptive::types::{ClusterTag, DifficultyLevel};

    fn adjustment(new: f64, delta: f64) -> Adjustment {
        Adjustment {
            new_difficulty: new,
            previous_difficulty: new - delta,
            level: DifficultyLevel::from_difficulty(new),
            applied_delta: delta,
            target_performance: 0.7,
            actual_performance: 0.5,
            performance_gap: 0.2,
            adjusted_ability: 0.0,
            momentum: 0.01,
            behavior_weight: 0.0,
            gated: false,
            damped: false,
            guarded: false,
        }
    }

    #[test]
    fn valid_adjustment_has_no_violations() {
        assert!(check_adjustment(&adjustment(0.55, 0.05), &DdaConfig::default()).is_empty());
    }

    #[test]
    fn oversized_step_is_flagged() {
        let v = check_adjustment(&adjustment(0.9, 0.4), &DdaConfig::default());
        assert_eq!(v.len(), 1);
        assert_eq!(v[0].field, "applied_delta");
    }

    #[test]
    fn duplicate_members_flagged() {
        let groups = vec![
            MatchGroup {
                member_ids: vec!["a".into(), "b".into()],
                cluster: ClusterTag::Cluster(0),
                score: 0.9,
            },
            MatchGroup {
                member_ids: vec!["a".into(), "c".into()],
                cluster: ClusterTag::CrossCluster,
                score: 0.8,
            },
        ];
        let v = check_groups(&groups, 2);
        assert_eq!(v.len(), 1);
        assert_eq!(v[0].field, "member:a");
    }

    struct Failing;
    impl AdjustmentObserver for Failing {
        fn on_adjustment(&self, _: &str, _: &Adjustment) -> Result<(), String> {
            Err("sink closed".into())
        }
    }

    struct Panicking;
    impl AdjustmentObserver for Panicking {
        fn on_adjustment(&self, _: &str, _: &Adjustment) -> Result<(), String> {
            panic!("boom")
        }
    }

    #[test]
    fn observer_failures_are_swallowed() {
        let adj = adjustment(0.5, 0.0);
        notify(&Failing, "s", &adj);
        notify(&Panicking, "s", &adj);
        notify(&TracingObserver, "s", &adj);
    }
}
