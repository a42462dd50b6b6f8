//! Greedy formation of balanced fixed-size groups.
//!
//! Candidates are sorted by ability inside each cluster so the most
//! balanced group is always a contiguous window. Players left over after
//! the per-cluster pass may be pooled and matched across clusters.

use std::collections::BTreeMap;

use crate::adaptive::types::{ClusterTag, MatchGroup};

#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub id: String,
    pub ability: f64,
    pub cluster: usize,
}

#[derive(Debug, Clone, Copy)]
pub struct GroupingOptions {
    pub match_size: usize,
    pub allow_cross_cluster: bool,
    pub min_score: f64,
}

/// Population variance of the abilities.
pub fn variance(abilities: &[f64]) -> f64 {
    if abilities.is_empty() {
        return 0.0;
    }
    let n = abilities.len() as f64;
    let mean = abilities.iter().sum::<f64>() / n;
    abilities.iter().map(|a| (a - mean) * (a - mean)).sum::<f64>() / n
}

pub fn pair_score(diff: f64) -> f64 {
    1.0 - diff.abs().min(1.0)
}

pub fn window_score(var: f64) -> f64 {
    1.0 - (var * 4.0).min(1.0)
}

/// Best contiguous window in an ability-sorted pool: `(start, score)`.
/// Returns `None` when the best window scores below `min_score`.
pub fn best_window(sorted: &[&Candidate], size: usize, min_score: f64) -> Option<(usize, f64)> {
    if size < 2 || sorted.len() < size {
        return None;
    }

    let (start, score) = if size == 2 {
        let mut best = 0;
        let mut best_diff = f64::INFINITY;
        for i in 0..sorted.len() - 1 {
            let diff = (sorted[i + 1].ability - sorted[i].ability).abs();
            if diff < best_diff {
                best_diff = diff;
                best = i;
            }
        }
        (best, pair_score(best_diff))
    } else {
        let mut best = 0;
        let mut best_var = f64::INFINITY;
        for i in 0..=sorted.len() - size {
            let abilities: Vec<f64> = sorted[i..i + size].iter().map(|c| c.ability).collect();
            let var = variance(&abilities);
            if var < best_var {
                best_var = var;
                best = i;
            }
        }
        (best, window_score(best_var))
    };

    (score >= min_score).then_some((start, score))
}

fn sort_by_ability(pool: &mut [&Candidate]) {
    pool.sort_by(|a, b| a.ability.total_cmp(&b.ability));
}

/// Repeatedly takes the best window from `pool`; when no window is acceptable
/// the lowest-ability candidate is dropped. Returns the groups and the
/// candidates that were not placed.
fn drain_pool<'a>(
    mut pool: Vec<&'a Candidate>,
    opts: &GroupingOptions,
    tag: ClusterTag,
    groups: &mut Vec<MatchGroup>,
) -> Vec<&'a Candidate> {
    let mut leftovers = Vec::new();
    while pool.len() >= opts.match_size {
        match best_window(&pool, opts.match_size, opts.min_score) {
            Some((start, score)) => {
                let members: Vec<&Candidate> = pool.drain(start..start + opts.match_size).collect();
                groups.push(MatchGroup {
                    member_ids: members.iter().map(|c| c.id.clone()).collect(),
                    cluster: tag,
                    score,
                });
            }
            None => leftovers.push(pool.remove(0)),
        }
    }
    leftovers.extend(pool);
    leftovers
}

pub fn form_groups(candidates: &[Candidate], opts: &GroupingOptions) -> Vec<MatchGroup> {
    let mut groups = Vec::new();
    if opts.match_size < 2 || candidates.len() < opts.match_size {
        return groups;
    }

    let mut by_cluster: BTreeMap<usize, Vec<&Candidate>> = BTreeMap::new();
    for c in candidates {
        by_cluster.entry(c.cluster).or_default().push(c);
    }

    let mut leftovers = Vec::new();
    for (cluster, mut pool) in by_cluster {
        sort_by_ability(&mut pool);
        leftovers.extend(drain_pool(pool, opts, ClusterTag::Cluster(cluster), &mut groups));
    }

    if opts.allow_cross_cluster && leftovers.len() >= opts.match_size {
        sort_by_ability(&mut leftovers);
        let unplaced = drain_pool(leftovers, opts, ClusterTag::CrossCluster, &mut groups);
        if !unplaced.is_empty() {
            tracing::debug!(unplaced = unplaced.len(), "players left without a group");
        }
    }

    groups
}
