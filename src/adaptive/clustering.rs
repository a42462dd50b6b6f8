//! Min-max normalization and k-means with k-means++ seeding.

use rand::Rng;
use serde::Serialize;

use crate::adaptive::config::ClusteringConfig;
use crate::adaptive::error::{EngineError, EngineResult};
use crate::adaptive::precision::ser_round4_vec;

/// Total seeding weight below this is treated as "all points coincide".
const WEIGHT_EPSILON: f64 = 1e-10;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterResult {
    #[serde(serialize_with = "ser_round4_vec")]
    pub centroids: Vec<Vec<f64>>,
    pub assignments: Vec<usize>,
    pub iterations: usize,
    pub converged: bool,
    /// Within-cluster squared distance after each assignment step.
    #[serde(skip)]
    pub inertia_history: Vec<f64>,
}

impl ClusterResult {
    pub fn cluster_count(&self) -> usize {
        self.centroids.len()
    }

    /// Point indices grouped by cluster, in input order.
    pub fn members(&self) -> Vec<Vec<usize>> {
        let mut members = vec![Vec::new(); self.centroids.len()];
        for (point, &cluster) in self.assignments.iter().enumerate() {
            members[cluster].push(point);
        }
        members
    }
}

pub fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

fn mean(points: &[&[f64]], dim: usize) -> Vec<f64> {
    let mut centroid = vec![0.0; dim];
    for p in points {
        for (c, v) in centroid.iter_mut().zip(p.iter()) {
            *c += v;
        }
    }
    let inv = 1.0 / points.len() as f64;
    centroid.iter_mut().for_each(|c| *c *= inv);
    centroid
}

/// Checks the batch is non-empty, finite and of uniform dimensionality.
pub fn validate_batch(batch: &[Vec<f64>]) -> EngineResult<usize> {
    let first = batch.first().ok_or(EngineError::EmptyFeatureBatch)?;
    let dim = first.len();
    if dim == 0 {
        return Err(EngineError::DimensionMismatch {
            index: 0,
            expected: 1,
            found: 0,
        });
    }
    for (index, row) in batch.iter().enumerate() {
        if row.len() != dim {
            return Err(EngineError::DimensionMismatch {
                index,
                expected: dim,
                found: row.len(),
            });
        }
        if row.iter().any(|v| !v.is_finite()) {
            return Err(EngineError::NonFinite { field: "features" });
        }
    }
    Ok(dim)
}

/// Scales every dimension to [0, 1]. A dimension with zero range maps to 0.
pub fn normalize(batch: &[Vec<f64>]) -> EngineResult<Vec<Vec<f64>>> {
    let dim = validate_batch(batch)?;
    let mut mins = vec![f64::INFINITY; dim];
    let mut maxs = vec![f64::NEG_INFINITY; dim];
    for row in batch {
        for (i, v) in row.iter().enumerate() {
            mins[i] = mins[i].min(*v);
            maxs[i] = maxs[i].max(*v);
        }
    }
    Ok(batch
        .iter()
        .map(|row| {
            row.iter()
                .enumerate()
                .map(|(i, v)| {
                    let range = maxs[i] - mins[i];
                    if range == 0.0 {
                        0.0
                    } else {
                        (v - mins[i]) / range
                    }
                })
                .collect()
        })
        .collect())
}

/// k-means++ seeding. Returns exactly `min(k, n)` centroids (at least one).
pub fn seed_centroids<R: Rng>(data: &[Vec<f64>], k: usize, rng: &mut R) -> Vec<Vec<f64>> {
    let n = data.len();
    if n == 0 {
        return Vec::new();
    }
    let k = k.clamp(1, n);
    if k == n {
        return data.to_vec();
    }

    let mut chosen = vec![false; n];
    let first = rng.gen_range(0..n);
    chosen[first] = true;
    let mut centroids = vec![data[first].clone()];

    while centroids.len() < k {
        let weights: Vec<f64> = data
            .iter()
            .map(|p| {
                centroids
                    .iter()
                    .map(|c| squared_distance(p, c))
                    .fold(f64::INFINITY, f64::min)
            })
            .collect();
        let total: f64 = weights.iter().sum();

        let pick = if total < WEIGHT_EPSILON {
            let remaining: Vec<usize> = (0..n).filter(|i| !chosen[*i]).collect();
            remaining[rng.gen_range(0..remaining.len())]
        } else {
            let r = rng.gen::<f64>() * total;
            let mut cumulative = 0.0;
            let mut pick = None;
            let mut last_positive = 0;
            for (i, w) in weights.iter().enumerate() {
                if *w <= 0.0 {
                    continue;
                }
                last_positive = i;
                cumulative += w;
                if r <= cumulative {
                    pick = Some(i);
                    break;
                }
            }
            pick.unwrap_or(last_positive)
        };

        chosen[pick] = true;
        centroids.push(data[pick].clone());
    }
    centroids
}

fn nearest(point: &[f64], centroids: &[Vec<f64>]) -> (usize, f64) {
    let mut best = 0;
    let mut best_d = f64::INFINITY;
    for (idx, c) in centroids.iter().enumerate() {
        let d = squared_distance(point, c);
        // strict comparison keeps ties on the lowest index
        if d < best_d {
            best_d = d;
            best = idx;
        }
    }
    (best, best_d)
}

/// Lloyd iterations over already-normalized data.
pub fn kmeans<R: Rng>(
    data: &[Vec<f64>],
    k: usize,
    cfg: &ClusteringConfig,
    rng: &mut R,
) -> EngineResult<ClusterResult> {
    let dim = validate_batch(data)?;
    let mut centroids = seed_centroids(data, k, rng);
    let k = centroids.len();

    let tol_sq = cfg.tolerance * cfg.tolerance;
    let mut assignments = vec![0; data.len()];
    let mut inertia_history = Vec::new();
    let mut converged = false;
    let mut iterations = 0;

    for iteration in 0..cfg.max_iterations {
        iterations = iteration + 1;

        let mut inertia = 0.0;
        for (slot, point) in assignments.iter_mut().zip(data) {
            let (idx, d) = nearest(point, &centroids);
            *slot = idx;
            inertia += d;
        }
        inertia_history.push(inertia);

        let mut buckets: Vec<Vec<&[f64]>> = vec![Vec::new(); k];
        for (point, &cluster) in data.iter().zip(&assignments) {
            buckets[cluster].push(point.as_slice());
        }

        let next: Vec<Vec<f64>> = buckets
            .iter()
            .map(|bucket| {
                if bucket.is_empty() {
                    data[rng.gen_range(0..data.len())].clone()
                } else {
                    mean(bucket, dim)
                }
            })
            .collect();

        let shift: f64 = centroids
            .iter()
            .zip(&next)
            .map(|(a, b)| squared_distance(a, b))
            .sum();
        centroids = next;

        if shift < tol_sq
            || (iteration > cfg.relaxed_after && shift < tol_sq * cfg.relaxed_factor)
        {
            converged = true;
            break;
        }
    }

    if !converged {
        tracing::debug!(iterations, k, "k-means hit the iteration cap");
    }

    Ok(ClusterResult {
        centroids,
        assignments,
        iterations,
        converged,
        inertia_history,
    })
}

/// Normalizes the raw batch, then clusters it.
pub fn cluster<R: Rng>(
    batch: &[Vec<f64>],
    k: usize,
    cfg: &ClusteringConfig,
    rng: &mut R,
) -> EngineResult<ClusterResult> {
    let normalized = normalize(batch)?;
    kmeans(&normalized, k, cfg, rng)
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    #[test]
    fn normalize_scales_each_dimension() {
        let out = normalize(&[vec![0.0, 5.0], vec![10.0, 5.0], vec![5.0, 5.0]]).unwrap();
        assert_eq!(out[0], vec![0.0, 0.0]);
        assert_eq!(out[1], vec![1.0, 0.0]);
        assert_eq!(out[2], vec![0.5, 0.0]);
    }

    #[test]
    fn normalize_rejects_bad_batches() {
        assert_eq!(normalize(&[]), Err(EngineError::EmptyFeatureBatch));
        assert!(matches!(
            normalize(&[vec![1.0, 2.0], vec![1.0]]),
            Err(EngineError::DimensionMismatch { index: 1, .. })
        ));
        assert!(normalize(&[vec![f64::NAN]]).is_err());
    }

    #[test]
    fn seeding_returns_k_distinct_indices_even_with_duplicates() {
        let data = vec![vec![0.0], vec![0.0], vec![0.0], vec![1.0]];
        let seeds = seed_centroids(&data, 3, &mut rng());
        assert_eq!(seeds.len(), 3);
    }

    #[test]
    fn k_larger_than_population_is_reduced() {
        let data = vec![vec![0.0, 0.0], vec![1.0, 1.0]];
        let result = kmeans(&data, 5, &ClusteringConfig::default(), &mut rng()).unwrap();
        assert_eq!(result.cluster_count(), 2);
        assert_ne!(result.assignments[0], result.assignments[1]);
    }

    #[test]
    fn separates_obvious_groups() {
        let data = vec![
            vec![0.0, 0.0],
            vec![0.05, 0.0],
            vec![0.0, 0.05],
            vec![1.0, 1.0],
            vec![0.95, 1.0],
            vec![1.0, 0.95],
        ];
        let result = kmeans(&data, 2, &ClusteringConfig::default(), &mut rng()).unwrap();
        assert!(result.converged);
        let a = result.assignments[0];
        assert!(result.assignments[..3].iter().all(|c| *c == a));
        assert!(result.assignments[3..].iter().all(|c| *c != a));
    }

    #[test]
    fn inertia_never_increases() {
        let data: Vec<Vec<f64>> = (0..30)
            .map(|i| vec![(i as f64 * 0.37).sin().abs(), (i as f64 * 0.11).cos().abs()])
            .collect();
        let result = kmeans(&data, 4, &ClusteringConfig::default(), &mut rng()).unwrap();
        for pair in result.inertia_history.windows(2) {
            assert!(pair[1] <= pair[0] + 1e-9);
        }
    }

    #[test]
    fn same_seed_same_result() {
        let data: Vec<Vec<f64>> = (0..12).map(|i| vec![i as f64, (i % 3) as f64]).collect();
        let cfg = ClusteringConfig::default();
        let a = cluster(&data, 3, &cfg, &mut StdRng::seed_from_u64(11)).unwrap();
        let b = cluster(&data, 3, &cfg, &mut StdRng::seed_from_u64(11)).unwrap();
        assert_eq!(a.assignments, b.assignments);
        assert_eq!(a.centroids, b.centroids);
    }

    #[test]
    fn members_cover_every_point_once() {
        let data: Vec<Vec<f64>> = (0..9).map(|i| vec![i as f64]).collect();
        let result = cluster(&data, 3, &ClusteringConfig::default(), &mut rng()).unwrap();
        let mut all: Vec<usize> = result.members().into_iter().flatten().collect();
        all.sort_unstable();
        assert_eq!(all, (0..9).collect::<Vec<_>>());
    }
}
