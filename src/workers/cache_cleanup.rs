use crate::adaptive::AdaptiveEngine;

/// Empties the clustering cache and tier memo. Returns the number of
/// clustering entries dropped.
pub async fn run(engine: &AdaptiveEngine) -> usize {
    let before = engine.cluster_cache_stats();
    let removed = engine.clear_caches();
    tracing::info!(
        removed,
        hits = before.hits,
        misses = before.misses,
        "cache_cleanup: done"
    );
    removed
}
