use std::time::Duration;

use crate::adaptive::AdaptiveEngine;

/// Drops difficulty controllers that have been idle longer than `idle`.
pub async fn run(engine: &AdaptiveEngine, idle: Duration) -> usize {
    tracing::debug!("session_cleanup: start");
    let removed = engine.sessions().prune_idle(idle).await;
    let remaining = engine.sessions().len().await;
    tracing::info!(removed, remaining, "session_cleanup: done");
    removed
}
