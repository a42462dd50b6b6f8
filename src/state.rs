use std::sync::Arc;
use std::time::Instant;

use crate::adaptive::AdaptiveEngine;

#[derive(Clone)]
pub struct AppState {
    engine: Arc<AdaptiveEngine>,
    started_at: Instant,
}

impl AppState {
    pub fn new(engine: Arc<AdaptiveEngine>) -> Self {
        Self {
            engine,
            started_at: Instant::now(),
        }
    }

    pub fn engine(&self) -> &AdaptiveEngine {
        &self.engine
    }

    /// Owned handle for work moved onto the blocking pool.
    pub fn engine_handle(&self) -> Arc<AdaptiveEngine> {
        self.engine.clone()
    }

    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}
