//! One difficulty controller per player session. Adjustments on the same
//! session are serialized by the controller's own lock.
//!
//! The registry is bounded: once `capacity` sessions exist, creating another
//! first evicts idle sessions and then the least recently used one that no
//! request currently holds.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;

use crate::adaptive::config::DdaConfig;
use crate::adaptive::dda::{DifficultyController, DifficultyState};

pub const DEFAULT_SESSION: &str = "default";

struct SessionEntry {
    controller: Arc<Mutex<DifficultyController>>,
    last_used: Instant,
}

impl SessionEntry {
    fn in_use(&self) -> bool {
        Arc::strong_count(&self.controller) > 1
    }
}

pub struct SessionRegistry {
    dda: DdaConfig,
    capacity: usize,
    idle: Duration,
    entries: Mutex<HashMap<String, SessionEntry>>,
}

impl SessionRegistry {
    pub fn new(dda: DdaConfig, capacity: usize, idle: Duration) -> Self {
        Self {
            dda,
            capacity: capacity.max(1),
            idle,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the session's controller, creating it on first use.
    pub async fn acquire(&self, session_id: &str) -> Arc<Mutex<DifficultyController>> {
        let mut entries = self.entries.lock().await;
        if !entries.contains_key(session_id) && entries.len() >= self.capacity {
            let evicted = make_room(&mut entries, self.capacity, self.idle);
            tracing::debug!(evicted, capacity = self.capacity, "session registry full");
        }
        let entry = entries
            .entry(session_id.to_string())
            .or_insert_with(|| SessionEntry {
                controller: Arc::new(Mutex::new(DifficultyController::new(self.dda.clone()))),
                last_used: Instant::now(),
            });
        entry.last_used = Instant::now();
        entry.controller.clone()
    }

    pub async fn state(&self, session_id: &str) -> Option<DifficultyState> {
        let controller = {
            let entries = self.entries.lock().await;
            entries.get(session_id).map(|e| e.controller.clone())?
        };
        let guard = controller.lock().await;
        Some(guard.state())
    }

    pub async fn remove(&self, session_id: &str) -> bool {
        self.entries.lock().await.remove(session_id).is_some()
    }

    /// Drops sessions idle longer than `idle`, skipping any still in use.
    pub async fn prune_idle(&self, idle: Duration) -> usize {
        let mut entries = self.entries.lock().await;
        let before = entries.len();
        entries.retain(|_, e| e.last_used.elapsed() < idle || e.in_use());
        before - entries.len()
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

/// Frees at least one slot when possible. Sessions held by an in-flight
/// request are never evicted, so the map can briefly exceed `capacity` by
/// the number of concurrent requests.
fn make_room(entries: &mut HashMap<String, SessionEntry>, capacity: usize, idle: Duration) -> usize {
    let before = entries.len();
    entries.retain(|_, e| e.last_used.elapsed() < idle || e.in_use());
    while entries.len() >= capacity {
        let oldest = entries
            .iter()
            .filter(|(_, e)| !e.in_use())
            .min_by_key(|(_, e)| e.last_used)
            .map(|(id, _)| id.clone());
        match oldest {
            Some(id) => {
                entries.remove(&id);
            }
            None => break,
        }
    }
    before - entries.len()
}
