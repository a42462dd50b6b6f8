pub mod cache_cleanup;
pub mod session_cleanup;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio_cron_scheduler::{Job, JobScheduler};

use crate::adaptive::AdaptiveEngine;
use crate::config::WorkerConfig;

/// Timeout for individual worker invocations.
const WORKER_TIMEOUT: Duration = Duration::from_secs(60);

/// Drain period before scheduler shutdown to let in-flight tasks complete.
#[cfg(test)]
const DRAIN_TIMEOUT: Duration = Duration::from_millis(10);
#[cfg(not(test))]
const DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkerName {
    SessionCleanup,
    CacheCleanup,
}

impl WorkerName {
    pub const ALL: [WorkerName; 2] = [Self::SessionCleanup, Self::CacheCleanup];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::SessionCleanup => "session_cleanup",
            Self::CacheCleanup => "cache_cleanup",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobSpec {
    pub name: WorkerName,
    pub cron: &'static str,
    pub enabled: bool,
}

pub struct WorkerManager {
    engine: Arc<AdaptiveEngine>,
    shutdown_rx: broadcast::Receiver<()>,
    config: WorkerConfig,
}

impl WorkerManager {
    pub fn new(
        engine: Arc<AdaptiveEngine>,
        shutdown_rx: broadcast::Receiver<()>,
        config: &WorkerConfig,
    ) -> Self {
        Self {
            engine,
            shutdown_rx,
            config: config.clone(),
        }
    }

    /// Single source of truth for all planned jobs and their cron schedules.
    pub fn planned_jobs(&self) -> Vec<JobSpec> {
        if !self.config.is_leader {
            return Vec::new();
        }

        vec![
            JobSpec {
                name: WorkerName::SessionCleanup,
                cron: "0 */10 * * * *",
                enabled: true,
            },
            JobSpec {
                name: WorkerName::CacheCleanup,
                cron: "0 0 * * * *",
                enabled: true,
            },
        ]
    }

    /// Runs the scheduler until a shutdown signal arrives.
    pub async fn start(mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        if !self.config.is_leader {
            tracing::info!("Worker leader disabled; skipping worker startup");
            return Ok(());
        }

        let mut scheduler = JobScheduler::new().await?;
        self.register_jobs(&scheduler).await;
        scheduler.start().await?;

        tracing::info!("Worker manager started");
        let _ = self.shutdown_rx.recv().await;

        tracing::info!(
            drain_ms = DRAIN_TIMEOUT.as_millis() as u64,
            "Worker manager shutting down"
        );
        tokio::time::sleep(DRAIN_TIMEOUT).await;
        let _ = scheduler.shutdown().await;
        Ok(())
    }

    async fn register_jobs(&self, scheduler: &JobScheduler) {
        for spec in self.planned_jobs() {
            if !spec.enabled {
                tracing::info!(name = spec.name.as_str(), "Skipping disabled worker");
                continue;
            }

            let engine = self.engine.clone();
            let name = spec.name.as_str();

            match spec.name {
                WorkerName::SessionCleanup => {
                    let idle = Duration::from_secs(self.engine.config().session_idle_secs);
                    add_job(scheduler, spec.cron, name, move || {
                        let engine = engine.clone();
                        async move {
                            session_cleanup::run(&engine, idle).await;
                        }
                    })
                    .await;
                }
                WorkerName::CacheCleanup => {
                    add_job(scheduler, spec.cron, name, move || {
                        let engine = engine.clone();
                        async move {
                            cache_cleanup::run(&engine).await;
                        }
                    })
                    .await;
                }
            }
            tracing::info!(name, cron = spec.cron, "Registered worker");
        }
    }
}

/// Adds a job with an overlap guard and timeout wrapper.
async fn add_job<Fut, F>(scheduler: &JobScheduler, cron: &str, name: &'static str, mut run: F)
where
    F: FnMut() -> Fut + Send + Sync + 'static,
    Fut: std::future::Future<Output = ()> + Send + 'static,
{
    let running = Arc::new(AtomicBool::new(false));

    let job = Job::new_async(cron, move |_uuid, _lock| {
        let guard = running.clone();

        if guard
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            tracing::warn!(worker = name, "Skipping worker invocation: previous run still in progress");
            return Box::pin(async {});
        }

        let fut = run();
        Box::pin(async move {
            if tokio::time::timeout(WORKER_TIMEOUT, fut).await.is_err() {
                tracing::error!(
                    worker = name,
                    timeout_secs = WORKER_TIMEOUT.as_secs(),
                    "Worker timed out"
                );
            }
            guard.store(false, Ordering::SeqCst);
        })
    });

    match job {
        Ok(job) => {
            if let Err(err) = scheduler.add(job).await {
                tracing::error!(error = %err, cron, worker = name, "Failed to add worker job");
            }
        }
        Err(err) => tracing::error!(error = %err, cron, worker = name, "Failed to create worker job"),
    }
}

#[cfg(test)]
mod tests {
    use crate::adaptive::config::EngineConfig;

    use super::*;

    fn manager(is_leader: bool) -> (WorkerManager, broadcast::Sender<()>) {
        let engine = Arc::new(AdaptiveEngine::new(EngineConfig::default()).unwrap());
        let (tx, _) = broadcast::channel(2);
        let cfg = WorkerConfig {
            is_leader,
            ..WorkerConfig::default()
        };
        (WorkerManager::new(engine, tx.subscribe(), &cfg), tx)
    }

    #[tokio::test]
    async fn leader_switch_controls_job_registration() {
        let (follower, _tx) = manager(false);
        assert!(follower.planned_jobs().is_empty());

        let (leader, _tx) = manager(true);
        let jobs = leader.planned_jobs();
        assert_eq!(jobs.len(), WorkerName::ALL.len());
        assert!(jobs.iter().all(|j| j.enabled));
    }

    #[tokio::test]
    async fn non_leader_start_returns_immediately() {
        let (follower, _tx) = manager(false);
        follower
            .start()
            .await
            .expect("non-leader start should succeed");
    }

    #[tokio::test]
    async fn cron_expressions_parse() {
        let (leader, _tx) = manager(true);
        for spec in leader.planned_jobs() {
            let job = Job::new_async(spec.cron, |_uuid, _lock| Box::pin(async {}));
            assert!(job.is_ok(), "{} has a bad cron", spec.name.as_str());
        }
    }

    #[test]
    fn all_worker_names_have_str() {
        for name in WorkerName::ALL {
            assert!(!name.as_str().is_empty(), "{name:?} has empty str");
        }
    }
}
