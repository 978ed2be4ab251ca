use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::sleep;

use crate::config::LifecycleConfig;
use crate::services::lifecycle::Pools;
use crate::services::registry::{Registry, Tracked};
use crate::services::storage::PoolStorage;

/// What one sweep did.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    pub pending_removed: usize,
    pub outputs_removed: usize,
    /// Expired files whose deletion failed; their entries are kept for the next sweep
    pub failures: usize,
}

impl SweepReport {
    pub fn removed(&self) -> usize {
        self.pending_removed + self.outputs_removed
    }
}

/// Deletes expired files from both pools.
#[derive(Clone)]
pub struct Reclaimer {
    pools: Arc<Pools>,
    upload_expiry: Duration,
    converted_expiry: Duration,
    interval: Duration,
}

impl Reclaimer {
    pub fn new(pools: Arc<Pools>, config: &LifecycleConfig) -> Self {
        Self {
            pools,
            upload_expiry: config.upload_expiry,
            converted_expiry: config.converted_expiry,
            interval: config.sweep_interval,
        }
    }

    pub fn sweep(&self) -> SweepReport {
        self.sweep_at(Utc::now())
    }

    /// One pass over both pools as of `now`. Blocking: deletions happen while
    /// the entry's lock is held.
    pub fn sweep_at(&self, now: DateTime<Utc>) -> SweepReport {
        let mut report = SweepReport::default();
        report.pending_removed = evict_expired(
            &self.pools.pending,
            &self.pools.pending_storage,
            now,
            self.upload_expiry,
            &mut report.failures,
        );
        report.outputs_removed = evict_expired(
            &self.pools.outputs,
            &self.pools.output_storage,
            now,
            self.converted_expiry,
            &mut report.failures,
        );
        report
    }

    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        tracing::info!("🧹 Reclaimer started (sweeping every {:?})", self.interval);

        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    tracing::info!("🛑 Reclaimer shutting down");
                    break;
                }
                _ = sleep(self.interval) => {
                    let this = self.clone();
                    match tokio::task::spawn_blocking(move || this.sweep()).await {
                        Ok(report) if report.removed() > 0 || report.failures > 0 => {
                            tracing::info!(
                                "Sweep removed {} pending and {} converted files ({} failures)",
                                report.pending_removed,
                                report.outputs_removed,
                                report.failures
                            );
                        }
                        Ok(_) => tracing::debug!("Sweep found nothing to remove"),
                        Err(e) => tracing::error!("Sweep task failed: {}", e),
                    }
                }
            }
        }
    }
}

fn evict_expired<M: Tracked + Clone>(
    registry: &Registry<M>,
    storage: &PoolStorage,
    now: DateTime<Utc>,
    ttl: Duration,
    failures: &mut usize,
) -> usize {
    let mut removed = 0;
    for name in registry.list_expired(now, ttl) {
        let evicted = registry.evict_if_expired(&name, now, ttl, |_| {
            match storage.remove_blocking(&name) {
                Ok(()) => true,
                Err(e) => {
                    tracing::error!("Error removing {} from {:?}: {}", name, storage.root(), e);
                    *failures += 1;
                    false
                }
            }
        });
        if evicted.is_some() {
            tracing::debug!("Reclaimed {}", name);
            removed += 1;
        }
    }
    removed
}

/// Running reclaimer task; dropping the handle without calling
/// [`ReclaimerHandle::shutdown`] leaves the task running.
pub struct ReclaimerHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl ReclaimerHandle {
    pub fn spawn(reclaimer: Reclaimer) -> Self {
        let (shutdown, rx) = watch::channel(false);
        let task = tokio::spawn(reclaimer.run(rx));
        Self { shutdown, task }
    }

    /// Stop the sweep loop and wait for it. A sweep already in progress
    /// finishes first.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.task.await {
            tracing::error!("Reclaimer task ended abnormally: {}", e);
        }
    }
}
