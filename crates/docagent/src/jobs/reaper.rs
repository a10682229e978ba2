//! Periodic eviction of finished jobs.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

use crate::jobs::registry::JobRegistry;

/// Background sweeper removing terminal jobs once they outlive `retention`.
pub struct JobReaper {
    registry: Arc<JobRegistry>,
    retention: chrono::Duration,
    interval: Duration,
    shutdown: Arc<AtomicBool>,
    wake: Arc<Notify>,
}

impl JobReaper {
    pub fn new(registry: Arc<JobRegistry>, retention: chrono::Duration, interval: Duration) -> Self {
        Self {
            registry,
            retention,
            interval,
            shutdown: Arc::new(AtomicBool::new(false)),
            wake: Arc::new(Notify::new()),
        }
    }

    /// Runs one sweep now and returns the number of evicted jobs.
    pub fn sweep(&self) -> usize {
        sweep(&self.registry, self.retention)
    }

    /// Starts the sweep loop on the current tokio runtime.
    pub fn start(&self) -> JoinHandle<()> {
        let registry = Arc::clone(&self.registry);
        let shutdown = Arc::clone(&self.shutdown);
        let wake = Arc::clone(&self.wake);
        let retention = self.retention;
        let interval = self.interval;

        tokio::spawn(async move {
            let mut interval_timer = tokio::time::interval(interval);
            interval_timer.tick().await; // skip immediate first tick

            loop {
                if shutdown.load(Ordering::Acquire) {
                    break;
                }

                tokio::select! {
                    _ = interval_timer.tick() => {},
                    _ = wake.notified() => {},
                }

                if shutdown.load(Ordering::Acquire) {
                    break;
                }

                sweep(&registry, retention);
            }
            log::debug!("Job reaper stopped");
        })
    }

    /// Signals the loop to stop.
    pub fn stop(&self) {
        self.shutdown.store(true, Ordering::Release);
        self.wake.notify_one();
    }
}

fn sweep(registry: &JobRegistry, retention: chrono::Duration) -> usize {
    let Some(cutoff) = Utc::now().checked_sub_signed(retention) else {
        log::warn!("Retention {} is out of range, skipping sweep", retention);
        return 0;
    };
    let evicted = registry.reap_older_than(cutoff);
    if evicted > 0 {
        log::info!("Reaped {} finished jobs", evicted);
    }
    evicted
}
