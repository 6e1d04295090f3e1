//! Cache Cleanup Task
//!
//! Background task that periodically expires and evicts cache entries.

use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::cache::CacheStore;

/// Longest delay between attempts while cleanup keeps failing.
pub const MAX_BACKOFF: Duration = Duration::from_secs(60 * 60);

/// Handle to a running cleanup task.
#[derive(Debug)]
pub struct CleanupTask {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl CleanupTask {
    /// Signals the task to stop and waits for it to finish.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        if let Err(err) = self.handle.await {
            if !err.is_cancelled() {
                error!(error = %err, "cleanup task ended abnormally");
            }
        }
    }

    /// Stops the task without waiting.
    pub fn abort(&self) {
        self.handle.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

/// Delay before the next run after `failures` consecutive failed runs.
///
/// Doubles per failure starting from `interval`, capped at [`MAX_BACKOFF`]
/// (or at `interval` itself if that is larger).
pub fn backoff_delay(interval: Duration, failures: u32) -> Duration {
    if failures == 0 {
        return interval;
    }
    let factor = 2u32.saturating_pow(failures.min(16));
    interval
        .checked_mul(factor)
        .unwrap_or(MAX_BACKOFF)
        .min(MAX_BACKOFF.max(interval))
}

/// Runs one cleanup pass on the blocking pool.
///
/// Returns the consecutive failure count after this pass: zero on success,
/// `failures + 1` otherwise.
async fn run_cleanup(cache: &CacheStore, interval: Duration, failures: u32) -> u32 {
    let cache = cache.clone();
    match tokio::task::spawn_blocking(move || cache.try_cleanup()).await {
        Ok(Ok(removed)) => {
            if removed > 0 {
                info!(removed, "cache cleanup removed entries");
            } else {
                debug!("cache cleanup: nothing to remove");
            }
            0
        }
        Ok(Err(err)) => {
            let failures = failures.saturating_add(1);
            warn!(
                error = %err,
                failures,
                retry_in_secs = backoff_delay(interval, failures).as_secs_f64(),
                "cache cleanup failed"
            );
            failures
        }
        Err(err) => {
            let failures = failures.saturating_add(1);
            error!(error = %err, failures, "cache cleanup panicked");
            failures
        }
    }
}

/// Spawns a background task that periodically runs [`CacheStore::try_cleanup`].
///
/// Each run happens on the blocking pool since cleanup walks the disk tier.
/// Consecutive failures back off exponentially; a successful run resets the
/// delay to `interval`.
///
/// # Arguments
/// * `cache` - Shared cache handle
/// * `interval` - Delay between runs
///
/// # Returns
/// A [`CleanupTask`] used to stop the loop during shutdown.
pub fn spawn_cleanup_task(cache: CacheStore, interval: Duration) -> CleanupTask {
    let (shutdown, mut shutdown_rx) = watch::channel(false);

    let handle = tokio::spawn(async move {
        info!(interval_secs = interval.as_secs_f64(), "starting cache cleanup task");
        let mut failures: u32 = 0;

        loop {
            let delay = backoff_delay(interval, failures);
            tokio::select! {
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        break;
                    }
                    continue;
                }
                _ = tokio::time::sleep(delay) => {}
            }

            failures = run_cleanup(&cache, interval, failures).await;
        }

        info!("cache cleanup task stopped");
    });

    CleanupTask { shutdown, handle }
}
