//! Background expiry sweep
//!
//! Reads already ignore expired entries; the sweep only gives the memory back.

use super::store::CacheStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Default sweep period
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Something holding expiring entries
pub trait Sweep {
    /// Drop expired entries, returning how many were reclaimed
    fn sweep(&self) -> usize;
}

impl<T: Clone> Sweep for CacheStore<T> {
    fn sweep(&self) -> usize {
        self.clean_expired()
    }
}

/// Start a background task that sweeps `target` every `every`.
///
/// Stops when `shutdown_rx` signals `true` or its sender is dropped.
pub fn spawn_sweeper<S>(
    target: Arc<S>,
    every: Duration,
    mut shutdown_rx: watch::Receiver<bool>,
) -> JoinHandle<()>
where
    S: Sweep + Send + Sync + 'static,
{
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        interval.tick().await; // skip first immediate tick

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let reclaimed = target.sweep();
                    if reclaimed > 0 {
                        tracing::debug!("Sweeper reclaimed {} expired entries", reclaimed);
                    }
                }
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        tracing::debug!("Sweeper stopped");
                        break;
                    }
                }
            }
        }
    })
}
