// Background sweeper
// Periodically drops expired representations so idle keys do not pin memory

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::signal::Shutdown;
use crate::dish::CacheStore;

/// Spawn the sweeper; `None` when `interval` is zero
pub fn spawn_sweeper(
    store: Arc<CacheStore>,
    interval: Duration,
    shutdown: Shutdown,
) -> Option<JoinHandle<()>> {
    if interval.is_zero() {
        tracing::debug!("cache sweeper disabled");
        return None;
    }

    Some(tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately; nothing can have expired yet
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let removed = store.purge_expired();
                    if removed > 0 {
                        tracing::debug!(removed, remaining = store.len(), "swept expired entries");
                    }
                }
                () = shutdown.wait() => break,
            }
        }
    }))
}
