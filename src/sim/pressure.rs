use std::sync::Arc;
use std::time::Duration;

use counting_memory_cache::TrimRegistry;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

/// Host trim levels, mildest first.
const LEVELS: [i32; 6] = [5, 10, 15, 20, 60, 80];

/// Delivers a memory pressure signal every `interval` until told to stop.
/// Returns the number of signals delivered.
pub(crate) async fn run(
    registry: Arc<TrimRegistry>,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> usize {
    let mut ticker = tokio::time::interval(interval.max(Duration::from_millis(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    // The first tick completes immediately.
    ticker.tick().await;

    let mut trims = 0;
    for level in LEVELS.iter().copied().cycle() {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = shutdown.changed() => break,
        }

        let trimmed = registry.on_trim_memory(level);
        tracing::debug!(level, trimmed, "delivered memory pressure signal");
        trims += 1;
    }

    trims
}
