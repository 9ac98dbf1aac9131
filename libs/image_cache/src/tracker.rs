use std::sync::atomic::{AtomicU64, Ordering};

use counting_memory_cache::{DisposeError, MemoryCacheTracker};

/// Counts cache events.
#[derive(Debug, Default)]
pub struct StatsTracker {
    hits: AtomicU64,
    misses: AtomicU64,
    puts: AtomicU64,
    dispose_failures: AtomicU64,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TrackerStats {
    pub hits: u64,
    pub misses: u64,
    pub puts: u64,
    pub dispose_failures: u64,
}

impl TrackerStats {
    /// Fraction of lookups which hit, or 0 without lookups.
    pub fn hit_rate(&self) -> f64 {
        let lookups = self.hits + self.misses;
        if lookups == 0 {
            0.0
        } else {
            self.hits as f64 / lookups as f64
        }
    }
}

impl StatsTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> TrackerStats {
        TrackerStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            puts: self.puts.load(Ordering::Relaxed),
            dispose_failures: self.dispose_failures.load(Ordering::Relaxed),
        }
    }
}

impl<K> MemoryCacheTracker<K> for StatsTracker {
    fn on_cache_hit(&self, _key: &K) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    fn on_cache_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    fn on_cache_put(&self) {
        self.puts.fetch_add(1, Ordering::Relaxed);
    }

    fn on_dispose_failure(&self, _key: &K, _error: &DisposeError) {
        self.dispose_failures.fetch_add(1, Ordering::Relaxed);
    }
}
