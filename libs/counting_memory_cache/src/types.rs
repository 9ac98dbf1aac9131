use std::hash::Hash;

use crate::error::DisposeError;
use crate::trim::MemoryTrimType;

/// The type of keys accepted by the cache.
///
/// Equality and hashing must stay stable for as long as a value is cached
/// under the key.
pub trait CacheKey: Clone + Eq + Hash + Send + Sync + 'static {}

impl<T> CacheKey for T where T: Clone + Eq + Hash + Send + Sync + 'static {}

/// The type of values stored by the cache. Values typically wrap a pooled or
/// natively-backed allocation which must be released exactly once.
pub trait CachedValue: Send + Sync + 'static {
    /// Size of the underlying resource in bytes.
    fn size_in_bytes(&self) -> usize;

    /// Returns false once the value has been disposed.
    fn is_valid(&self) -> bool;

    /// Release the underlying resource.
    ///
    /// Implementations must be idempotent: disposing an already disposed value
    /// has no further effect.
    fn dispose(&self) -> Result<(), DisposeError>;
}

/// Computes the number of bytes a value occupies in the cache.
///
/// The cache evaluates the descriptor once, when the value is inserted, and
/// accounts the entry with that number for its whole lifetime.
pub trait ValueDescriptor<V>: Send + Sync {
    fn size_in_bytes(&self, value: &V) -> usize;
}

impl<V, F> ValueDescriptor<V> for F
where
    F: Fn(&V) -> usize + Send + Sync,
{
    fn size_in_bytes(&self, value: &V) -> usize {
        self(value)
    }
}

/// Maps a memory pressure signal to the fraction of the maximum cache size
/// which should survive a trim.
///
/// Strategies must be stateless and deterministic.
pub trait CacheTrimStrategy: Send + Sync {
    /// Returns the fraction of `max_cache_size` to retain, in `[0, 1]`.
    fn retain_ratio(&self, trim_type: MemoryTrimType) -> f64;
}

impl<F> CacheTrimStrategy for F
where
    F: Fn(MemoryTrimType) -> f64 + Send + Sync,
{
    fn retain_ratio(&self, trim_type: MemoryTrimType) -> f64 {
        self(trim_type)
    }
}

/// Receives cache telemetry. Events are delivered after the cache lock has
/// been released, on the thread which performed the operation.
pub trait MemoryCacheTracker<K>: Send + Sync {
    fn on_cache_hit(&self, key: &K);

    fn on_cache_miss(&self);

    fn on_cache_put(&self);

    /// Disposing an evicted or released value failed. The cache has already
    /// forgotten the value.
    fn on_dispose_failure(&self, _key: &K, _error: &DisposeError) {}
}

/// A tracker which ignores all events.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpCacheTracker;

impl<K> MemoryCacheTracker<K> for NoOpCacheTracker {
    fn on_cache_hit(&self, _key: &K) {}

    fn on_cache_miss(&self) {}

    fn on_cache_put(&self) {}
}

/// Observes a single entry, attached with
/// [`CountingMemoryCache::put_with_observer`](crate::CountingMemoryCache::put_with_observer).
pub trait EntryStateObserver<K>: Send + Sync {
    /// Called with `true` when the entry becomes owned by the cache alone (no
    /// outstanding client references), and with `false` when such an entry is
    /// handed to a client again or leaves the cache.
    fn on_exclusivity_changed(&self, key: &K, is_exclusive: bool);
}
