use std::sync::Arc;

use counting_memory_cache::{
    CacheTrimStrategy, CachedValue, CountingMemoryCache, MemoryCacheParamsSupplier,
    MemoryCacheTracker, MemoryTrimmableRegistry,
};

use crate::image::{DecodedImage, PooledByteBuffer};
use crate::key::ImageCacheKey;
use crate::strategy::{BitmapMemoryCacheTrimStrategy, NativeMemoryCacheTrimStrategy};

/// The cache of decoded images.
pub type BitmapMemoryCache = CountingMemoryCache<ImageCacheKey, DecodedImage>;

/// The cache of encoded image buffers.
pub type EncodedMemoryCache = CountingMemoryCache<ImageCacheKey, PooledByteBuffer>;

/// Creates the decoded image cache with the default trim strategy, and
/// registers it for memory pressure signals.
///
/// With `external_created_bitmap_log_enabled`, caching a bitmap which the
/// pipeline did not decode itself is logged, as are evictions and rejected
/// inserts.
pub fn bitmap_counting_memory_cache<P>(
    params_supplier: P,
    registry: &dyn MemoryTrimmableRegistry,
    tracker: Arc<dyn MemoryCacheTracker<ImageCacheKey>>,
    external_created_bitmap_log_enabled: bool,
) -> BitmapMemoryCache
where
    P: MemoryCacheParamsSupplier + 'static,
{
    bitmap_counting_memory_cache_with_strategy(
        params_supplier,
        registry,
        tracker,
        external_created_bitmap_log_enabled,
        BitmapMemoryCacheTrimStrategy,
    )
}

/// Same as [`bitmap_counting_memory_cache`], with a custom trim strategy.
pub fn bitmap_counting_memory_cache_with_strategy<P, T>(
    params_supplier: P,
    registry: &dyn MemoryTrimmableRegistry,
    tracker: Arc<dyn MemoryCacheTracker<ImageCacheKey>>,
    external_created_bitmap_log_enabled: bool,
    trim_strategy: T,
) -> BitmapMemoryCache
where
    P: MemoryCacheParamsSupplier + 'static,
    T: CacheTrimStrategy + 'static,
{
    let value_descriptor = move |image: &DecodedImage| {
        if external_created_bitmap_log_enabled && image.is_externally_created() {
            tracing::info!(
                width = image.width(),
                height = image.height(),
                "caching externally created bitmap"
            );
        }

        image.size_in_bytes()
    };

    let cache = CountingMemoryCache::new(
        value_descriptor,
        trim_strategy,
        params_supplier,
        tracker,
        external_created_bitmap_log_enabled,
    );

    registry.register_memory_trimmable(cache.as_trimmable());
    cache
}

/// Creates the encoded buffer cache, and registers it for memory pressure
/// signals.
pub fn encoded_counting_memory_cache<P>(
    params_supplier: P,
    registry: &dyn MemoryTrimmableRegistry,
    tracker: Arc<dyn MemoryCacheTracker<ImageCacheKey>>,
) -> EncodedMemoryCache
where
    P: MemoryCacheParamsSupplier + 'static,
{
    let cache = CountingMemoryCache::new(
        |buffer: &PooledByteBuffer| buffer.len(),
        NativeMemoryCacheTrimStrategy,
        params_supplier,
        tracker,
        false,
    );

    registry.register_memory_trimmable(cache.as_trimmable());
    cache
}
