use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use counting_memory_cache::{CacheStats, TrimRegistry};
use image_cache::{
    bitmap_counting_memory_cache, encoded_counting_memory_cache, media_variations_index,
    BitmapMemoryCache, DefaultBitmapMemoryCacheParamsSupplier,
    DefaultEncodedMemoryCacheParamsSupplier, EncodedMemoryCache, ImageCacheKey, NativeMemoryPool,
    PipelineCacheConfig, StatsTracker, TrackerStats, MB,
};
use media_variations::MediaVariationsIndex;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinError;

use crate::config::Config;

mod pressure;
#[cfg(test)]
mod tests;
mod worker;

#[derive(Debug, Error)]
pub enum SimError {
    #[error("client task failed: {0}")]
    Worker(#[from] JoinError),

    #[error("{count} handles pointed at disposed images")]
    InvalidHandles { count: u64 },

    #[error("{bytes} bytes in {allocations} native allocations were never released")]
    Leak { bytes: usize, allocations: usize },
}

/// The caching layer shared by every client task.
pub(crate) struct Pipeline {
    pub(crate) pool: Arc<NativeMemoryPool>,
    pub(crate) bitmaps: BitmapMemoryCache,
    pub(crate) encoded: EncodedMemoryCache,
    pub(crate) index: Arc<dyn MediaVariationsIndex<ImageCacheKey>>,
    pub(crate) variations: bool,
    pub(crate) fallbacks: AtomicU64,
    pub(crate) invalid_handles: AtomicU64,
}

/// Outcome of a simulation run.
pub struct Report {
    bitmap: TrackerStats,
    encoded: TrackerStats,
    bitmap_cache: CacheStats,
    encoded_cache: CacheStats,
    fallbacks: u64,
    trims: usize,
    peak_native_bytes: usize,
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "decoded: {} hits, {} misses ({:.1}%), {} cached in {} KiB; \
             encoded: {} hits, {} misses ({:.1}%), {} cached in {} KiB; \
             {} variant fallbacks, {} trims, {} dispose failures, peak native memory {} KiB",
            self.bitmap.hits,
            self.bitmap.misses,
            self.bitmap.hit_rate() * 100.0,
            self.bitmap_cache.count,
            self.bitmap_cache.size_in_bytes / 1024,
            self.encoded.hits,
            self.encoded.misses,
            self.encoded.hit_rate() * 100.0,
            self.encoded_cache.count,
            self.encoded_cache.size_in_bytes / 1024,
            self.fallbacks,
            self.trims,
            self.bitmap.dispose_failures + self.encoded.dispose_failures,
            self.peak_native_bytes / 1024,
        )
    }
}

/// Runs client tasks against both caches while memory pressure signals are
/// delivered in the background, then checks that every native allocation
/// was given back.
#[tokio::main]
pub async fn run(config: &Config) -> Result<Report, SimError> {
    let heap = config.heap * MB;
    let registry = Arc::new(TrimRegistry::new());
    let bitmap_tracker = Arc::new(StatsTracker::new());
    let encoded_tracker = Arc::new(StatsTracker::new());

    let cache_config = PipelineCacheConfig::new()
        .with_external_created_bitmap_log(config.log_external_bitmaps)
        .with_media_variations_index(config.variations);

    let pipeline = Arc::new(Pipeline {
        pool: NativeMemoryPool::new(),
        bitmaps: bitmap_counting_memory_cache(
            DefaultBitmapMemoryCacheParamsSupplier::new(heap),
            registry.as_ref(),
            bitmap_tracker.clone(),
            cache_config.external_created_bitmap_log_enabled,
        ),
        encoded: encoded_counting_memory_cache(
            DefaultEncodedMemoryCacheParamsSupplier::new(heap),
            registry.as_ref(),
            encoded_tracker.clone(),
        ),
        index: media_variations_index(&cache_config),
        variations: cache_config.media_variations_index_enabled,
        fallbacks: AtomicU64::new(0),
        invalid_handles: AtomicU64::new(0),
    });

    tracing::info!(
        workers = config.workers,
        operations = config.operations,
        keyspace = config.keyspace,
        heap_mib = config.heap,
        variations = config.variations,
        bitmap_budget = ?pipeline.bitmaps.params(),
        encoded_budget = ?pipeline.encoded.params(),
        "starting simulation"
    );

    let (shutdown, shutdown_rx) = watch::channel(false);
    let pressure = tokio::spawn(pressure::run(
        registry.clone(),
        Duration::from_millis(config.trim_interval),
        shutdown_rx,
    ));

    let workers = (0..config.workers)
        .map(|id| {
            let pipeline = pipeline.clone();
            let seed = config.seed.wrapping_add(id as u64);
            let (operations, keyspace) = (config.operations, config.keyspace.max(1));

            tokio::spawn(async move { worker::run(pipeline, seed, operations, keyspace).await })
        })
        .collect::<Vec<_>>();

    for worker in workers {
        worker.await?;
    }

    // The receiver may already be gone if the pressure task died.
    let _ = shutdown.send(true);
    let trims = pressure.await?;

    let report = Report {
        bitmap: bitmap_tracker.snapshot(),
        encoded: encoded_tracker.snapshot(),
        bitmap_cache: pipeline.bitmaps.stats(),
        encoded_cache: pipeline.encoded.stats(),
        fallbacks: pipeline.fallbacks.load(Ordering::Relaxed),
        trims,
        peak_native_bytes: pipeline.pool.stats().peak_bytes,
    };

    pipeline.bitmaps.clear();
    pipeline.encoded.clear();

    let invalid = pipeline.invalid_handles.load(Ordering::Relaxed);
    if invalid > 0 {
        return Err(SimError::InvalidHandles { count: invalid });
    }

    let leftover = pipeline.pool.stats();
    if leftover.allocated_bytes > 0 || leftover.allocation_count > 0 {
        return Err(SimError::Leak {
            bytes: leftover.allocated_bytes,
            allocations: leftover.allocation_count,
        });
    }

    Ok(report)
}
