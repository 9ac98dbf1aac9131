pub use config::{media_variations_index, PipelineCacheConfig};
pub use factory::{
    bitmap_counting_memory_cache, bitmap_counting_memory_cache_with_strategy,
    encoded_counting_memory_cache, BitmapMemoryCache, EncodedMemoryCache,
};
pub use fallback::find_cached_variant;
pub use image::{BitmapConfig, DecodedImage, PooledByteBuffer};
pub use key::{ImageCacheKey, ResizeOptions};
pub use params::{
    DefaultBitmapMemoryCacheParamsSupplier, DefaultEncodedMemoryCacheParamsSupplier, KB, MB,
};
pub use pool::{NativeAllocation, NativeMemoryPool, PoolStats};
pub use strategy::{BitmapMemoryCacheTrimStrategy, NativeMemoryCacheTrimStrategy};
pub use tracker::{StatsTracker, TrackerStats};

mod config;
mod factory;
pub mod fallback;
mod image;
mod key;
mod params;
mod pool;
mod strategy;
mod tracker;
