use counting_memory_cache::{CacheTrimStrategy, MemoryTrimType};

/// Trim policy for decoded images, which are cheap to recreate from the
/// encoded cache and expensive to hold.
#[derive(Debug, Default, Clone, Copy)]
pub struct BitmapMemoryCacheTrimStrategy;

impl CacheTrimStrategy for BitmapMemoryCacheTrimStrategy {
    fn retain_ratio(&self, trim_type: MemoryTrimType) -> f64 {
        match trim_type {
            MemoryTrimType::OnCloseToHeapLimit => 0.5,
            MemoryTrimType::OnSystemLowMemoryWhileAppInForeground => 0.1,
            MemoryTrimType::OnSystemLowMemoryWhileAppInBackground
            | MemoryTrimType::OnAppBackgrounded => 0.0,
            MemoryTrimType::Unknown(level) => {
                tracing::warn!(level, "unknown trim level, clearing bitmap cache");
                0.0
            }
        }
    }
}

/// Trim policy for encoded buffers. These live in native memory, so nearness
/// to the heap limit leaves them alone.
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeMemoryCacheTrimStrategy;

impl CacheTrimStrategy for NativeMemoryCacheTrimStrategy {
    fn retain_ratio(&self, trim_type: MemoryTrimType) -> f64 {
        match trim_type {
            MemoryTrimType::OnCloseToHeapLimit => 1.0,
            MemoryTrimType::OnSystemLowMemoryWhileAppInForeground => 0.5,
            MemoryTrimType::OnSystemLowMemoryWhileAppInBackground
            | MemoryTrimType::OnAppBackgrounded => 0.0,
            MemoryTrimType::Unknown(level) => {
                tracing::warn!(level, "unknown trim level, clearing encoded cache");
                0.0
            }
        }
    }
}
