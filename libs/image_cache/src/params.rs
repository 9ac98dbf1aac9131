use counting_memory_cache::{MemoryCacheParams, MemoryCacheParamsSupplier};

pub const KB: usize = 1024;
pub const MB: usize = 1024 * KB;

const MAX_BITMAP_CACHE_ENTRIES: usize = 256;
const ENCODED_ENTRY_SIZE_DIVISOR: usize = 8;

/// Budgets for the decoded image cache, scaled to the heap the host allows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DefaultBitmapMemoryCacheParamsSupplier {
    max_heap_size: usize,
}

impl DefaultBitmapMemoryCacheParamsSupplier {
    pub fn new(max_heap_size: usize) -> Self {
        Self { max_heap_size }
    }

    fn max_cache_size(&self) -> usize {
        match self.max_heap_size {
            heap if heap < 32 * MB => 4 * MB,
            heap if heap < 64 * MB => 6 * MB,
            heap => heap / 4,
        }
    }
}

impl MemoryCacheParamsSupplier for DefaultBitmapMemoryCacheParamsSupplier {
    fn get(&self) -> MemoryCacheParams {
        let max_size = self.max_cache_size();
        MemoryCacheParams::new(max_size, MAX_BITMAP_CACHE_ENTRIES, max_size, max_size)
    }
}

/// Budgets for the encoded buffer cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DefaultEncodedMemoryCacheParamsSupplier {
    max_heap_size: usize,
}

impl DefaultEncodedMemoryCacheParamsSupplier {
    pub fn new(max_heap_size: usize) -> Self {
        Self { max_heap_size }
    }

    fn max_cache_size(&self) -> usize {
        match self.max_heap_size {
            heap if heap < 16 * MB => MB,
            heap if heap < 32 * MB => 2 * MB,
            _ => 4 * MB,
        }
    }
}

impl MemoryCacheParamsSupplier for DefaultEncodedMemoryCacheParamsSupplier {
    fn get(&self) -> MemoryCacheParams {
        let max_size = self.max_cache_size();
        MemoryCacheParams::new(
            max_size,
            usize::MAX,
            max_size / ENCODED_ENTRY_SIZE_DIVISOR,
            max_size,
        )
    }
}
